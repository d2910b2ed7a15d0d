use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Experience,
    Education,
    #[serde(other)]
    Unknown,
}

/// One job or education entry on a candidate's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentRecord {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub seniority_level: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sub_industry: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<DateTime<Utc>>, // None = ongoing
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_education: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
}

impl EmploymentRecord {
    pub fn is_education(&self) -> bool {
        self.is_education || self.kind == Some(RecordKind::Education)
    }

    pub fn is_ongoing(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<DateTime<Utc>>,
}

/// Tag category for the topics an expert can talk about.
pub const CONVERSATION_TOPIC: &str = "conversation_topic";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertTag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, alias = "tag", deserialize_with = "null_as_default")]
    pub value: String,
}

/// A screening question answered for one project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuestion {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub display_order: Option<i64>,
}

/// A sourced expert profile ("meta expert").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profession: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub geography: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, rename = "linkedInLink")]
    pub linkedin_link: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_raters: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: Vec<EmploymentRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviews: Vec<Review>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<ExpertTag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<ProjectQuestion>,
}

impl Candidate {
    pub fn experience(&self) -> impl Iterator<Item = &EmploymentRecord> {
        self.jobs.iter().filter(|j| !j.is_education())
    }

    pub fn education(&self) -> impl Iterator<Item = &EmploymentRecord> {
        self.jobs.iter().filter(|j| j.is_education())
    }

    /// The ongoing (or most recently ended) work experience, for list views.
    pub fn current_job(&self) -> Option<&EmploymentRecord> {
        self.experience()
            .max_by_key(|j| (j.is_ongoing(), j.end_date))
    }

    pub fn conversation_topics(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter(|t| t.category == CONVERSATION_TOPIC)
            .map(|t| t.value.as_str())
    }

    /// Mean review rating; a review without a rating counts as zero.
    pub fn review_average(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: f64 = self.reviews.iter().map(|r| r.rating.unwrap_or(0.0)).sum();
        Some(sum / self.reviews.len() as f64)
    }

    /// Fill in `rating` from reviews when it was never set.
    pub fn derive_rating(&mut self) -> bool {
        if self.rating != 0.0 {
            return false;
        }
        match self.review_average() {
            Some(avg) => {
                self.rating = avg;
                if self.num_raters == 0 {
                    self.num_raters = self.reviews.len() as i64;
                }
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub candidate_id: String,
    pub name: String,
    pub status: String, // "Sourced" on entry
    pub added_at: String,
}

/// Parse a date the way profile exports actually write them. Anything
/// unreadable becomes `None`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    tracing::debug!(value = s, "ignoring malformed date");
    None
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_date(&s),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    })
}
