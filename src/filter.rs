use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::EmploymentRecord;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("filter value must not be empty")]
    EmptyValue,

    #[error("unknown filter category '{0}' (expected company, role, seniority, location, industry)")]
    UnknownCategory(String),

    #[error("unknown filter logic '{0}' (expected must_have, cant_have, may_have)")]
    UnknownLogic(String),

    #[error("unknown timing '{0}' (expected current, 1_2_years, 2_3_years, 3_4_years, 4_plus_years)")]
    UnknownTiming(String),

    #[error("expected category=value[@timing], got '{0}'")]
    BadArgument(String),

    #[error("could not decode filters: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    Company,
    Role,
    Seniority,
    Location,
    Industry,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 5] = [
        FilterCategory::Company,
        FilterCategory::Role,
        FilterCategory::Seniority,
        FilterCategory::Location,
        FilterCategory::Industry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Role => "role",
            Self::Seniority => "seniority",
            Self::Location => "location",
            Self::Industry => "industry",
        }
    }

    /// The record field this category filters on. Missing fields read as "".
    pub fn attribute<'a>(&self, record: &'a EmploymentRecord) -> &'a str {
        let field = match self {
            Self::Company => &record.company,
            Self::Role => &record.role,
            Self::Seniority => &record.seniority_level,
            Self::Location => &record.location,
            Self::Industry => &record.industry,
        };
        field.as_deref().unwrap_or("")
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterCategory {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "company" => Ok(Self::Company),
            "role" => Ok(Self::Role),
            "seniority" => Ok(Self::Seniority),
            "location" => Ok(Self::Location),
            "industry" => Ok(Self::Industry),
            other => Err(FilterError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterLogic {
    MustHave,
    CantHave,
    #[default]
    MayHave,
}

impl FilterLogic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MustHave => "must_have",
            Self::CantHave => "cant_have",
            Self::MayHave => "may_have",
        }
    }
}

impl fmt::Display for FilterLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterLogic {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "must_have" | "must" => Ok(Self::MustHave),
            "cant_have" | "cant" => Ok(Self::CantHave),
            "may_have" | "may" => Ok(Self::MayHave),
            other => Err(FilterError::UnknownLogic(other.to_string())),
        }
    }
}

/// Recency bucket limiting which records may satisfy a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterTiming {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "1_2_years")]
    OneToTwoYears,
    #[serde(rename = "2_3_years")]
    TwoToThreeYears,
    #[serde(rename = "3_4_years")]
    ThreeToFourYears,
    #[serde(rename = "4_plus_years")]
    FourPlusYears,
}

impl FilterTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::OneToTwoYears => "1_2_years",
            Self::TwoToThreeYears => "2_3_years",
            Self::ThreeToFourYears => "3_4_years",
            Self::FourPlusYears => "4_plus_years",
        }
    }
}

impl fmt::Display for FilterTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterTiming {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "1_2_years" => Ok(Self::OneToTwoYears),
            "2_3_years" => Ok(Self::TwoToThreeYears),
            "3_4_years" => Ok(Self::ThreeToFourYears),
            "4_plus_years" => Ok(Self::FourPlusYears),
            other => Err(FilterError::UnknownTiming(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConstraint {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub category: FilterCategory,
    pub value: String,
    #[serde(default)]
    pub logic: FilterLogic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<FilterTiming>,
}

impl FilterConstraint {
    pub fn new(
        category: FilterCategory,
        value: impl Into<String>,
        logic: FilterLogic,
        timing: Option<FilterTiming>,
    ) -> Result<Self, FilterError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(FilterError::EmptyValue);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            category,
            value,
            logic,
            timing,
        })
    }
}

/// Parse a command-line constraint: `category=value` with an optional
/// `@timing` suffix. The suffix only counts when it names a real bucket,
/// so values containing '@' survive.
pub fn parse_arg(arg: &str) -> Result<(FilterCategory, String, Option<FilterTiming>), FilterError> {
    let (category, rest) = arg
        .split_once('=')
        .ok_or_else(|| FilterError::BadArgument(arg.to_string()))?;
    let category: FilterCategory = category.parse()?;

    let (value, timing) = match rest.rsplit_once('@') {
        Some((v, t)) => match t.parse::<FilterTiming>() {
            Ok(timing) => (v, Some(timing)),
            Err(_) => (rest, None),
        },
        None => (rest, None),
    };

    Ok((category, value.to_string(), timing))
}

impl fmt::Display for FilterConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}={}", self.logic, self.category, self.value)?;
        if let Some(timing) = self.timing {
            write!(f, "@{}", timing)?;
        }
        Ok(())
    }
}

/// The user's current constraints, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    constraints: Vec<FilterConstraint>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterConstraint> {
        self.constraints.iter()
    }

    pub fn in_category(&self, category: FilterCategory) -> impl Iterator<Item = &FilterConstraint> {
        self.constraints.iter().filter(move |c| c.category == category)
    }

    pub fn get(&self, id: Uuid) -> Option<&FilterConstraint> {
        self.constraints.iter().find(|c| c.id == id)
    }

    pub fn add(
        &mut self,
        category: FilterCategory,
        value: impl Into<String>,
        logic: Option<FilterLogic>,
        timing: Option<FilterTiming>,
    ) -> Result<Uuid, FilterError> {
        let constraint = FilterConstraint::new(category, value, logic.unwrap_or_default(), timing)?;
        let id = constraint.id;
        self.constraints.push(constraint);
        Ok(id)
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.constraints.len();
        self.constraints.retain(|c| c.id != id);
        self.constraints.len() != before
    }

    /// Change logic and/or timing in place. `timing: Some(None)` clears it.
    pub fn update(
        &mut self,
        id: Uuid,
        logic: Option<FilterLogic>,
        timing: Option<Option<FilterTiming>>,
    ) -> bool {
        let Some(c) = self.constraints.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if let Some(logic) = logic {
            c.logic = logic;
        }
        if let Some(timing) = timing {
            c.timing = timing;
        }
        true
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
    }

    pub fn clear_category(&mut self, category: FilterCategory) -> usize {
        let before = self.constraints.len();
        self.constraints.retain(|c| c.category != category);
        before - self.constraints.len()
    }

    pub fn to_json(&self) -> Result<String, FilterError> {
        serde_json::to_string(&self.constraints).map_err(|e| FilterError::Decode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        let constraints: Vec<FilterConstraint> =
            serde_json::from_str(json).map_err(|e| FilterError::Decode(e.to_string()))?;
        if constraints.iter().any(|c| c.value.trim().is_empty()) {
            return Err(FilterError::EmptyValue);
        }
        Ok(Self { constraints })
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a FilterConstraint;
    type IntoIter = std::slice::Iter<'a, FilterConstraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

/// A filter set plus the free-text need it was built for, as carried in a
/// shareable link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedSearch {
    pub filters: FilterSet,
    pub description: Option<String>,
}

impl SavedSearch {
    pub fn to_query(&self) -> Result<String, FilterError> {
        let mut parts = Vec::new();
        if !self.filters.is_empty() {
            parts.push(format!("filters={}", urlencoding::encode(&self.filters.to_json()?)));
        }
        if let Some(desc) = self.description.as_deref().filter(|d| !d.is_empty()) {
            parts.push(format!("description={}", urlencoding::encode(desc)));
        }
        Ok(parts.join("&"))
    }

    pub fn from_query(query: &str) -> Result<Self, FilterError> {
        let mut search = SavedSearch::default();
        let query = query.trim().trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            // URLSearchParams writes spaces as '+'
            let value = urlencoding::decode(&raw.replace('+', " "))
                .map_err(|e| FilterError::Decode(e.to_string()))?
                .into_owned();
            match key {
                "filters" => search.filters = FilterSet::from_json(&value)?,
                "description" => search.description = Some(value),
                _ => tracing::debug!(key, "ignoring unknown query parameter"),
            }
        }
        Ok(search)
    }
}
