//! Text rendering of candidate profiles, shared by `show` and `browse`.

use chrono::{DateTime, Datelike, Utc};

use crate::models::{Candidate, EmploymentRecord, ProjectQuestion};

pub fn format_month(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%b %Y").to_string(),
        None => "Present".to_string(),
    }
}

fn plural(n: i32, unit: &str) -> String {
    format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" })
}

/// "2 yrs 3 mos" style tenure, counted in whole calendar months.
pub fn tenure(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(start) = start else { return String::new() };
    let end = end.unwrap_or(now);

    let months = (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);
    let (years, months) = (months / 12, months % 12);

    if years == 0 {
        plural(months, "mo")
    } else if months == 0 {
        plural(years, "yr")
    } else {
        format!("{} {}", plural(years, "yr"), plural(months, "mo"))
    }
}

/// Experience or education, most recent first; ongoing entries count as now.
pub fn history(candidate: &Candidate, education: bool, now: DateTime<Utc>) -> Vec<&EmploymentRecord> {
    let mut records: Vec<&EmploymentRecord> = candidate
        .jobs
        .iter()
        .filter(|j| j.is_education() == education)
        .collect();
    records.sort_by_key(|j| std::cmp::Reverse(j.end_date.unwrap_or(now)));
    records
}

pub fn history_lines(record: &EmploymentRecord, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();
    let role = record.role.as_deref().unwrap_or("(no title)");
    match record.company.as_deref() {
        Some(company) => lines.push(format!("{} @ {}", role, company)),
        None => lines.push(role.to_string()),
    }

    let mut when = format!("{} - {}", format_month(record.start_date), format_month(record.end_date));
    let length = tenure(record.start_date, record.end_date, now);
    if !length.is_empty() {
        when.push_str(&format!(" · {}", length));
    }
    lines.push(format!("  {}", when));

    let details: Vec<&str> = [&record.seniority_level, &record.location, &record.industry]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .filter(|s| !s.is_empty())
        .collect();
    if !details.is_empty() {
        lines.push(format!("  {}", details.join(" | ")));
    }
    lines
}

/// Questions grouped by project in first-seen order, each group sorted by
/// display order. Questions without a project share one group.
pub fn question_groups(candidate: &Candidate) -> Vec<(String, Vec<&ProjectQuestion>)> {
    let mut groups: Vec<(Option<&str>, String, Vec<&ProjectQuestion>)> = Vec::new();
    for q in &candidate.questions {
        let key = q.project_id.as_deref();
        match groups.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, _, items)) => items.push(q),
            None => {
                let title = match (&q.project_name, key) {
                    (Some(name), _) => name.clone(),
                    (None, Some(id)) => format!("Project {}", id),
                    (None, None) => "Other questions".to_string(),
                };
                groups.push((key, title, vec![q]));
            }
        }
    }
    groups
        .into_iter()
        .map(|(_, title, mut items)| {
            items.sort_by_key(|q| q.display_order.unwrap_or(i64::MAX));
            (title, items)
        })
        .collect()
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
