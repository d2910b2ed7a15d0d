use std::collections::BTreeSet;

use serde::Serialize;

use crate::filter::FilterCategory;
use crate::models::Candidate;

/// Distinct values seen per filterable attribute, sorted, for pickers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub companies: Vec<String>,
    pub roles: Vec<String>,
    pub seniority: Vec<String>,
    pub locations: Vec<String>,
    pub industries: Vec<String>,
    pub sub_industries: Vec<String>, // display only, not filterable
}

impl FilterOptions {
    pub fn extract(candidates: &[Candidate]) -> Self {
        let mut companies = BTreeSet::new();
        let mut roles = BTreeSet::new();
        let mut seniority = BTreeSet::new();
        let mut locations = BTreeSet::new();
        let mut industries = BTreeSet::new();
        let mut sub_industries = BTreeSet::new();

        let mut job_count = 0usize;
        for job in candidates.iter().flat_map(|c| c.jobs.iter()) {
            job_count += 1;
            let fields = [
                (&job.company, &mut companies),
                (&job.role, &mut roles),
                (&job.seniority_level, &mut seniority),
                (&job.location, &mut locations),
                (&job.industry, &mut industries),
                (&job.sub_industry, &mut sub_industries),
            ];
            for (field, set) in fields {
                if let Some(v) = field.as_deref().filter(|v| !v.is_empty()) {
                    set.insert(v.to_string());
                }
            }
        }

        tracing::debug!(candidates = candidates.len(), jobs = job_count, "extracted filter options");

        Self {
            companies: companies.into_iter().collect(),
            roles: roles.into_iter().collect(),
            seniority: seniority.into_iter().collect(),
            locations: locations.into_iter().collect(),
            industries: industries.into_iter().collect(),
            sub_industries: sub_industries.into_iter().collect(),
        }
    }

    pub fn values(&self, category: FilterCategory) -> &[String] {
        match category {
            FilterCategory::Company => &self.companies,
            FilterCategory::Role => &self.roles,
            FilterCategory::Seniority => &self.seniority,
            FilterCategory::Location => &self.locations,
            FilterCategory::Industry => &self.industries,
        }
    }

    pub fn contains(&self, category: FilterCategory, value: &str) -> bool {
        self.values(category).binary_search_by(|v| v.as_str().cmp(value)).is_ok()
    }

    /// Picker-style search: case-insensitive substring match.
    pub fn search(&self, category: FilterCategory, term: &str) -> Vec<&str> {
        let term = term.to_lowercase();
        self.values(category)
            .iter()
            .filter(|v| v.to_lowercase().contains(&term))
            .map(String::as_str)
            .collect()
    }

    /// Closest known value, used to flag likely typos in filter values.
    pub fn suggest(&self, category: FilterCategory, value: &str) -> Option<&str> {
        let lower = value.to_lowercase();
        self.values(category)
            .iter()
            .map(|v| (v, strsim::jaro_winkler(&lower, &v.to_lowercase())))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(v, _)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmploymentRecord;

    fn record(company: &str, role: &str, location: Option<&str>) -> EmploymentRecord {
        EmploymentRecord {
            company: Some(company.to_string()),
            role: Some(role.to_string()),
            location: location.map(String::from),
            ..Default::default()
        }
    }

    fn sample() -> Vec<Candidate> {
        vec![
            Candidate {
                id: "1".into(),
                jobs: vec![
                    record("Stripe", "Engineer", Some("Seattle, WA")),
                    record("amazon", "", None),
                ],
                ..Default::default()
            },
            Candidate {
                id: "2".into(),
                jobs: vec![record("Amazon", "Engineer", Some("Austin, TX"))],
                ..Default::default()
            },
            Candidate { id: "3".into(), ..Default::default() },
        ]
    }

    #[test]
    fn distinct_sorted_and_case_sensitive() {
        let opts = FilterOptions::extract(&sample());
        assert_eq!(opts.companies, vec!["Amazon", "Stripe", "amazon"]);
        assert_eq!(opts.roles, vec!["Engineer"]);
        assert_eq!(opts.locations, vec!["Austin, TX", "Seattle, WA"]);
        assert!(opts.seniority.is_empty());
        assert!(opts.industries.is_empty());
    }

    #[test]
    fn education_records_are_options_too() {
        let c = Candidate {
            id: "1".into(),
            jobs: vec![EmploymentRecord {
                company: Some("MIT".into()),
                role: Some("PhD in Computer Science".into()),
                is_education: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let opts = FilterOptions::extract(&[c]);
        assert_eq!(opts.companies, vec!["MIT"]);
        assert_eq!(opts.roles, vec!["PhD in Computer Science"]);
    }

    #[test]
    fn empty_candidate_set() {
        assert_eq!(FilterOptions::extract(&[]), FilterOptions::default());
    }

    #[test]
    fn contains_and_search() {
        let opts = FilterOptions::extract(&sample());
        assert!(opts.contains(FilterCategory::Company, "Stripe"));
        assert!(!opts.contains(FilterCategory::Company, "stripe"));
        assert_eq!(opts.search(FilterCategory::Company, "AMA"), vec!["Amazon", "amazon"]);
    }

    #[test]
    fn suggests_near_misses_only() {
        let opts = FilterOptions::extract(&sample());
        assert_eq!(opts.suggest(FilterCategory::Company, "Strpe"), Some("Stripe"));
        assert_eq!(opts.suggest(FilterCategory::Location, "Zurich"), None);
    }
}
