use chrono::{DateTime, Utc};

use crate::filter::{FilterCategory, FilterConstraint, FilterLogic, FilterSet, FilterTiming};
use crate::models::{Candidate, EmploymentRecord};

const MILLIS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// Evaluates filter sets against candidates as of a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    now: DateTime<Utc>,
}

impl Matcher {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Years between `end` and now, using flat 365-day years.
    fn years_ago(&self, end: DateTime<Utc>) -> f64 {
        (self.now - end).num_milliseconds() as f64 / MILLIS_PER_YEAR
    }

    pub fn timing_matches(&self, record: &EmploymentRecord, timing: Option<FilterTiming>) -> bool {
        let Some(timing) = timing else { return true };

        let (low, high) = match timing {
            FilterTiming::Current => return record.end_date.is_none_or(|end| end >= self.now),
            FilterTiming::OneToTwoYears => (1.0, Some(2.0)),
            FilterTiming::TwoToThreeYears => (2.0, Some(3.0)),
            FilterTiming::ThreeToFourYears => (3.0, Some(4.0)),
            FilterTiming::FourPlusYears => (4.0, None),
        };

        // an ongoing record can't have ended N years ago
        let Some(end) = record.end_date else { return false };
        let yrs = self.years_ago(end);

        yrs > low && high.is_none_or(|high| yrs <= high)
    }

    fn record_matches(&self, record: &EmploymentRecord, constraint: &FilterConstraint) -> bool {
        constraint.category.attribute(record) == constraint.value
            && self.timing_matches(record, constraint.timing)
    }

    fn any_record_matches(&self, candidate: &Candidate, constraint: &FilterConstraint) -> bool {
        candidate.jobs.iter().any(|job| self.record_matches(job, constraint))
    }

    /// One category's verdict. `may_have` only counts when the category has
    /// no must/cant constraints; otherwise it is ignored.
    pub fn matches_category(&self, candidate: &Candidate, constraints: &[&FilterConstraint]) -> bool {
        if constraints.is_empty() {
            return true;
        }

        let by_logic = |logic: FilterLogic| {
            constraints
                .iter()
                .copied()
                .filter(move |c| c.logic == logic)
        };

        let mut must_have = by_logic(FilterLogic::MustHave).peekable();
        let mut cant_have = by_logic(FilterLogic::CantHave).peekable();
        let has_hard = must_have.peek().is_some() || cant_have.peek().is_some();

        for c in must_have {
            if !self.any_record_matches(candidate, c) {
                return false;
            }
        }

        for c in cant_have {
            if self.any_record_matches(candidate, c) {
                return false;
            }
        }

        if !has_hard {
            let may_have: Vec<&FilterConstraint> = by_logic(FilterLogic::MayHave).collect();
            return may_have.is_empty()
                || candidate
                    .jobs
                    .iter()
                    .any(|job| may_have.iter().any(|c| self.record_matches(job, c)));
        }

        true
    }

    pub fn matches(&self, candidate: &Candidate, filters: &FilterSet) -> bool {
        if filters.is_empty() {
            return true;
        }

        FilterCategory::ALL.iter().all(|&category| {
            let group: Vec<&FilterConstraint> = filters.in_category(category).collect();
            self.matches_category(candidate, &group)
        })
    }

    /// Matching candidates in their original order.
    pub fn filter<'a>(&self, candidates: &'a [Candidate], filters: &FilterSet) -> Vec<&'a Candidate> {
        let matched: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| self.matches(c, filters))
            .collect();
        tracing::debug!(
            candidates = candidates.len(),
            constraints = filters.len(),
            matched = matched.len(),
            "applied filters"
        );
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn years_before(years: f64) -> DateTime<Utc> {
        now() - Duration::milliseconds((years * MILLIS_PER_YEAR).round() as i64)
    }

    fn job(company: &str, end: Option<DateTime<Utc>>) -> EmploymentRecord {
        EmploymentRecord {
            company: Some(company.to_string()),
            end_date: end,
            ..Default::default()
        }
    }

    fn candidate(jobs: Vec<EmploymentRecord>) -> Candidate {
        Candidate {
            id: "c".into(),
            jobs,
            ..Default::default()
        }
    }

    fn set(items: &[(FilterCategory, &str, FilterLogic, Option<FilterTiming>)]) -> FilterSet {
        let mut s = FilterSet::new();
        for (cat, value, logic, timing) in items {
            s.add(*cat, *value, Some(*logic), *timing).unwrap();
        }
        s
    }

    use FilterCategory::*;
    use FilterLogic::*;

    #[test]
    fn empty_filter_set_matches_everyone() {
        let m = Matcher::at(now());
        assert!(m.matches(&candidate(vec![]), &FilterSet::new()));
        assert!(m.matches(&candidate(vec![job("Acme", None)]), &FilterSet::new()));
    }

    #[test]
    fn must_have_requires_a_matching_record() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Acme", MustHave, None)]);
        assert!(!m.matches(&candidate(vec![job("Initech", None)]), &f));
        assert!(!m.matches(&candidate(vec![]), &f));
        assert!(m.matches(&candidate(vec![job("Initech", None), job("Acme", None)]), &f));
    }

    #[test]
    fn every_must_have_needs_its_own_match() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Acme", MustHave, None), (Company, "Initech", MustHave, None)]);
        assert!(!m.matches(&candidate(vec![job("Acme", None)]), &f));
        assert!(m.matches(&candidate(vec![job("Acme", None), job("Initech", None)]), &f));
    }

    #[test]
    fn cant_have_excludes_any_matching_record() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Acme", CantHave, None)]);
        assert!(!m.matches(&candidate(vec![job("Initech", None), job("Acme", None)]), &f));
        assert!(m.matches(&candidate(vec![job("Initech", None)]), &f));
    }

    #[test]
    fn may_have_alone_is_disjunctive() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Acme", MayHave, None), (Company, "Initech", MayHave, None)]);
        assert!(m.matches(&candidate(vec![job("Acme", None)]), &f));
        assert!(m.matches(&candidate(vec![job("Initech", None)]), &f));
        assert!(!m.matches(&candidate(vec![job("Globex", None)]), &f));
    }

    #[test]
    fn may_have_is_ignored_next_to_must_have() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Acme", MustHave, None), (Company, "Globex", MayHave, None)]);
        assert!(m.matches(&candidate(vec![job("Acme", None)]), &f));

        let f = set(&[(Company, "Acme", CantHave, None), (Company, "Globex", MayHave, None)]);
        assert!(m.matches(&candidate(vec![job("Initech", None)]), &f));
    }

    #[test]
    fn categories_are_conjoined() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Acme", MustHave, None), (Role, "CTO", MayHave, None)]);

        let mut acme_engineer = job("Acme", None);
        acme_engineer.role = Some("Engineer".into());
        assert!(!m.matches(&candidate(vec![acme_engineer.clone()]), &f));

        // the role can come from a different record than the company
        let mut cto = job("Globex", None);
        cto.role = Some("CTO".into());
        assert!(m.matches(&candidate(vec![acme_engineer, cto]), &f));
    }

    #[test]
    fn value_in_another_category_does_not_count() {
        let m = Matcher::at(now());
        let f = set(&[(Industry, "Acme", MustHave, None)]);
        assert!(!m.matches(&candidate(vec![job("Acme", None)]), &f));
    }

    #[test]
    fn missing_attribute_never_matches() {
        let m = Matcher::at(now());
        let f = set(&[(Seniority, "Senior", MayHave, None)]);
        assert!(!m.matches(&candidate(vec![job("Acme", None)]), &f));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "acme", MustHave, None)]);
        assert!(!m.matches(&candidate(vec![job("Acme", None)]), &f));
    }

    #[test]
    fn current_timing() {
        let m = Matcher::at(now());
        assert!(m.timing_matches(&job("Acme", None), Some(FilterTiming::Current)));
        assert!(m.timing_matches(&job("Acme", Some(now())), Some(FilterTiming::Current)));
        assert!(m.timing_matches(
            &job("Acme", Some(now() + Duration::days(30))),
            Some(FilterTiming::Current)
        ));
        assert!(!m.timing_matches(
            &job("Acme", Some(now() - Duration::seconds(1))),
            Some(FilterTiming::Current)
        ));
    }

    #[test]
    fn past_buckets_need_an_end_date() {
        let m = Matcher::at(now());
        for timing in [
            FilterTiming::OneToTwoYears,
            FilterTiming::TwoToThreeYears,
            FilterTiming::ThreeToFourYears,
            FilterTiming::FourPlusYears,
        ] {
            assert!(!m.timing_matches(&job("Acme", None), Some(timing)));
        }
        assert!(m.timing_matches(&job("Acme", None), None));
    }

    #[test]
    fn bucket_boundaries() {
        let m = Matcher::at(now());
        let ended = |yrs: f64| job("Acme", Some(years_before(yrs)));

        assert!(!m.timing_matches(&ended(1.0), Some(FilterTiming::OneToTwoYears)));
        assert!(m.timing_matches(&ended(1.001), Some(FilterTiming::OneToTwoYears)));

        assert!(m.timing_matches(&ended(2.0), Some(FilterTiming::OneToTwoYears)));
        assert!(!m.timing_matches(&ended(2.0), Some(FilterTiming::TwoToThreeYears)));
        assert!(m.timing_matches(&ended(2.0001), Some(FilterTiming::TwoToThreeYears)));
        assert!(!m.timing_matches(&ended(2.0001), Some(FilterTiming::OneToTwoYears)));

        assert!(m.timing_matches(&ended(3.0), Some(FilterTiming::TwoToThreeYears)));
        assert!(m.timing_matches(&ended(3.5), Some(FilterTiming::ThreeToFourYears)));
        assert!(m.timing_matches(&ended(4.0), Some(FilterTiming::ThreeToFourYears)));
        assert!(!m.timing_matches(&ended(4.0), Some(FilterTiming::FourPlusYears)));
        assert!(m.timing_matches(&ended(10.0), Some(FilterTiming::FourPlusYears)));

        assert!(!m.timing_matches(&ended(0.5), Some(FilterTiming::OneToTwoYears)));
    }

    #[test]
    fn timing_applies_per_record() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Acme", MustHave, Some(FilterTiming::FourPlusYears))]);
        // matching company but wrong window, and right window but wrong company
        let c = candidate(vec![job("Acme", Some(years_before(1.5))), job("Globex", Some(years_before(6.0)))]);
        assert!(!m.matches(&c, &f));
    }

    #[test]
    fn cant_have_only_excludes_inside_its_window() {
        let m = Matcher::at(now());
        let f = set(&[(Company, "Google", CantHave, Some(FilterTiming::Current))]);

        let left = candidate(vec![job("Google", Some(years_before(3.0))), job("Meta", None)]);
        assert!(m.matches(&left, &f));

        let still_there = candidate(vec![job("Google", None)]);
        assert!(!m.matches(&still_there, &f));
    }

    #[test]
    fn may_have_needs_value_and_window_on_one_record() {
        let m = Matcher::at(now());
        let f = set(&[
            (Company, "Google", MayHave, Some(FilterTiming::OneToTwoYears)),
            (Company, "Meta", MayHave, Some(FilterTiming::Current)),
        ]);

        // both values present, both outside their windows
        let wrong_window = candidate(vec![
            job("Google", Some(years_before(3.0))),
            job("Meta", Some(years_before(1.5))),
        ]);
        assert!(!m.matches(&wrong_window, &f));

        // both windows hit, by the wrong companies
        let wrong_value = candidate(vec![job("Amazon", None), job("Apple", Some(years_before(1.5)))]);
        assert!(!m.matches(&wrong_value, &f));

        let google = candidate(vec![job("Google", Some(years_before(1.5)))]);
        assert!(m.matches(&google, &f));

        let meta = candidate(vec![job("Meta", None)]);
        assert!(m.matches(&meta, &f));
    }

    #[test]
    fn amazon_current_scenario() {
        let m = Matcher::at(now());
        let c = candidate(vec![job("Amazon", None)]);
        let mut f = FilterSet::new();
        let id = f
            .add(Company, "Amazon", Some(MustHave), Some(FilterTiming::Current))
            .unwrap();
        assert!(m.matches(&c, &f));

        f.update(id, None, Some(Some(FilterTiming::OneToTwoYears)));
        assert!(!m.matches(&c, &f));
    }

    #[test]
    fn past_employer_cant_have_scenario() {
        let m = Matcher::at(now());
        let c = candidate(vec![job("Google", Some(years_before(3.0))), job("Meta", None)]);
        let f = set(&[(Company, "Google", CantHave, None)]);
        assert!(!m.matches(&c, &f));
    }

    #[test]
    fn filter_preserves_order() {
        let m = Matcher::at(now());
        let mut people = Vec::new();
        for (id, company) in [("a", "Acme"), ("b", "Globex"), ("c", "Acme"), ("d", "Initech"), ("e", "Acme")] {
            let mut c = candidate(vec![job(company, None)]);
            c.id = id.to_string();
            people.push(c);
        }
        let f = set(&[(Company, "Acme", MayHave, None)]);
        let ids: Vec<&str> = m.filter(&people, &f).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "e"]);
    }
}
