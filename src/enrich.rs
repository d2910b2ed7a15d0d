//! Backfill for thin profiles, so every candidate has something to filter on.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::models::{
    Candidate, EmploymentRecord, ExpertTag, ProjectQuestion, RecordKind, Review, CONVERSATION_TOPIC,
};

const COMPANIES: &[&str] = &[
    "Google", "Meta", "Apple", "Amazon", "Microsoft", "Netflix", "Tesla", "Uber", "Airbnb", "Stripe",
];

const ROLES: &[&str] = &[
    "Software Engineer",
    "Product Manager",
    "Data Scientist",
    "Engineering Manager",
    "Technical Lead",
    "Senior Developer",
    "Full Stack Engineer",
    "DevOps Engineer",
    "Machine Learning Engineer",
    "Frontend Developer",
];

const LOCATIONS: &[&str] = &[
    "San Francisco, CA",
    "New York, NY",
    "Seattle, WA",
    "Austin, TX",
    "Boston, MA",
    "Los Angeles, CA",
    "Chicago, IL",
    "Denver, CO",
    "Portland, OR",
    "Miami, FL",
];

const INDUSTRIES: &[&str] = &[
    "Technology",
    "Finance",
    "Healthcare",
    "E-commerce",
    "Entertainment",
    "Automotive",
    "Education",
    "Energy",
    "Real Estate",
    "Consulting",
];

const UNIVERSITIES: &[&str] = &[
    "Stanford University",
    "MIT",
    "Harvard University",
    "UC Berkeley",
    "Carnegie Mellon University",
    "Georgia Tech",
    "University of Michigan",
    "University of Washington",
    "University of Illinois",
    "Caltech",
];

const DEGREES: &[&str] = &[
    "Bachelor of Science in Computer Science",
    "Master of Science in Computer Science",
    "Bachelor of Engineering",
    "Master of Business Administration",
    "Bachelor of Science in Data Science",
    "Master of Engineering",
    "PhD in Computer Science",
    "Bachelor of Arts in Mathematics",
    "Master of Science in AI",
    "Bachelor of Science in Software Engineering",
];

const REVIEW_COMMENTS: &[&str] = &[
    "Exceptional expertise in industry analysis. Provided invaluable strategic insights.",
    "Outstanding communication and deep technical knowledge. Highly recommended.",
    "Very knowledgeable professional with strong analytical skills.",
    "Provided clear and actionable recommendations. Good industry perspective.",
    "Adequate knowledge of the subject matter. Met basic expectations.",
    "Provided useful insights but could be more detailed in analysis.",
];

const TOPICS: &[&str] = &[
    "Digital Transformation",
    "Corporate Strategy",
    "Mergers & Acquisitions",
    "Operational Excellence",
    "Change Management",
    "Supply Chain Optimization",
    "Data Analytics",
    "Customer Experience",
    "Cost Reduction",
    "Market Entry Strategy",
    "Organizational Design",
    "Risk Management",
    "ESG & Sustainability",
    "Innovation Strategy",
    "Post-Merger Integration",
    "Pricing Strategy",
    "Business Model Transformation",
    "Process Optimization",
    "IT Strategy",
    "Talent Management",
];

const PROJECT_TYPES: &[&str] = &[
    "Data Analytics Implementation",
    "Cloud Migration",
    "System Architecture Redesign",
    "Performance Optimization",
    "Security Enhancement",
];

const CLIENTS: &[&str] = &[
    "TechCorp",
    "GlobalFinance",
    "HealthTech",
    "RetailGiant",
    "EnergyInnovate",
    "LogisticsPro",
    "MediaStream",
    "InsureTech",
    "AutoMotive",
    "SmartManufacturing",
];

// {type} and {client} are substituted
const PROJECT_NAMES: &[&str] = &[
    "{type} for {client}",
    "{client} {type} Initiative",
    "{type} Transformation at {client}",
    "{client} Digital Evolution: {type}",
    "Enterprise {type} for {client}",
];

const QUESTIONS: &[&str] = &[
    "What was your role in implementing the data analytics pipeline?",
    "How did you approach scaling the system architecture?",
    "What were the key challenges in the project and how did you overcome them?",
    "Can you describe your experience with cloud infrastructure optimization?",
    "How did you handle stakeholder management in this project?",
    "What methodologies did you use for project delivery?",
    "How did you ensure data security and compliance?",
    "What was your approach to team leadership and mentoring?",
    "How did you measure and improve system performance?",
    "What innovations did you introduce to improve efficiency?",
];

const ANSWERS: &[&str] = &[
    "Led the end-to-end implementation of a robust data pipeline processing over 1M events daily.",
    "Designed a microservices architecture on Kubernetes with traffic-based auto-scaling, cutting costs by 40%.",
    "The main challenge was data consistency across services. Event sourcing and clear data ownership solved it.",
    "Cut AWS infrastructure costs by 35% through right-sizing and spot instances for non-critical workloads.",
    "Ran weekly stakeholder syncs and kept project dashboards current.",
    "Two-week Scrum sprints, with automated testing and CI/CD for faster delivery.",
    "Encryption at rest and in transit, role-based access control and regular security audits.",
    "Mentored 5 junior developers, ran code reviews and wrote up team best practices.",
    "Reduced API response times by 60% through query optimization and caching.",
    "Automated deployments, taking release time from 2 hours to 15 minutes.",
];

const SENIORITY: [&str; 3] = ["Senior", "Mid-Level", "Junior"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub jobs_added: usize,
    pub education_added: usize,
    pub reviews_added: usize,
    pub topics_added: usize,
    pub questions_added: usize,
    pub rating_derived: bool,
}

impl BackfillReport {
    pub fn changed(&self) -> bool {
        self.jobs_added > 0
            || self.education_added > 0
            || self.reviews_added > 0
            || self.topics_added > 0
            || self.questions_added > 0
            || self.rating_derived
    }
}

fn pick<R: Rng>(rng: &mut R, pool: &[&str]) -> String {
    pool.choose(rng).copied().unwrap_or_default().to_string()
}

/// First of `month` in the year `years_back` before `now`.
fn first_of_month(now: DateTime<Utc>, years_back: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(now.year() - years_back, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

pub fn sample_jobs<R: Rng>(rng: &mut R, now: DateTime<Utc>, count: usize) -> Vec<EmploymentRecord> {
    (0..count)
        .map(|i| {
            let end = if i == 0 {
                Some(now)
            } else {
                first_of_month(now, i as i32, now.month())
            };
            EmploymentRecord {
                company: Some(pick(rng, COMPANIES)),
                role: Some(pick(rng, ROLES)),
                seniority_level: Some(SENIORITY[i.min(2)].to_string()),
                location: Some(pick(rng, LOCATIONS)),
                industry: Some(pick(rng, INDUSTRIES)),
                description: Some(format!("Led key initiatives and projects in {} role.", pick(rng, ROLES))),
                start_date: first_of_month(now, i as i32 + 1, now.month()),
                end_date: end,
                is_education: false,
                kind: Some(RecordKind::Experience),
                ..Default::default()
            }
        })
        .collect()
}

pub fn sample_education<R: Rng>(rng: &mut R, now: DateTime<Utc>, count: usize) -> Vec<EmploymentRecord> {
    (0..count)
        .map(|i| {
            let i = i as i32;
            EmploymentRecord {
                company: Some(pick(rng, UNIVERSITIES)),
                role: Some(pick(rng, DEGREES)),
                location: Some(pick(rng, LOCATIONS)),
                description: Some("Graduated with honors".to_string()),
                start_date: first_of_month(now, i * 2 + 6, 9),
                end_date: first_of_month(now, i * 2 + 2, 6),
                is_education: true,
                kind: Some(RecordKind::Education),
                ..Default::default()
            }
        })
        .collect()
}

pub fn sample_reviews<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<Review> {
    let count: usize = rng.gen_range(6..=13);
    (0..count)
        .map(|i| Review {
            rating: Some(rng.gen_range(3.0..5.0)),
            comment: Some(pick(rng, REVIEW_COMMENTS)),
            date: Some(now - chrono::Duration::days(30 * i as i64 + rng.gen_range(0..28))),
        })
        .collect()
}

/// 3 to 7 distinct conversation topics.
pub fn sample_topics<R: Rng>(rng: &mut R) -> Vec<ExpertTag> {
    let count: usize = rng.gen_range(3..=7);
    TOPICS
        .choose_multiple(rng, count)
        .map(|topic| ExpertTag {
            category: CONVERSATION_TOPIC.to_string(),
            value: topic.to_string(),
        })
        .collect()
}

/// 2 to 4 projects, each with 3 to 5 answered questions.
pub fn sample_questions<R: Rng>(rng: &mut R) -> Vec<ProjectQuestion> {
    let projects: usize = rng.gen_range(2..=4);
    let mut questions = Vec::new();

    for _ in 0..projects {
        let project_id = Uuid::new_v4().to_string();
        let project_type = pick(rng, PROJECT_TYPES);
        let name = pick(rng, PROJECT_NAMES)
            .replace("{type}", &project_type)
            .replace("{client}", &pick(rng, CLIENTS));

        let count: i64 = rng.gen_range(3..=5);
        for order in 1..=count {
            questions.push(ProjectQuestion {
                project_id: Some(project_id.clone()),
                project_name: Some(name.clone()),
                project_type: Some(project_type.clone()),
                question: pick(rng, QUESTIONS),
                answer: Some(pick(rng, ANSWERS)),
                display_order: Some(order),
            });
        }
    }
    questions
}

/// Fill in missing experience, education and reviews, then derive the
/// rating. Existing records are never touched.
pub fn backfill<R: Rng>(candidate: &mut Candidate, now: DateTime<Utc>, rng: &mut R) -> BackfillReport {
    let mut report = BackfillReport::default();

    if candidate.experience().next().is_none() {
        let jobs = sample_jobs(rng, now, 3);
        report.jobs_added = jobs.len();
        candidate.jobs.extend(jobs);
    }

    if candidate.education().next().is_none() {
        let education = sample_education(rng, now, 2);
        report.education_added = education.len();
        candidate.jobs.extend(education);
    }

    if candidate.reviews.is_empty() {
        candidate.reviews = sample_reviews(rng, now);
        report.reviews_added = candidate.reviews.len();
    }

    if candidate.questions.is_empty() {
        candidate.questions = sample_questions(rng);
        report.questions_added = candidate.questions.len();
    }

    report.rating_derived = candidate.derive_rating();

    if candidate.conversation_topics().next().is_none() {
        let topics = sample_topics(rng);
        report.topics_added = topics.len();
        candidate.tags.extend(topics);
    }

    if report.changed() {
        tracing::debug!(candidate = %candidate.id, ?report, "backfilled candidate");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn empty_profile_gets_everything() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut c = Candidate { id: "x".into(), ..Default::default() };
        let report = backfill(&mut c, now(), &mut rng);

        assert_eq!(report.jobs_added, 3);
        assert_eq!(report.education_added, 2);
        assert!((6..=13).contains(&report.reviews_added));
        assert!((3..=7).contains(&report.topics_added));
        assert!(report.questions_added >= 6 && report.questions_added <= 20);
        assert!(report.rating_derived);
        assert!(c.rating >= 3.0 && c.rating < 5.0);
        assert_eq!(c.experience().count(), 3);
        assert_eq!(c.education().count(), 2);
    }

    #[test]
    fn sample_job_dates_step_back_a_year() {
        let mut rng = StdRng::seed_from_u64(1);
        let jobs = sample_jobs(&mut rng, now(), 3);

        assert_eq!(jobs[0].end_date, Some(now()));
        assert_eq!(jobs[0].seniority_level.as_deref(), Some("Senior"));
        assert_eq!(jobs[1].end_date, Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(jobs[1].seniority_level.as_deref(), Some("Mid-Level"));
        assert_eq!(jobs[2].start_date, Some(Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(jobs[2].seniority_level.as_deref(), Some("Junior"));
        assert!(jobs.iter().all(|j| COMPANIES.contains(&j.company.as_deref().unwrap())));
    }

    #[test]
    fn sample_education_dates() {
        let mut rng = StdRng::seed_from_u64(1);
        let edu = sample_education(&mut rng, now(), 2);
        assert!(edu.iter().all(|e| e.is_education()));
        assert_eq!(edu[0].end_date, Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(edu[1].start_date, Some(Utc.with_ymd_and_hms(2017, 9, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn complete_profile_is_left_alone() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut c = Candidate {
            id: "x".into(),
            rating: 4.2,
            jobs: vec![
                EmploymentRecord { company: Some("Acme".into()), ..Default::default() },
                EmploymentRecord { company: Some("MIT".into()), is_education: true, ..Default::default() },
            ],
            reviews: vec![Review { rating: Some(5.0), ..Default::default() }],
            tags: vec![ExpertTag { category: CONVERSATION_TOPIC.into(), value: "IT Strategy".into() }],
            questions: vec![ProjectQuestion { question: "Why?".into(), ..Default::default() }],
            ..Default::default()
        };
        let report = backfill(&mut c, now(), &mut rng);
        assert!(!report.changed());
        assert_eq!(c.jobs.len(), 2);
        assert_eq!(c.rating, 4.2);
    }

    #[test]
    fn topics_are_distinct() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let topics = sample_topics(&mut rng);
            assert!((3..=7).contains(&topics.len()));
            let mut values: Vec<&str> = topics.iter().map(|t| t.value.as_str()).collect();
            values.sort();
            values.dedup();
            assert_eq!(values.len(), topics.len());
            assert!(topics.iter().all(|t| t.category == CONVERSATION_TOPIC));
        }
    }

    #[test]
    fn questions_grouped_by_project() {
        let mut rng = StdRng::seed_from_u64(2);
        let questions = sample_questions(&mut rng);

        let mut projects: Vec<&str> = questions.iter().filter_map(|q| q.project_id.as_deref()).collect();
        projects.dedup();
        assert!((2..=4).contains(&projects.len()));

        for project in projects {
            let group: Vec<&ProjectQuestion> =
                questions.iter().filter(|q| q.project_id.as_deref() == Some(project)).collect();
            assert!((3..=5).contains(&group.len()));
            let order: Vec<i64> = group.iter().filter_map(|q| q.display_order).collect();
            assert_eq!(order, (1..=group.len() as i64).collect::<Vec<_>>());
            let name = group[0].project_name.as_deref().unwrap();
            assert!(!name.contains('{'));
            assert!(name.contains(group[0].project_type.as_deref().unwrap()));
        }
    }

    #[test]
    fn other_tags_do_not_count_as_topics() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut c = Candidate {
            id: "x".into(),
            tags: vec![ExpertTag { category: "skill".into(), value: "Rust".into() }],
            ..Default::default()
        };
        let report = backfill(&mut c, now(), &mut rng);
        assert!(report.topics_added >= 3);
        assert_eq!(c.tags[0].value, "Rust");
        assert_eq!(c.conversation_topics().count(), report.topics_added);
    }

    #[test]
    fn education_only_profile_gets_experience() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = Candidate {
            id: "x".into(),
            jobs: vec![EmploymentRecord { company: Some("MIT".into()), is_education: true, ..Default::default() }],
            ..Default::default()
        };
        let report = backfill(&mut c, now(), &mut rng);
        assert_eq!(report.jobs_added, 3);
        assert_eq!(report.education_added, 0);
        assert_eq!(c.jobs[0].company.as_deref(), Some("MIT"));
    }
}
