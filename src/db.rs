use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::models::{
    parse_date, Candidate, EmploymentRecord, ExpertTag, PipelineEntry, ProjectQuestion, Review,
};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "opened candidate store");
        Ok(Self { conn, path: path.to_path_buf() })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: PathBuf::from(":memory:") })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS candidates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                profession TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                geography TEXT NOT NULL DEFAULT '',
                description TEXT,
                email TEXT,
                phone TEXT,
                linkedin_link TEXT,
                rating REAL NOT NULL DEFAULT 0,
                num_raters INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS employment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id TEXT NOT NULL REFERENCES candidates(id),
                position INTEGER NOT NULL,
                company TEXT,
                role TEXT,
                seniority_level TEXT,
                location TEXT,
                industry TEXT,
                sub_industry TEXT,
                description TEXT,
                start_date TEXT,
                end_date TEXT,
                is_education INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id TEXT NOT NULL REFERENCES candidates(id),
                rating REAL,
                comment TEXT,
                date TEXT
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id TEXT NOT NULL REFERENCES candidates(id),
                category TEXT NOT NULL,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id TEXT NOT NULL REFERENCES candidates(id),
                project_id TEXT,
                project_name TEXT,
                project_type TEXT,
                question TEXT NOT NULL,
                answer TEXT,
                display_order INTEGER
            );

            CREATE TABLE IF NOT EXISTS pipeline (
                candidate_id TEXT PRIMARY KEY REFERENCES candidates(id),
                status TEXT NOT NULL DEFAULT 'Sourced',
                added_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_employment_candidate ON employment(candidate_id, position);
            CREATE INDEX IF NOT EXISTS idx_reviews_candidate ON reviews(candidate_id);
            CREATE INDEX IF NOT EXISTS idx_tags_candidate ON tags(candidate_id);
            CREATE INDEX IF NOT EXISTS idx_questions_candidate ON questions(candidate_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='candidates'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'scout init' first."
            ));
        }
        Ok(())
    }

    // --- Candidate set revision ---

    /// Changes whenever the stored candidate set does; derived views such as
    /// filter options are stale once it moves.
    pub fn revision(&self) -> Result<i64> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'revision'", [], |row| row.get(0))
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    fn bump_revision(&self) -> Result<i64> {
        let next = self.revision()? + 1;
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES ('revision', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [next.to_string()],
        )?;
        Ok(next)
    }

    // --- Candidate operations ---

    /// Insert or replace candidates by id. Existing candidates keep their
    /// place in the store's ordering; their jobs and reviews are replaced.
    pub fn import_candidates(&self, candidates: &[Candidate]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;

        for c in candidates {
            if c.id.trim().is_empty() {
                return Err(anyhow!("Candidate '{}' has no id", c.name));
            }

            tx.execute(
                "INSERT INTO candidates (id, name, profession, company, geography, description,
                                         email, phone, linkedin_link, rating, num_raters)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    profession = excluded.profession,
                    company = excluded.company,
                    geography = excluded.geography,
                    description = excluded.description,
                    email = excluded.email,
                    phone = excluded.phone,
                    linkedin_link = excluded.linkedin_link,
                    rating = excluded.rating,
                    num_raters = excluded.num_raters,
                    updated_at = datetime('now')",
                params![
                    c.id,
                    c.name,
                    c.profession,
                    c.company,
                    c.geography,
                    c.description,
                    c.email,
                    c.phone,
                    c.linkedin_link,
                    c.rating,
                    c.num_raters,
                ],
            )?;

            tx.execute("DELETE FROM employment WHERE candidate_id = ?1", [&c.id])?;
            for (position, job) in c.jobs.iter().enumerate() {
                tx.execute(
                    "INSERT INTO employment (candidate_id, position, company, role, seniority_level,
                                             location, industry, sub_industry, description,
                                             start_date, end_date, is_education)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        c.id,
                        position as i64,
                        job.company,
                        job.role,
                        job.seniority_level,
                        job.location,
                        job.industry,
                        job.sub_industry,
                        job.description,
                        job.start_date.map(|d| d.to_rfc3339()),
                        job.end_date.map(|d| d.to_rfc3339()),
                        job.is_education(),
                    ],
                )?;
            }

            tx.execute("DELETE FROM reviews WHERE candidate_id = ?1", [&c.id])?;
            for review in &c.reviews {
                tx.execute(
                    "INSERT INTO reviews (candidate_id, rating, comment, date) VALUES (?1, ?2, ?3, ?4)",
                    params![c.id, review.rating, review.comment, review.date.map(|d| d.to_rfc3339())],
                )?;
            }

            tx.execute("DELETE FROM tags WHERE candidate_id = ?1", [&c.id])?;
            for tag in &c.tags {
                tx.execute(
                    "INSERT INTO tags (candidate_id, category, value) VALUES (?1, ?2, ?3)",
                    params![c.id, tag.category, tag.value],
                )?;
            }

            tx.execute("DELETE FROM questions WHERE candidate_id = ?1", [&c.id])?;
            for q in &c.questions {
                tx.execute(
                    "INSERT INTO questions (candidate_id, project_id, project_name, project_type,
                                            question, answer, display_order)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![c.id, q.project_id, q.project_name, q.project_type, q.question, q.answer, q.display_order],
                )?;
            }
        }

        tx.commit().context("Failed to import candidates")?;
        let revision = self.bump_revision()?;
        tracing::info!(count = candidates.len(), revision, "imported candidates");
        Ok(candidates.len())
    }

    pub fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, profession, company, geography, description, email, phone,
                    linkedin_link, rating, num_raters
             FROM candidates ORDER BY rowid",
        )?;
        let mut candidates = stmt
            .query_map([], Self::row_to_candidate)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list candidates")?;

        for c in &mut candidates {
            self.load_children(c)?;
        }
        Ok(candidates)
    }

    pub fn get_candidate(&self, id: &str) -> Result<Option<Candidate>> {
        let result = self.conn.query_row(
            "SELECT id, name, profession, company, geography, description, email, phone,
                    linkedin_link, rating, num_raters
             FROM candidates WHERE id = ?1",
            [id],
            Self::row_to_candidate,
        );
        match result {
            Ok(mut c) => {
                self.load_children(&mut c)?;
                Ok(Some(c))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn count_candidates(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM candidates", [], |row| row.get(0))?;
        Ok(count)
    }

    fn load_children(&self, c: &mut Candidate) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT company, role, seniority_level, location, industry, sub_industry, description,
                    start_date, end_date, is_education
             FROM employment WHERE candidate_id = ?1 ORDER BY position",
        )?;
        c.jobs = stmt
            .query_map([&c.id], Self::row_to_employment)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare_cached(
            "SELECT rating, comment, date FROM reviews WHERE candidate_id = ?1 ORDER BY id",
        )?;
        c.reviews = stmt
            .query_map([&c.id], |row| {
                Ok(Review {
                    rating: row.get(0)?,
                    comment: row.get(1)?,
                    date: read_date(row.get(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare_cached(
            "SELECT category, value FROM tags WHERE candidate_id = ?1 ORDER BY id",
        )?;
        c.tags = stmt
            .query_map([&c.id], |row| {
                Ok(ExpertTag {
                    category: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare_cached(
            "SELECT project_id, project_name, project_type, question, answer, display_order
             FROM questions WHERE candidate_id = ?1 ORDER BY id",
        )?;
        c.questions = stmt
            .query_map([&c.id], |row| {
                Ok(ProjectQuestion {
                    project_id: row.get(0)?,
                    project_name: row.get(1)?,
                    project_type: row.get(2)?,
                    question: row.get(3)?,
                    answer: row.get(4)?,
                    display_order: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    fn row_to_candidate(row: &rusqlite::Row) -> rusqlite::Result<Candidate> {
        Ok(Candidate {
            id: row.get(0)?,
            name: row.get(1)?,
            profession: row.get(2)?,
            company: row.get(3)?,
            geography: row.get(4)?,
            description: row.get(5)?,
            email: row.get(6)?,
            phone: row.get(7)?,
            linkedin_link: row.get(8)?,
            rating: row.get(9)?,
            num_raters: row.get(10)?,
            jobs: Vec::new(),
            reviews: Vec::new(),
            tags: Vec::new(),
            questions: Vec::new(),
        })
    }

    fn row_to_employment(row: &rusqlite::Row) -> rusqlite::Result<EmploymentRecord> {
        Ok(EmploymentRecord {
            company: row.get(0)?,
            role: row.get(1)?,
            seniority_level: row.get(2)?,
            location: row.get(3)?,
            industry: row.get(4)?,
            sub_industry: row.get(5)?,
            description: row.get(6)?,
            start_date: read_date(row.get(7)?),
            end_date: read_date(row.get(8)?),
            is_education: row.get(9)?,
            kind: None,
        })
    }

    // --- Pipeline operations ---

    /// Returns false if the candidate was already in the pipeline.
    pub fn add_to_pipeline(&self, candidate_id: &str) -> Result<bool> {
        if self.get_candidate(candidate_id)?.is_none() {
            return Err(anyhow!("Candidate '{}' not found", candidate_id));
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO pipeline (candidate_id) VALUES (?1)",
            [candidate_id],
        )?;
        if inserted > 0 {
            tracing::debug!(candidate_id, "added to pipeline");
        }
        Ok(inserted > 0)
    }

    pub fn is_in_pipeline(&self, candidate_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM pipeline WHERE candidate_id = ?1", [candidate_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_pipeline(&self) -> Result<Vec<PipelineEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.candidate_id, c.name, p.status, p.added_at
             FROM pipeline p
             JOIN candidates c ON c.id = p.candidate_id
             ORDER BY p.added_at, p.rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PipelineEntry {
                candidate_id: row.get(0)?,
                name: row.get(1)?,
                status: row.get(2)?,
                added_at: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list pipeline")
    }
}

fn read_date(value: Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().and_then(parse_date)
}
