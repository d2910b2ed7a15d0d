mod config;
mod db;
mod enrich;
mod filter;
mod matcher;
mod models;
mod options;
mod outreach;
mod profile;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::Config;
use db::Database;
use filter::{FilterCategory, FilterLogic, FilterTiming, SavedSearch};
use matcher::Matcher;
use models::Candidate;
use options::FilterOptions;
use outreach::RequestKind;
use profile::truncate;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Expert sourcing - filter candidate profiles and build a pipeline")]
struct Cli {
    /// Path to the candidate database
    #[arg(long, global = true, env = "SCOUT_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Import candidate profiles from a JSON file
    Import {
        /// JSON file holding one profile or an array of profiles
        file: PathBuf,

        /// Fill in missing jobs, education and reviews after import
        #[arg(long)]
        backfill: bool,
    },

    /// Fill in missing jobs, education and reviews for stored candidates
    Backfill,

    /// List the values available for each filter category
    Options {
        /// Only this category (company, role, seniority, location, industry)
        category: Option<String>,

        /// Case-insensitive substring to narrow the list
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Filter candidates and print the matches
    Filter {
        #[command(flatten)]
        filters: FilterArgs,

        /// Order of the printed results
        #[arg(long, value_enum, default_value = "store")]
        sort: SortOrder,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse filtered candidates interactively
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show a candidate profile
    Show {
        /// Candidate ID
        id: String,
    },

    /// Manage the sourcing pipeline
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },

    /// Build an outreach email link for a candidate
    Request {
        #[arg(value_enum)]
        kind: RequestKind,

        /// Candidate ID
        id: String,
    },
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// Add candidates to the pipeline
    Add {
        /// Candidate IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List candidates in the pipeline
    List,
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Required job attribute: category=value[@timing]
    #[arg(long = "must", value_name = "FILTER")]
    must_have: Vec<String>,

    /// Excluded job attribute: category=value[@timing]
    #[arg(long = "cant", value_name = "FILTER")]
    cant_have: Vec<String>,

    /// Optional job attribute (any one suffices): category=value[@timing]
    #[arg(long = "may", value_name = "FILTER")]
    may_have: Vec<String>,

    /// Start from a shared query string (filters=...&description=...)
    #[arg(short, long)]
    query: Option<String>,

    /// Drop the filters carried by --query
    #[arg(long)]
    clear: bool,

    /// Drop the --query filters in one category
    #[arg(long, value_name = "CATEGORY")]
    clear_category: Vec<String>,

    /// Drop a --query filter by id
    #[arg(long, value_name = "ID")]
    remove: Vec<String>,

    /// Change a --query filter's logic: ID=must_have|cant_have|may_have
    #[arg(long, value_name = "ID=LOGIC")]
    set_logic: Vec<String>,

    /// Change a --query filter's timing: ID=current|1_2_years|2_3_years|3_4_years|4_plus_years|none
    #[arg(long, value_name = "ID=TIMING")]
    set_timing: Vec<String>,

    /// What kind of expert you are looking for
    #[arg(short, long)]
    description: Option<String>,
}

fn split_edit(arg: &str) -> Result<(Uuid, &str)> {
    let (id, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected ID=VALUE, got '{}'", arg))?;
    Ok((parse_id(id)?, value))
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).with_context(|| format!("'{}' is not a filter id", id))
}

impl FilterArgs {
    /// Shared query first, then edits to it, then the new flags.
    fn to_search(&self) -> Result<SavedSearch> {
        let mut search = match &self.query {
            Some(q) => SavedSearch::from_query(q)?,
            None => SavedSearch::default(),
        };
        let filters = &mut search.filters;

        if self.clear {
            filters.clear();
        }
        for category in &self.clear_category {
            let removed = filters.clear_category(category.parse()?);
            tracing::debug!(category = %category, removed, "cleared category");
        }
        for id in &self.remove {
            if !filters.remove(parse_id(id)?) {
                return Err(anyhow!("No filter with id {}", id));
            }
        }
        for arg in &self.set_logic {
            let (id, logic) = split_edit(arg)?;
            if !filters.update(id, Some(logic.parse()?), None) {
                return Err(anyhow!("No filter with id {}", id));
            }
            if let Some(c) = filters.get(id) {
                tracing::debug!(filter = %c, "changed logic");
            }
        }
        for arg in &self.set_timing {
            let (id, timing) = split_edit(arg)?;
            let timing = match timing {
                "none" | "" => None,
                t => Some(t.parse::<FilterTiming>()?),
            };
            if !filters.update(id, None, Some(timing)) {
                return Err(anyhow!("No filter with id {}", id));
            }
        }

        let groups = [
            (&self.must_have, FilterLogic::MustHave),
            (&self.cant_have, FilterLogic::CantHave),
            (&self.may_have, FilterLogic::MayHave),
        ];
        for (args, logic) in groups {
            for arg in args {
                let (category, value, timing) = filter::parse_arg(arg)?;
                filters.add(category, value, Some(logic), timing)?;
            }
        }

        if let Some(desc) = &self.description {
            search.description = Some(desc.clone());
        }
        Ok(search)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortOrder {
    /// Store order (as imported)
    Store,
    /// Highest rated first
    Rating,
    /// Alphabetical by name
    Name,
}

/// One profile object or an array of them.
fn parse_import(content: &str) -> serde_json::Result<Vec<Candidate>> {
    if content.trim_start().starts_with('[') {
        serde_json::from_str(content)
    } else {
        serde_json::from_str(content).map(|c: Candidate| vec![c])
    }
}

fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Warn about filter values no stored candidate has, since exact matching
/// would silently return nothing for them.
fn warn_unknown_values(search: &SavedSearch, options: &FilterOptions) {
    for c in &search.filters {
        if options.contains(c.category, &c.value) {
            continue;
        }
        match options.suggest(c.category, &c.value) {
            Some(s) => eprintln!("warning: no candidate has {} '{}' (did you mean '{}'?)", c.category, c.value, s),
            None => eprintln!("warning: no candidate has {} '{}'", c.category, c.value),
        }
    }
}

fn apply_filters(
    db: &Database,
    args: &FilterArgs,
    now: DateTime<Utc>,
) -> Result<(Vec<Candidate>, SavedSearch)> {
    let search = args.to_search()?;
    let candidates = db.list_candidates()?;
    warn_unknown_values(&search, &FilterOptions::extract(&candidates));

    let matcher = Matcher::at(now);
    let matched = matcher
        .filter(&candidates, &search.filters)
        .into_iter()
        .cloned()
        .collect();
    Ok((matched, search))
}

fn backfill_all(db: &Database) -> Result<usize> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    let changed: Vec<Candidate> = db
        .list_candidates()?
        .into_iter()
        .filter_map(|mut c| enrich::backfill(&mut c, now, &mut rng).changed().then_some(c))
        .collect();

    if !changed.is_empty() {
        db.import_candidates(&changed)?;
    }
    Ok(changed.len())
}

fn print_profile(c: &Candidate) {
    let now = Utc::now();
    println!("{} ({})", c.name, c.id);
    if !c.profession.is_empty() || !c.company.is_empty() {
        println!("{} at {}", c.profession, c.company);
    }
    if !c.geography.is_empty() {
        println!("Location: {}", c.geography);
    }
    println!("Rating: {:.1} ({} reviews)", c.rating, c.reviews.len());
    if let Some(email) = &c.email {
        println!("Email: {}", email);
    }
    if let Some(phone) = &c.phone {
        println!("Phone: {}", phone);
    }
    if let Some(link) = &c.linkedin_link {
        println!("LinkedIn: {}", link);
    }
    if let Some(desc) = &c.description {
        println!("\n{}", textwrap::fill(desc, 80));
    }

    for (title, education) in [("Experience", false), ("Education", true)] {
        let records = profile::history(c, education, now);
        if records.is_empty() {
            continue;
        }
        println!("\n--- {} ---", title);
        for record in records {
            for line in profile::history_lines(record, now) {
                println!("{}", line);
            }
        }
    }

    let topics: Vec<&str> = c.conversation_topics().collect();
    if !topics.is_empty() {
        println!("\n--- Conversation topics ---");
        println!("{}", textwrap::fill(&topics.join(", "), 80));
    }

    let groups = profile::question_groups(c);
    if !groups.is_empty() {
        println!("\n--- Project questions ---");
        for (project, questions) in groups {
            println!("{}", project);
            for q in questions {
                println!("  Q: {}", q.question);
                if let Some(answer) = &q.answer {
                    println!("{}", textwrap::indent(&textwrap::fill(answer, 74), "     "));
                }
            }
        }
    }

    if !c.reviews.is_empty() {
        println!("\n--- Reviews ---");
        for review in &c.reviews {
            let rating = review.rating.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".to_string());
            println!("{:>4}  {}", rating, review.comment.as_deref().unwrap_or(""));
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(&config);

    let db = Database::open(&config.database_path(cli.db.as_deref()))?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!(
                "Database initialized at {} ({} candidates)",
                db.path().display(),
                db.count_candidates()?
            );
        }

        Commands::Import { file, backfill } => {
            db.ensure_initialized()?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut candidates = parse_import(&content)
                .with_context(|| format!("Failed to parse candidates from {}", file.display()))?;
            for c in &mut candidates {
                c.derive_rating();
            }

            let count = db.import_candidates(&candidates)?;
            println!("Imported {} candidate(s) (revision {})", count, db.revision()?);

            if backfill {
                let filled = backfill_all(&db)?;
                println!("Backfilled {} candidate(s)", filled);
            }
        }

        Commands::Backfill => {
            db.ensure_initialized()?;
            let filled = backfill_all(&db)?;
            println!("Backfilled {} candidate(s)", filled);
        }

        Commands::Options { category, search } => {
            db.ensure_initialized()?;
            let options = FilterOptions::extract(&db.list_candidates()?);
            let categories = match &category {
                Some(c) => vec![c.parse::<FilterCategory>()?],
                None => FilterCategory::ALL.to_vec(),
            };
            for category in categories {
                let values: Vec<&str> = match &search {
                    Some(term) => options.search(category, term),
                    None => options.values(category).iter().map(String::as_str).collect(),
                };
                println!("{} ({}):", category, values.len());
                if values.is_empty() {
                    println!("  No options found.");
                }
                for value in values {
                    println!("  {}", value);
                }
            }
            if category.is_none() && search.is_none() && !options.sub_industries.is_empty() {
                println!("sub-industry (display only, {}):", options.sub_industries.len());
                for value in &options.sub_industries {
                    println!("  {}", value);
                }
            }
        }

        Commands::Filter { filters, sort, json } => {
            db.ensure_initialized()?;
            let (mut matched, search) = apply_filters(&db, &filters, Utc::now())?;

            match sort {
                SortOrder::Store => {}
                SortOrder::Rating => matched.sort_by(|a, b| {
                    b.rating.partial_cmp(&a.rating).unwrap_or(std::cmp::Ordering::Equal)
                }),
                SortOrder::Name => matched.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&matched)?);
                return Ok(());
            }

            for c in &search.filters {
                println!("  [{}] {}", c.id, c);
            }
            if matched.is_empty() {
                println!("No candidates match.");
            } else {
                println!("{:<12} {:<24} {:<24} {:>6} {:<20}", "ID", "NAME", "PROFESSION", "RATING", "CURRENT");
                println!("{}", "-".repeat(90));
                for c in &matched {
                    let current = c
                        .current_job()
                        .and_then(|j| j.company.clone())
                        .unwrap_or_else(|| c.company.clone());
                    println!(
                        "{:<12} {:<24} {:<24} {:>6.1} {:<20}",
                        truncate(&c.id, 12),
                        truncate(&c.name, 22),
                        truncate(&c.profession, 22),
                        c.rating,
                        truncate(&current, 20)
                    );
                }
                println!("\n{} match(es)", matched.len());
            }

            let query = search.to_query()?;
            if !query.is_empty() {
                println!("Share: ?{}", query);
            }
        }

        Commands::Browse { filters } => {
            db.ensure_initialized()?;
            let now = Utc::now();
            let (matched, _) = apply_filters(&db, &filters, now)?;
            tui::run_browse(&db, matched, now)?;
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            match db.get_candidate(&id)? {
                Some(c) => {
                    print_profile(&c);
                    if db.is_in_pipeline(&c.id)? {
                        println!("\n(In pipeline)");
                    }
                }
                None => println!("Candidate '{}' not found.", id),
            }
        }

        Commands::Pipeline { command } => {
            db.ensure_initialized()?;
            match command {
                PipelineCommands::Add { ids } => {
                    for id in ids {
                        match db.add_to_pipeline(&id) {
                            Ok(true) => println!("Added '{}' to pipeline.", id),
                            Ok(false) => println!("'{}' is already in the pipeline.", id),
                            Err(e) => eprintln!("Skipped '{}': {}", id, e),
                        }
                    }
                }

                PipelineCommands::List => {
                    let entries = db.list_pipeline()?;
                    if entries.is_empty() {
                        println!("Pipeline is empty.");
                    } else {
                        println!("{:<12} {:<28} {:<10} {:<20}", "ID", "NAME", "STATUS", "ADDED");
                        println!("{}", "-".repeat(72));
                        for e in entries {
                            println!(
                                "{:<12} {:<28} {:<10} {:<20}",
                                truncate(&e.candidate_id, 12),
                                truncate(&e.name, 26),
                                e.status,
                                e.added_at
                            );
                        }
                    }
                }
            }
        }

        Commands::Request { kind, id } => {
            db.ensure_initialized()?;
            let candidate = db
                .get_candidate(&id)?
                .ok_or_else(|| anyhow!("Candidate '{}' not found", id))?;
            let link = outreach::mailto_link(&candidate, kind, config.sender_name.as_deref())?;
            println!("{}", link);
        }
    }

    Ok(())
}
