mod logging;
mod seed;

use std::io::Read;
use std::path::{Path, PathBuf};

use activator_core::model::{Association, ParseIdError, SessionDraft, SessionRecord, UserId};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use services::analytics::DateWindow;
use services::export::write_export;
use services::{
    AggregationError, AppConfig, AppServices, AppServicesError, Clock, ConfigError,
    DashboardFilter, ExportError, FeedError, FeedUpdate, SessionScope, SessionStore, SubmitError,
};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Services(#[from] AppServicesError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("invalid --db value: {raw:?}")]
    InvalidDbUrl { raw: String },
    #[error("--from {from} is after --to {to}")]
    InvalidWindow { from: NaiveDate, to: NaiveDate },
    #[error("invalid --user value: {0}")]
    User(#[from] ParseIdError),
    #[error("failed to read draft from {path}: {source}")]
    ReadDraft {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session feed ended without a snapshot")]
    FeedEnded,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Record school cricket sessions and report on them.
#[derive(Debug, Parser)]
#[command(name = "activator", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// `SQLite` URL or database file path; overrides `database.url`
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit one session from a JSON draft
    Submit {
        /// Draft file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: PathBuf,
    },
    /// Print the newest sessions as JSON
    Recent {
        /// Only sessions submitted by this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Follow the newest sessions until interrupted
    Watch {
        /// Only sessions submitted by this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Headline totals over every session
    Summary,
    /// Dashboard figures, optionally narrowed to one association or recent days
    Breakdown {
        /// Association slug, e.g. `auckland`
        #[arg(long)]
        association: Option<Association>,
        /// Only sessions dated within the last N days
        #[arg(long, conflicts_with_all = ["from", "to"])]
        last_days: Option<u32>,
        /// First session date to include, `YYYY-MM-DD`
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// Last session date to include, `YYYY-MM-DD`
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Write the newest sessions to a CSV file
    Export {
        /// Directory to write the export into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Only sessions submitted by this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Submit randomly generated demo sessions
    Seed {
        #[arg(long, default_value_t = 25)]
        sessions: usize,
    },
}

fn normalize_sqlite_url(raw: &str) -> Result<String, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidDbUrl {
            raw: raw.to_string(),
        });
    }
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite://")
        || trimmed.starts_with("sqlite:file:")
    {
        return Ok(trimmed.to_string());
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    Ok(format!("sqlite://{}", absolute.display()))
}

/// Make sure the database file's directory exists before connecting.
fn prepare_sqlite_dir(db_url: &str) -> Result<(), CliError> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(CliError::InvalidDbUrl {
            raw: db_url.to_string(),
        });
    }
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)?,
        _ => {}
    }
    Ok(())
}

fn scope_for(user: Option<&str>) -> Result<SessionScope, CliError> {
    Ok(match user {
        Some(raw) => SessionScope::Submitter(UserId::new(raw)?),
        None => SessionScope::All,
    })
}

fn read_draft(file: &Path) -> Result<SessionDraft, CliError> {
    let read_err = |source| CliError::ReadDraft {
        path: file.display().to_string(),
        source,
    };
    let raw = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(read_err)?;
        buf
    } else {
        std::fs::read_to_string(file).map_err(read_err)?
    };
    Ok(serde_json::from_str(&raw)?)
}

fn breakdown_filter(
    association: Option<Association>,
    last_days: Option<u32>,
    range: Option<(NaiveDate, NaiveDate)>,
    today: NaiveDate,
) -> Result<DashboardFilter, CliError> {
    let window = match (last_days, range) {
        (Some(days), _) => Some(DateWindow::last_days(days, today)),
        (None, Some((from, to))) => {
            Some(DateWindow::new(from, to).ok_or(CliError::InvalidWindow { from, to })?)
        }
        (None, None) => None,
    };
    Ok(DashboardFilter {
        association,
        window,
    })
}

/// The first snapshot of a fresh feed, i.e. the newest sessions right now.
async fn current_snapshot(
    store: &SessionStore,
    scope: SessionScope,
) -> Result<Vec<SessionRecord>, CliError> {
    let mut feed = store.subscribe(scope);
    let update = feed.next().await;
    feed.cancel();
    match update {
        Some(FeedUpdate::Snapshot(records)) => Ok(records),
        Some(FeedUpdate::Failed(err)) => Err(err.into()),
        None => Err(CliError::FeedEnded),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn watch(store: &SessionStore, scope: SessionScope) -> Result<(), CliError> {
    let mut feed = store.subscribe(scope);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                feed.cancel();
                return Ok(());
            }
            update = feed.next() => match update {
                Some(FeedUpdate::Snapshot(records)) => match records.first() {
                    Some(newest) => {
                        let session = newest.session();
                        println!(
                            "{} sessions; newest: {} ({}) on {}, {} participants",
                            records.len(),
                            session.school(),
                            session.association().label(),
                            session.date(),
                            session.participants(),
                        );
                    }
                    None => println!("0 sessions"),
                },
                Some(FeedUpdate::Failed(err)) => return Err(err.into()),
                None => return Err(CliError::FeedEnded),
            },
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db.as_deref() {
        config.database.url = normalize_sqlite_url(db)?;
    }
    config.validate()?;
    logging::init_logging(&config.logging);

    prepare_sqlite_dir(&config.database.url)?;
    let clock = Clock::system();
    let app = AppServices::new_sqlite(&config, clock).await?;
    let store = app.sessions();

    match cli.command {
        Command::Submit { file } => {
            let id = store.submit(read_draft(&file)?).await?;
            println!("{id}");
        }
        Command::Recent { user } => {
            let records = current_snapshot(&store, scope_for(user.as_deref())?).await?;
            print_json(&records)?;
        }
        Command::Watch { user } => watch(&store, scope_for(user.as_deref())?).await?,
        Command::Summary => print_json(&app.analytics().compute_summary().await?)?,
        Command::Breakdown {
            association,
            last_days,
            from,
            to,
        } => {
            let range = from.zip(to);
            let filter = breakdown_filter(association, last_days, range, app.clock().today())?;
            print_json(&app.analytics().compute_breakdown(&filter).await?)?;
        }
        Command::Export { out, user } => {
            let records = current_snapshot(&store, scope_for(user.as_deref())?).await?;
            let path = write_export(&out, &records, app.clock().today())?;
            println!("{}", path.display());
        }
        Command::Seed { sessions } => {
            let drafts = seed::seed_drafts(&mut rand::rng(), sessions, app.clock().today());
            for draft in drafts {
                store.submit(draft).await?;
            }
            tracing::info!(sessions, "seeded demo sessions");
            println!("seeded {sessions} sessions");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn breakdown_parses_association_slug() {
        let cli = Cli::try_parse_from([
            "activator",
            "breakdown",
            "--association",
            "central-districts",
            "--last-days",
            "30",
        ])
        .unwrap();
        match cli.command {
            Command::Breakdown {
                association,
                last_days,
                ..
            } => {
                assert_eq!(association, Some(Association::CentralDistricts));
                assert_eq!(last_days, Some(30));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn last_days_conflicts_with_explicit_range() {
        let parsed = Cli::try_parse_from([
            "activator",
            "breakdown",
            "--last-days",
            "7",
            "--from",
            "2024-02-01",
            "--to",
            "2024-02-10",
        ]);
        assert!(parsed.is_err());
        let half_range = Cli::try_parse_from(["activator", "breakdown", "--from", "2024-02-01"]);
        assert!(half_range.is_err());
    }

    #[test]
    fn largest_last_days_builds_a_filter() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let filter = breakdown_filter(None, Some(u32::MAX), None, today).unwrap();
        let window = filter.window.unwrap();
        assert_eq!(window.from, NaiveDate::MIN);
        assert_eq!(window.to, today);
    }

    #[test]
    fn explicit_range_must_be_ordered() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();

        let filter = breakdown_filter(Some(Association::Otago), None, Some((from, to)), today)
            .unwrap();
        assert_eq!(filter.window, DateWindow::new(from, to));
        assert_eq!(filter.association, Some(Association::Otago));

        assert!(matches!(
            breakdown_filter(None, None, Some((to, from)), today),
            Err(CliError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn unknown_association_is_rejected() {
        let parsed =
            Cli::try_parse_from(["activator", "breakdown", "--association", "atlantis"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn sqlite_urls_pass_through() {
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:").unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/a.db").unwrap(),
            "sqlite:///tmp/a.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:file:x?mode=memory").unwrap(),
            "sqlite:file:x?mode=memory"
        );
    }

    #[test]
    fn bare_paths_become_absolute_urls() {
        assert_eq!(
            normalize_sqlite_url("/var/data/sessions.db").unwrap(),
            "sqlite:///var/data/sessions.db"
        );
        let relative = normalize_sqlite_url("data/sessions.db").unwrap();
        assert!(relative.starts_with("sqlite:///"));
        assert!(relative.ends_with("data/sessions.db"));
    }

    #[test]
    fn blank_db_is_rejected() {
        assert!(matches!(
            normalize_sqlite_url("  "),
            Err(CliError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn user_scope_requires_non_blank_id() {
        assert_eq!(scope_for(None).unwrap(), SessionScope::All);
        assert!(matches!(
            scope_for(Some("coach-1")).unwrap(),
            SessionScope::Submitter(_)
        ));
        assert!(scope_for(Some("   ")).is_err());
    }
}
