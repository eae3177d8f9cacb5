// fieldstat: import a match export and print metrics as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fieldstat_app::StatsService;
use fieldstat_core::config::{self, Config};
use fieldstat_core::db::Database;
use fieldstat_core::import;
use fieldstat_core::source::SqliteSource;
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "fieldstat")]
#[command(about = "Virtual-football league stats: player and team metrics, leaderboards")]
#[command(version)]
struct Cli {
    /// Database file; overrides the configured path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import tournaments.csv, matches.csv and appearances.csv from a directory
    Import {
        /// Directory holding the CSV export
        dir: PathBuf,
    },

    /// Radar profile and totals for one player
    Player {
        /// Player id
        id: String,
    },

    /// Radar profile and totals for one team
    Team {
        /// Team id
        id: String,
    },

    /// Home-page leaderboards
    Leaders,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: league={}", config.league.name);

    let db_path = cli.db.clone().unwrap_or_else(|| config.resolved_db_path());
    let db = Arc::new(open_database(&db_path)?);
    info!("Database opened at {}", db_path.display());

    match cli.command {
        Commands::Import { dir } => run_import(&db, &dir),
        Commands::Player { id } => {
            let metrics = service(db, config).player_metrics(&id).await;
            print_json(&metrics, cli.pretty)
        }
        Commands::Team { id } => {
            let metrics = service(db, config).team_metrics(&id).await;
            print_json(&metrics, cli.pretty)
        }
        Commands::Leaders => {
            let svc = service(db, config);
            let board = &svc.config().leaderboard;
            info!(
                "Leaderboards: top {} with at least {} matches",
                board.size, board.min_matches
            );
            let boards = svc.leaderboards().await;
            print_json(&boards, cli.pretty)
        }
    }
}

fn service(db: Arc<Database>, config: Config) -> StatsService {
    StatsService::new(Arc::new(SqliteSource::new(db)), config)
}

fn open_database(path: &Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path_str = path
        .to_str()
        .with_context(|| format!("database path is not valid UTF-8: {}", path.display()))?;
    Database::open(path_str).context("failed to open database")
}

fn run_import(db: &Database, dir: &Path) -> anyhow::Result<()> {
    let export = import::load_export(dir)
        .with_context(|| format!("failed to load export from {}", dir.display()))?;
    db.import(&export.tournaments, &export.matches, &export.appearances)
        .context("failed to import export")?;
    info!(
        "Imported {} tournaments, {} matches, {} appearances",
        export.tournaments.len(),
        export.matches.len(),
        export.appearances.len()
    );
    println!(
        "imported {} tournaments, {} matches, {} appearances",
        export.tournaments.len(),
        export.matches.len(),
        export.appearances.len()
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

/// Log to `logs/fieldstat.log`; stdout carries only command output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("fieldstat.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fieldstat=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
