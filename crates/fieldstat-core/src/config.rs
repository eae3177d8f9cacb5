// Configuration loading and parsing (league.toml, metrics.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub sampling: SamplingConfig,
    pub leaderboard: LeaderboardConfig,
    pub db_path: String,
}

impl Config {
    /// Database location. An empty configured path falls back to the
    /// platform data directory (e.g. `~/.local/share/fieldstat/`).
    pub fn resolved_db_path(&self) -> PathBuf {
        if !self.db_path.trim().is_empty() {
            return PathBuf::from(&self.db_path);
        }
        match directories::ProjectDirs::from("org", "fieldstat", "fieldstat") {
            Some(dirs) => dirs.data_dir().join("fieldstat.db"),
            None => PathBuf::from("fieldstat.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Lowest season number whose tournaments count as official.
    pub min_official_season: u32,
    /// Explicit allow-list. When non-empty, tournament names are not parsed.
    #[serde(default)]
    pub official_tournament_ids: Vec<i64>,
}

// ---------------------------------------------------------------------------
// metrics.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire metrics.toml file.
#[derive(Debug, Clone, Deserialize)]
struct MetricsFile {
    sampling: SamplingConfig,
    leaderboard: LeaderboardConfig,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    pub player_min_matches: u32,
    pub team_min_matches: u32,
    pub recent_match_limit: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            player_min_matches: 30,
            team_min_matches: 10,
            recent_match_limit: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardConfig {
    pub size: usize,
    pub min_matches: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: 10,
            min_matches: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/metrics.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join(LEAGUE_FILE);
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    // --- metrics.toml (required) ---
    let metrics_path = config_dir.join(METRICS_FILE);
    let metrics_text = read_file(&metrics_path)?;
    let metrics_file: MetricsFile =
        toml::from_str(&metrics_text).map_err(|e| ConfigError::ParseError {
            path: metrics_path.clone(),
            source: e,
        })?;

    let config = Config {
        league: league_file.league,
        sampling: metrics_file.sampling,
        leaderboard: metrics_file.leaderboard,
        db_path: metrics_file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

const LEAGUE_FILE: &str = "league.toml";
const METRICS_FILE: &str = "metrics.toml";

/// Files `load_config_from` reads from `config/`.
pub const CONFIG_FILES: [&str; 2] = [LEAGUE_FILE, METRICS_FILE];

/// Seed `config/` from `defaults/` for every entry of `CONFIG_FILES` that is
/// missing. Existing files are never overwritten and nothing else in
/// `defaults/` is copied. Returns the paths that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "{} is missing and {} has no default to copy; \
                     run from the project root or restore defaults/",
                    target.display(),
                    source.display()
                ),
            });
        }
        std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create config directory: {e}"),
        })?;
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
        })?;
        info!("Seeded {} from defaults", target.display());
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.name".into(),
            message: "must not be empty".into(),
        });
    }

    if let Some(bad) = config.league.official_tournament_ids.iter().find(|id| **id <= 0) {
        return Err(ConfigError::ValidationError {
            field: "league.official_tournament_ids".into(),
            message: format!("tournament ids must be positive, got {bad}"),
        });
    }

    let s = &config.sampling;
    let sample_fields: &[(&str, usize)] = &[
        ("sampling.player_min_matches", s.player_min_matches as usize),
        ("sampling.team_min_matches", s.team_min_matches as usize),
        ("sampling.recent_match_limit", s.recent_match_limit),
        ("leaderboard.size", config.leaderboard.size),
    ];
    for (name, val) in sample_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
