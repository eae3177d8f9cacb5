// CSV import of match-event exports.
//
// Three files make up an export: tournaments (id, name), matches
// (id, tournament_id, played_at) and appearances (one row per player per
// match with the full counter set). Malformed rows are skipped with a
// warning rather than aborting the whole import.

use crate::db::MatchRecord;
use crate::model::{MatchAppearance, TournamentSummary};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

/// A full export ready to hand to `Database::import`.
#[derive(Debug, Clone, Default)]
pub struct Export {
    pub tournaments: Vec<TournamentSummary>,
    pub matches: Vec<MatchRecord>,
    pub appearances: Vec<MatchAppearance>,
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTournament {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    id: i64,
    tournament_id: i64,
    played_at: String,
}

/// Appearance row. Missing counter columns default to zero so partial
/// exports (e.g. outfield-only sheets without `saves`) still load.
#[derive(Debug, Deserialize)]
struct RawAppearance {
    player_id: i64,
    team_id: i64,
    match_id: i64,
    role: String,
    #[serde(default)]
    goals: u32,
    #[serde(default)]
    assists: u32,
    #[serde(default)]
    xg: f64,
    #[serde(default, alias = "shots_in")]
    shots_on_target: u32,
    #[serde(default, alias = "shots_out")]
    shots_off_target: u32,
    #[serde(default)]
    passes_attempted: u32,
    #[serde(default)]
    passes_completed: u32,
    #[serde(default)]
    key_passes: u32,
    #[serde(default)]
    dribbles_attempted: u32,
    #[serde(default)]
    dribbles_completed: u32,
    #[serde(default)]
    interceptions: u32,
    #[serde(default)]
    tackles_attempted: u32,
    #[serde(default)]
    tackles_won: u32,
    #[serde(default)]
    blocks: u32,
    #[serde(default)]
    clearances: u32,
    #[serde(default)]
    aerials_attempted: u32,
    #[serde(default)]
    aerials_won: u32,
    #[serde(default)]
    offensive_duels_won: u32,
    #[serde(default)]
    offensive_duels_lost: u32,
    #[serde(default)]
    crosses_attempted: u32,
    #[serde(default)]
    crosses_completed: u32,
    #[serde(default)]
    dribbled_past: u32,
    #[serde(default)]
    saves: u32,
    #[serde(default)]
    goals_conceded: u32,
    #[serde(default)]
    clean_sheet: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accepts RFC 3339 timestamps or `YYYY-MM-DD HH:MM:SS` (read as UTC).
fn parse_played_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

/// Drop matches whose tournament is not in the export, then appearances
/// whose match is not. The database enforces both references, so one
/// orphan would otherwise roll back the whole import.
pub fn drop_orphans(export: Export) -> Export {
    let Export {
        tournaments,
        mut matches,
        mut appearances,
    } = export;

    let tournament_ids: BTreeSet<i64> = tournaments.iter().map(|t| t.id).collect();
    matches.retain(|m| {
        let known = tournament_ids.contains(&m.tournament_id);
        if !known {
            warn!("skipping match {}: unknown tournament {}", m.id, m.tournament_id);
        }
        known
    });

    let match_ids: BTreeSet<i64> = matches.iter().map(|m| m.id).collect();
    appearances.retain(|a| {
        let known = match_ids.contains(&a.match_id);
        if !known {
            warn!(
                "skipping appearance (player {}, match {}): match not in export",
                a.player_id, a.match_id
            );
        }
        known
    });

    Export {
        tournaments,
        matches,
        appearances,
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (enable testing without temp files)
// ---------------------------------------------------------------------------

pub fn load_tournaments_from_reader<R: Read>(rdr: R) -> Result<Vec<TournamentSummary>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawTournament>() {
        match result {
            Ok(raw) => out.push(TournamentSummary {
                id: raw.id,
                name: raw.name.trim().to_string(),
                match_count: 0,
            }),
            Err(e) => warn!("skipping malformed tournament row: {}", e),
        }
    }
    Ok(out)
}

pub fn load_matches_from_reader<R: Read>(rdr: R) -> Result<Vec<MatchRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawMatch>() {
        match result {
            Ok(raw) => {
                let Some(played_at) = parse_played_at(&raw.played_at) else {
                    warn!("skipping match {}: unparseable played_at '{}'", raw.id, raw.played_at);
                    continue;
                };
                out.push(MatchRecord {
                    id: raw.id,
                    tournament_id: raw.tournament_id,
                    played_at,
                });
            }
            Err(e) => warn!("skipping malformed match row: {}", e),
        }
    }
    Ok(out)
}

pub fn load_appearances_from_reader<R: Read>(rdr: R) -> Result<Vec<MatchAppearance>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawAppearance>() {
        match result {
            Ok(raw) => {
                if !raw.xg.is_finite() || raw.xg < 0.0 {
                    warn!(
                        "skipping appearance (player {}, match {}): invalid xg {}",
                        raw.player_id, raw.match_id, raw.xg
                    );
                    continue;
                }
                if raw.role.trim().is_empty() {
                    warn!(
                        "skipping appearance (player {}, match {}): empty role",
                        raw.player_id, raw.match_id
                    );
                    continue;
                }
                out.push(MatchAppearance {
                    player_id: raw.player_id,
                    team_id: raw.team_id,
                    match_id: raw.match_id,
                    tournament_id: 0,
                    played_at: DateTime::<Utc>::default(),
                    role: raw.role.trim().to_uppercase(),
                    goals: raw.goals,
                    assists: raw.assists,
                    xg: raw.xg,
                    shots_on_target: raw.shots_on_target,
                    shots_off_target: raw.shots_off_target,
                    passes_attempted: raw.passes_attempted,
                    passes_completed: raw.passes_completed,
                    key_passes: raw.key_passes,
                    dribbles_attempted: raw.dribbles_attempted,
                    dribbles_completed: raw.dribbles_completed,
                    interceptions: raw.interceptions,
                    tackles_attempted: raw.tackles_attempted,
                    tackles_won: raw.tackles_won,
                    blocks: raw.blocks,
                    clearances: raw.clearances,
                    aerials_attempted: raw.aerials_attempted,
                    aerials_won: raw.aerials_won,
                    offensive_duels_won: raw.offensive_duels_won,
                    offensive_duels_lost: raw.offensive_duels_lost,
                    crosses_attempted: raw.crosses_attempted,
                    crosses_completed: raw.crosses_completed,
                    dribbled_past: raw.dribbled_past,
                    saves: raw.saves,
                    goals_conceded: raw.goals_conceded,
                    clean_sheet: parse_flag(&raw.clean_sheet),
                });
            }
            Err(e) => warn!("skipping malformed appearance row: {}", e),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, ImportError> {
    std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> ImportError + '_ {
    move |e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load an export from `dir/tournaments.csv`, `dir/matches.csv` and
/// `dir/appearances.csv`.
pub fn load_export(dir: &Path) -> Result<Export, ImportError> {
    let t_path = dir.join("tournaments.csv");
    let m_path = dir.join("matches.csv");
    let a_path = dir.join("appearances.csv");

    let tournaments = load_tournaments_from_reader(open(&t_path)?).map_err(csv_err(&t_path))?;
    let matches = load_matches_from_reader(open(&m_path)?).map_err(csv_err(&m_path))?;
    let appearances = load_appearances_from_reader(open(&a_path)?).map_err(csv_err(&a_path))?;

    let export = drop_orphans(Export {
        tournaments,
        matches,
        appearances,
    });
    if export.appearances.is_empty() {
        return Err(ImportError::Validation(
            "appearance CSV produced zero valid rows".into(),
        ));
    }
    Ok(export)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
