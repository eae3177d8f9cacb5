// Official-tournament eligibility.
//
// A tournament counts toward official stats when its name carries a season
// number at or above the configured threshold. The number must follow a
// season keyword; any other digit run in the name (a year, a cup edition)
// is ignored. Callers that have already decided which tournaments count can
// pass an explicit id list instead and skip name parsing entirely.

use std::collections::BTreeSet;

use fieldstat_core::config::LeagueConfig;
use fieldstat_core::model::{TournamentId, TournamentSummary};
use once_cell::sync::Lazy;
use regex::Regex;

/// Season keyword in the spellings used across the league's tournament
/// names, followed by an optional separator and the season number.
static SEASON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:season|sezon|saison|temporada|stagione)\s*[#:.\-]?\s*(\d+)")
        .expect("season pattern is a valid regex")
});

/// Extract the season number anchored to the first season keyword.
pub fn season_number(name: &str) -> Option<u32> {
    SEASON_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether a tournament name denotes an official season at or above
/// `min_season`. Names without a season keyword are never official.
pub fn is_official(name: &str, min_season: u32) -> bool {
    season_number(name).is_some_and(|season| season >= min_season)
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How tournaments are admitted into the official scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibilityPolicy {
    /// Parse the season number from the name and compare to a threshold.
    SeasonThreshold { min_season: u32 },
    /// Pre-resolved allow-list; names are not inspected.
    Explicit(BTreeSet<TournamentId>),
}

impl EligibilityPolicy {
    /// Explicit ids win when configured; otherwise the season threshold applies.
    pub fn from_config(league: &LeagueConfig) -> Self {
        if league.official_tournament_ids.is_empty() {
            EligibilityPolicy::SeasonThreshold {
                min_season: league.min_official_season,
            }
        } else {
            EligibilityPolicy::Explicit(league.official_tournament_ids.iter().copied().collect())
        }
    }

    pub fn admits(&self, tournament: &TournamentSummary) -> bool {
        match self {
            EligibilityPolicy::SeasonThreshold { min_season } => {
                is_official(&tournament.name, *min_season)
            }
            EligibilityPolicy::Explicit(ids) => ids.contains(&tournament.id),
        }
    }
}

/// The tournaments admitted by a policy, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleTournaments {
    pub tournaments: Vec<TournamentSummary>,
}

impl EligibleTournaments {
    pub fn is_empty(&self) -> bool {
        self.tournaments.is_empty()
    }

    pub fn ids(&self) -> Vec<TournamentId> {
        self.tournaments.iter().map(|t| t.id).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tournaments.iter().map(|t| t.name.clone()).collect()
    }

    pub fn contains(&self, id: TournamentId) -> bool {
        self.tournaments.iter().any(|t| t.id == id)
    }

    /// Keep only tournaments that are also in `other`.
    pub fn intersect(&self, other: &[TournamentSummary]) -> EligibleTournaments {
        EligibleTournaments {
            tournaments: other
                .iter()
                .filter(|t| self.contains(t.id))
                .cloned()
                .collect(),
        }
    }
}

/// Apply `policy` to a tournament list.
pub fn resolve(policy: &EligibilityPolicy, tournaments: &[TournamentSummary]) -> EligibleTournaments {
    EligibleTournaments {
        tournaments: tournaments
            .iter()
            .filter(|t| policy.admits(t))
            .cloned()
            .collect(),
    }
}
