// League labels derived from tournament names, and a team's current league.

use fieldstat_core::model::{TournamentId, TournamentSummary};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::eligibility::{season_number, EligibleTournaments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeagueLabel {
    SuperLeague,
    FirstLeague,
    SecondLeague,
    Cup,
    Other,
}

impl LeagueLabel {
    /// Only league tiers place a team; cups and unlabelled tournaments don't.
    pub fn is_league(&self) -> bool {
        matches!(
            self,
            LeagueLabel::SuperLeague | LeagueLabel::FirstLeague | LeagueLabel::SecondLeague
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeagueLabel::SuperLeague => "Super League",
            LeagueLabel::FirstLeague => "First League",
            LeagueLabel::SecondLeague => "Second League",
            LeagueLabel::Cup => "Cup",
            LeagueLabel::Other => "Other",
        }
    }
}

impl fmt::Display for LeagueLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static CUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:cup|kupa\w*)\b").expect("cup pattern is a valid regex"));
static SUPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bs[uü]per\b").expect("super pattern is a valid regex"));
static FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:first|1st)\b|\b1\.\s*lig").expect("first pattern is a valid regex")
});
static SECOND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:second|2nd)\b|\b2\.\s*lig").expect("second pattern is a valid regex")
});

/// Label a tournament by name. Cups are checked first, so "Super Cup" is a
/// cup rather than a league.
pub fn league_label(name: &str) -> LeagueLabel {
    if CUP_RE.is_match(name) {
        LeagueLabel::Cup
    } else if SUPER_RE.is_match(name) {
        LeagueLabel::SuperLeague
    } else if FIRST_RE.is_match(name) {
        LeagueLabel::FirstLeague
    } else if SECOND_RE.is_match(name) {
        LeagueLabel::SecondLeague
    } else {
        LeagueLabel::Other
    }
}

/// The league a team currently plays in: the label of its league tournament
/// with the highest season number, ties broken by match count. `None` when
/// none of `official` is a league tournament.
pub fn resolve_team_league(official: &[TournamentSummary]) -> Option<LeagueLabel> {
    official
        .iter()
        .filter_map(|t| {
            let label = league_label(&t.name);
            label
                .is_league()
                .then(|| (season_number(&t.name).unwrap_or(0), t.match_count, label))
        })
        .max_by_key(|&(season, matches, _)| (season, matches))
        .map(|(_, _, label)| label)
}

/// Ids of the official tournaments carrying `label`.
pub fn tournaments_with_label(eligible: &EligibleTournaments, label: LeagueLabel) -> Vec<TournamentId> {
    eligible
        .tournaments
        .iter()
        .filter(|t| league_label(&t.name) == label)
        .map(|t| t.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: i64, name: &str, match_count: u32) -> TournamentSummary {
        TournamentSummary {
            id,
            name: name.to_string(),
            match_count,
        }
    }

    #[test]
    fn labels_from_names() {
        assert_eq!(league_label("Season 20 Super League"), LeagueLabel::SuperLeague);
        assert_eq!(league_label("Sezon 21 Süper Lig"), LeagueLabel::SuperLeague);
        assert_eq!(league_label("Season 20 First League"), LeagueLabel::FirstLeague);
        assert_eq!(league_label("Sezon 21 1. Lig"), LeagueLabel::FirstLeague);
        assert_eq!(league_label("Season 22 2nd Division"), LeagueLabel::SecondLeague);
        assert_eq!(league_label("Sezon 19 2.Lig"), LeagueLabel::SecondLeague);
        assert_eq!(league_label("Season 24 Cup"), LeagueLabel::Cup);
        assert_eq!(league_label("Season 24 Super Cup"), LeagueLabel::Cup);
        assert_eq!(league_label("Sezon 24 Türkiye Kupası"), LeagueLabel::Cup);
        assert_eq!(league_label("Season 24 Friendly"), LeagueLabel::Other);
    }

    #[test]
    fn season_digits_do_not_leak_into_tier() {
        assert_eq!(league_label("Season 21 Friendly"), LeagueLabel::Other);
        assert_eq!(league_label("Season 12 Second League"), LeagueLabel::SecondLeague);
    }

    #[test]
    fn latest_league_season_wins() {
        let list = vec![
            t(1, "Season 20 Second League", 30),
            t(2, "Season 21 First League", 10),
            t(3, "Season 22 Cup", 40),
        ];
        assert_eq!(resolve_team_league(&list), Some(LeagueLabel::FirstLeague));
    }

    #[test]
    fn same_season_tie_goes_to_more_matches() {
        let list = vec![
            t(1, "Season 21 Super League", 5),
            t(2, "Season 21 First League", 25),
        ];
        assert_eq!(resolve_team_league(&list), Some(LeagueLabel::FirstLeague));
    }

    #[test]
    fn cups_only_leave_league_unresolved() {
        let list = vec![t(1, "Season 21 Cup", 5), t(2, "Season 21 Friendly", 5)];
        assert_eq!(resolve_team_league(&list), None);
        assert_eq!(resolve_team_league(&[]), None);
    }

    #[test]
    fn tournaments_with_label_filters_official_scope() {
        let eligible = EligibleTournaments {
            tournaments: vec![
                t(1, "Season 20 Super League", 30),
                t(2, "Season 20 First League", 30),
                t(3, "Season 21 Super League", 30),
            ],
        };
        assert_eq!(tournaments_with_label(&eligible, LeagueLabel::SuperLeague), vec![1, 3]);
        assert!(tournaments_with_label(&eligible, LeagueLabel::Cup).is_empty());
    }
}
