// Match-event data model shared by the store, the metrics engine, and the
// service layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub type PlayerId = i64;
pub type TeamId = i64;
pub type MatchId = i64;
pub type TournamentId = i64;

// ---------------------------------------------------------------------------
// Appearances
// ---------------------------------------------------------------------------

/// One player's event counters for one match.
///
/// Rows are written once by ingestion and never mutated afterwards. All
/// counters are non-negative; `xg` is the only real-valued one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAppearance {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub match_id: MatchId,
    pub tournament_id: TournamentId,
    pub played_at: DateTime<Utc>,
    /// Tactical position code as recorded for this match (e.g. "CB", "ST").
    pub role: String,

    pub goals: u32,
    pub assists: u32,
    pub xg: f64,
    pub shots_on_target: u32,
    pub shots_off_target: u32,
    pub passes_attempted: u32,
    pub passes_completed: u32,
    pub key_passes: u32,
    pub dribbles_attempted: u32,
    pub dribbles_completed: u32,
    pub interceptions: u32,
    pub tackles_attempted: u32,
    pub tackles_won: u32,
    pub blocks: u32,
    pub clearances: u32,
    pub aerials_attempted: u32,
    pub aerials_won: u32,
    pub offensive_duels_won: u32,
    pub offensive_duels_lost: u32,
    pub crosses_attempted: u32,
    pub crosses_completed: u32,
    /// Times the player was beaten by an opponent's dribble.
    pub dribbled_past: u32,
    pub saves: u32,
    pub goals_conceded: u32,
    pub clean_sheet: bool,
}

// ---------------------------------------------------------------------------
// Tournaments
// ---------------------------------------------------------------------------

/// A tournament as seen from one entity (or globally): its display name and
/// how many matches are recorded in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSummary {
    pub id: TournamentId,
    pub name: String,
    pub match_count: u32,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Whether rows are grouped per player or per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Team,
}

/// The subject of a metrics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Player(PlayerId),
    Team(TeamId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Player(_) => EntityKind::Player,
            EntityRef::Team(_) => EntityKind::Team,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            EntityRef::Player(id) | EntityRef::Team(id) => *id,
        }
    }

    /// The id this appearance contributes to when grouped by `kind`.
    pub fn key_of(kind: EntityKind, row: &MatchAppearance) -> i64 {
        match kind {
            EntityKind::Player => row.player_id,
            EntityKind::Team => row.team_id,
        }
    }

    /// Whether `row` belongs to this entity.
    pub fn owns(&self, row: &MatchAppearance) -> bool {
        Self::key_of(self.kind(), row) == self.id()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Player(id) => write!(f, "player {id}"),
            EntityRef::Team(id) => write!(f, "team {id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Match scope
// ---------------------------------------------------------------------------

/// The set of matches a query is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchScope {
    /// No restriction.
    #[default]
    All,
    /// Only the listed matches. An empty set matches nothing.
    Matches(BTreeSet<MatchId>),
}

impl MatchScope {
    pub fn contains(&self, match_id: MatchId) -> bool {
        match self {
            MatchScope::All => true,
            MatchScope::Matches(ids) => ids.contains(&match_id),
        }
    }

    /// Number of matches in an explicit scope; `None` for `All`.
    pub fn len(&self) -> Option<usize> {
        match self {
            MatchScope::All => None,
            MatchScope::Matches(ids) => Some(ids.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MatchScope::Matches(ids) if ids.is_empty())
    }
}

impl FromIterator<MatchId> for MatchScope {
    fn from_iter<I: IntoIterator<Item = MatchId>>(iter: I) -> Self {
        MatchScope::Matches(iter.into_iter().collect())
    }
}
