// Home-page leaderboards over the official scope.
//
// Each board issues its own pool query; the boards run concurrently and a
// failure in one is reported on that board only.

use fieldstat_core::model::{EntityKind, MatchScope, PlayerId};
use fieldstat_core::source::AppearanceSource;
use fieldstat_metrics::aggregate::AggregateTotals;
use fieldstat_metrics::pool::build_pool;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::error::MetricsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardKind {
    Goals,
    Assists,
    GoalContributions,
    CleanSheets,
    DefensiveActions,
}

impl LeaderboardKind {
    pub const ALL: [LeaderboardKind; 5] = [
        LeaderboardKind::Goals,
        LeaderboardKind::Assists,
        LeaderboardKind::GoalContributions,
        LeaderboardKind::CleanSheets,
        LeaderboardKind::DefensiveActions,
    ];

    pub fn value(&self, totals: &AggregateTotals) -> u64 {
        match self {
            LeaderboardKind::Goals => totals.goals,
            LeaderboardKind::Assists => totals.assists,
            LeaderboardKind::GoalContributions => totals.goal_contributions(),
            LeaderboardKind::CleanSheets => u64::from(totals.clean_sheets),
            LeaderboardKind::DefensiveActions => totals.defensive_actions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub matches: u32,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub kind: LeaderboardKind,
    pub ok: bool,
    pub entries: Vec<LeaderboardEntry>,
    pub error: Option<String>,
}

impl Leaderboard {
    fn from_result(kind: LeaderboardKind, result: Result<Vec<LeaderboardEntry>, MetricsError>) -> Self {
        match result {
            Ok(entries) => Leaderboard {
                kind,
                ok: true,
                entries,
                error: None,
            },
            Err(e) => {
                warn!("leaderboard {kind:?} failed: {e}");
                Leaderboard {
                    kind,
                    ok: false,
                    entries: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Top `size` players for one board. Ordered by value descending, then by
/// player id ascending.
pub async fn compute_leaderboard(
    source: &dyn AppearanceSource,
    scope: &MatchScope,
    kind: LeaderboardKind,
    min_matches: u32,
    size: usize,
) -> Result<Vec<LeaderboardEntry>, MetricsError> {
    let grouped = source
        .fetch_pool_appearances(EntityKind::Player, None, scope)
        .await?;
    let mut entries: Vec<LeaderboardEntry> = build_pool(&grouped, EntityKind::Player, None, min_matches)
        .into_iter()
        .map(|row| LeaderboardEntry {
            player_id: row.entity_id,
            matches: row.totals.matches,
            value: kind.value(&row.totals),
        })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.player_id.cmp(&b.player_id)));
    entries.truncate(size);
    Ok(entries)
}

/// Every board, computed concurrently. Always returns one board per kind.
pub async fn compute_leaderboards(
    source: &dyn AppearanceSource,
    scope: &MatchScope,
    min_matches: u32,
    size: usize,
) -> Vec<Leaderboard> {
    let boards = LeaderboardKind::ALL
        .iter()
        .map(|&kind| async move {
            let result = compute_leaderboard(source, scope, kind, min_matches, size).await;
            Leaderboard::from_result(kind, result)
        });
    join_all(boards).await
}

/// Every board failed with the same error, e.g. when the shared scope could
/// not be resolved.
pub fn failed_leaderboards(error: &MetricsError) -> Vec<Leaderboard> {
    LeaderboardKind::ALL
        .iter()
        .map(|&kind| Leaderboard {
            kind,
            ok: false,
            entries: Vec::new(),
            error: Some(error.to_string()),
        })
        .collect()
}
