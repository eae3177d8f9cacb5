// Peer pools: per-entity totals for every entity in a comparison population.

use fieldstat_core::model::{EntityKind, MatchAppearance};
use fieldstat_core::source::GroupedAppearances;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{aggregate, aggregate_team, AggregateTotals};
use crate::roles::Cluster;

/// One qualifying peer and its totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerPoolRow {
    pub entity_id: i64,
    pub totals: AggregateTotals,
}

fn totals_for(
    kind: EntityKind,
    rows: &[MatchAppearance],
    role_filter: Option<Cluster>,
) -> AggregateTotals {
    match kind {
        EntityKind::Player => aggregate(rows, role_filter),
        EntityKind::Team => aggregate_team(rows),
    }
}

/// Aggregate every group and keep those with at least `min_sample`
/// matches. Rows come back ordered by entity id.
///
/// `role_filter` only applies to players; team rows are never filtered by
/// role.
pub fn build_pool(
    grouped: &GroupedAppearances,
    kind: EntityKind,
    role_filter: Option<Cluster>,
    min_sample: u32,
) -> Vec<PeerPoolRow> {
    let pool: Vec<PeerPoolRow> = grouped
        .iter()
        .map(|(&entity_id, rows)| PeerPoolRow {
            entity_id,
            totals: totals_for(kind, rows, role_filter),
        })
        .filter(|row| row.totals.matches >= min_sample)
        .collect();

    debug!(
        "peer pool: {} of {} entities with >= {} matches",
        pool.len(),
        grouped.len(),
        min_sample
    );
    pool
}

/// A subject and the population it is ranked against.
///
/// Both halves are computed from one grouped query, so the subject's totals
/// always share the pool's match scope and role filter. When the subject
/// meets the sample cutoff it is itself a member of `pool`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub subject: AggregateTotals,
    pub pool: Vec<PeerPoolRow>,
}

impl Comparison {
    pub fn from_grouped(
        grouped: &GroupedAppearances,
        kind: EntityKind,
        subject_id: i64,
        role_filter: Option<Cluster>,
        min_sample: u32,
    ) -> Self {
        let subject = grouped
            .get(&subject_id)
            .map(|rows| totals_for(kind, rows, role_filter))
            .unwrap_or_default();
        Comparison {
            subject,
            pool: build_pool(grouped, kind, role_filter, min_sample),
        }
    }

    pub fn subject_in_pool(&self, subject_id: i64) -> bool {
        self.pool.iter().any(|row| row.entity_id == subject_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(player_id: i64, team_id: i64, matches: i64, role: &str) -> Vec<MatchAppearance> {
        (0..matches)
            .map(|m| MatchAppearance {
                player_id,
                team_id,
                match_id: m + 1,
                role: role.to_string(),
                tackles_won: 1,
                ..Default::default()
            })
            .collect()
    }

    fn grouped() -> GroupedAppearances {
        let mut g = GroupedAppearances::new();
        g.insert(3, rows(3, 10, 31, "CB"));
        g.insert(1, rows(1, 10, 29, "CB"));
        g.insert(2, rows(2, 11, 30, "LCB"));
        g
    }

    #[test]
    fn pool_applies_minimum_sample() {
        let pool = build_pool(&grouped(), EntityKind::Player, Some(Cluster::CenterBack), 30);
        let ids: Vec<i64> = pool.iter().map(|r| r.entity_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(pool[0].totals.matches, 30);
        assert_eq!(pool[1].totals.tackles_won, 31);
    }

    #[test]
    fn pool_is_empty_when_nobody_qualifies() {
        assert!(build_pool(&grouped(), EntityKind::Player, None, 100).is_empty());
        assert!(build_pool(&GroupedAppearances::new(), EntityKind::Team, None, 0).is_empty());
    }

    #[test]
    fn role_filter_is_applied_per_row() {
        let mut g = GroupedAppearances::new();
        let mut mixed = rows(7, 10, 20, "CB");
        mixed.extend(rows(7, 10, 15, "ST").into_iter().map(|mut r| {
            r.match_id += 100;
            r
        }));
        g.insert(7, mixed);

        let cb = build_pool(&g, EntityKind::Player, Some(Cluster::CenterBack), 0);
        assert_eq!(cb[0].totals.matches, 20);
        let all = build_pool(&g, EntityKind::Player, None, 0);
        assert_eq!(all[0].totals.matches, 35);
    }

    #[test]
    fn comparison_subject_comes_from_same_grouping() {
        let cmp = Comparison::from_grouped(
            &grouped(),
            EntityKind::Player,
            3,
            Some(Cluster::CenterBack),
            30,
        );
        assert_eq!(cmp.subject.matches, 31);
        assert!(cmp.subject_in_pool(3));

        let below = Comparison::from_grouped(&grouped(), EntityKind::Player, 1, None, 30);
        assert_eq!(below.subject.matches, 29);
        assert!(!below.subject_in_pool(1));

        let missing = Comparison::from_grouped(&grouped(), EntityKind::Player, 99, None, 30);
        assert_eq!(missing.subject, AggregateTotals::default());
    }
}
