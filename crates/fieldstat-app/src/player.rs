// Player metrics: role resolution, official scope, cluster peer pool, radar.

use std::collections::BTreeSet;

use fieldstat_core::config::Config;
use fieldstat_core::model::{EntityKind, EntityRef, PlayerId, TournamentId};
use fieldstat_core::source::AppearanceSource;
use fieldstat_metrics::aggregate::{AggregateTotals, DerivedRates};
use fieldstat_metrics::eligibility::EligibilityPolicy;
use fieldstat_metrics::pool::Comparison;
use fieldstat_metrics::radar::{build_radar, RadarAxis};
use fieldstat_metrics::readiness;
use fieldstat_metrics::roles::{resolve_current_role, Cluster};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Halt;
use crate::scope::official_scope;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerMetrics {
    pub ready: bool,
    pub entity_id: Option<PlayerId>,
    pub current_role: Option<String>,
    pub cluster: Option<Cluster>,
    pub matches_in_scope: u32,
    pub tournaments_used: Vec<String>,
    pub pool_size: usize,
    pub totals: Option<AggregateTotals>,
    pub rates: Option<DerivedRates>,
    pub radar: Vec<RadarAxis>,
    pub reason: Option<String>,
}

impl PlayerMetrics {
    /// A result that stopped at a readiness gate or failed outright.
    pub fn not_ready(entity_id: Option<PlayerId>, reason: impl Into<String>) -> Self {
        PlayerMetrics {
            entity_id,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Compute a player's metrics. Never fails: gates and source errors both
/// end in `ready = false`, keeping whatever was resolved before the stop
/// (role, cluster).
pub async fn compute_player_metrics(
    source: &dyn AppearanceSource,
    config: &Config,
    player_id: PlayerId,
) -> PlayerMetrics {
    let mut out = PlayerMetrics {
        entity_id: Some(player_id),
        ..Default::default()
    };
    if let Err(halt) = evaluate(source, config, player_id, &mut out).await {
        if let Halt::Failed(e) = &halt {
            warn!("player {player_id}: {e}");
        }
        out.ready = false;
        out.reason = Some(halt.reason());
    }
    out
}

async fn evaluate(
    source: &dyn AppearanceSource,
    config: &Config,
    player_id: PlayerId,
    out: &mut PlayerMetrics,
) -> Result<(), Halt> {
    // Role -> cluster.
    let recent = source
        .fetch_recent_roles(player_id, config.sampling.recent_match_limit)
        .await?;
    let resolved = resolve_current_role(&recent);
    out.current_role = resolved.role.clone();
    out.cluster = resolved.cluster;
    let (_, cluster) = readiness::player_classification(&resolved)?;

    // Official tournaments the player took part in.
    let policy = EligibilityPolicy::from_config(&config.league);
    let scope = official_scope(source, &policy).await?;
    let played = source.fetch_tournaments(EntityRef::Player(player_id)).await?;
    let used = scope.eligible.intersect(&played);
    readiness::require_tournaments(&used)?;

    // Subject and pool from one grouped query over the same scope and roles.
    let grouped = source
        .fetch_pool_appearances(EntityKind::Player, Some(cluster.roles()), &scope.matches)
        .await?;

    // Only tournaments where the player has rows in the cluster contribute
    // to the sample.
    let in_role: BTreeSet<TournamentId> = grouped
        .get(&player_id)
        .into_iter()
        .flatten()
        .filter(|row| cluster.includes(&row.role))
        .map(|row| row.tournament_id)
        .collect();
    out.tournaments_used = used
        .tournaments
        .iter()
        .filter(|t| in_role.contains(&t.id))
        .map(|t| t.name.clone())
        .collect();

    let comparison = Comparison::from_grouped(
        &grouped,
        EntityKind::Player,
        player_id,
        Some(cluster),
        config.sampling.player_min_matches,
    );
    out.matches_in_scope = comparison.subject.matches;
    readiness::require_sample(&comparison.subject, config.sampling.player_min_matches)?;

    debug!(
        "player {player_id}: {cluster} over {} matches, pool of {} (subject pooled: {})",
        comparison.subject.matches,
        comparison.pool.len(),
        comparison.subject_in_pool(player_id)
    );
    out.radar = build_radar(cluster, &comparison.subject, &comparison.pool);
    out.pool_size = comparison.pool.len();
    out.rates = Some(comparison.subject.rates());
    out.totals = Some(comparison.subject);
    out.ready = true;
    Ok(())
}
