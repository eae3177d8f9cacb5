// Team metrics: official scope, league placement, same-league peer pool.

use fieldstat_core::config::Config;
use fieldstat_core::model::{EntityKind, EntityRef, MatchScope, TeamId};
use fieldstat_core::source::AppearanceSource;
use fieldstat_metrics::aggregate::{AggregateTotals, DerivedRates};
use fieldstat_metrics::eligibility::EligibilityPolicy;
use fieldstat_metrics::league::{league_label, resolve_team_league, tournaments_with_label, LeagueLabel};
use fieldstat_metrics::pool::Comparison;
use fieldstat_metrics::radar::{build_team_radar, RadarAxis};
use fieldstat_metrics::readiness;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Halt;
use crate::scope::official_scope;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamMetrics {
    pub ready: bool,
    pub entity_id: Option<TeamId>,
    pub league: Option<LeagueLabel>,
    pub matches_in_scope: u32,
    pub tournaments_used: Vec<String>,
    pub pool_size: usize,
    pub totals: Option<AggregateTotals>,
    pub rates: Option<DerivedRates>,
    pub radar: Vec<RadarAxis>,
    pub reason: Option<String>,
}

impl TeamMetrics {
    pub fn not_ready(entity_id: Option<TeamId>, reason: impl Into<String>) -> Self {
        TeamMetrics {
            entity_id,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Compute a team's metrics against teams of the same league.
///
/// The league scope is every official tournament carrying the team's league
/// label, so the pool holds each team's record in that tier. A stop after
/// league placement keeps the league on the result.
pub async fn compute_team_metrics(
    source: &dyn AppearanceSource,
    config: &Config,
    team_id: TeamId,
) -> TeamMetrics {
    let mut out = TeamMetrics {
        entity_id: Some(team_id),
        ..Default::default()
    };
    if let Err(halt) = evaluate(source, config, team_id, &mut out).await {
        if let Halt::Failed(e) = &halt {
            warn!("team {team_id}: {e}");
        }
        out.ready = false;
        out.reason = Some(halt.reason());
    }
    out
}

async fn evaluate(
    source: &dyn AppearanceSource,
    config: &Config,
    team_id: TeamId,
    out: &mut TeamMetrics,
) -> Result<(), Halt> {
    let policy = EligibilityPolicy::from_config(&config.league);
    let scope = official_scope(source, &policy).await?;
    let played = source.fetch_tournaments(EntityRef::Team(team_id)).await?;
    let used = scope.eligible.intersect(&played);
    readiness::require_tournaments(&used)?;

    let league = readiness::require_league(resolve_team_league(&used.tournaments))?;
    out.league = Some(league);
    out.tournaments_used = used
        .tournaments
        .iter()
        .filter(|t| league_label(&t.name) == league)
        .map(|t| t.name.clone())
        .collect();

    let league_ids = tournaments_with_label(&scope.eligible, league);
    let league_scope = MatchScope::Matches(source.fetch_match_ids(&league_ids).await?);
    let grouped = source
        .fetch_pool_appearances(EntityKind::Team, None, &league_scope)
        .await?;
    let comparison = Comparison::from_grouped(
        &grouped,
        EntityKind::Team,
        team_id,
        None,
        config.sampling.team_min_matches,
    );
    out.matches_in_scope = comparison.subject.matches;
    readiness::require_sample(&comparison.subject, config.sampling.team_min_matches)?;

    debug!(
        "team {team_id}: {league} over {} matches, pool of {} (subject pooled: {})",
        comparison.subject.matches,
        comparison.pool.len(),
        comparison.subject_in_pool(team_id)
    );
    out.radar = build_team_radar(&comparison.subject, &comparison.pool);
    out.pool_size = comparison.pool.len();
    out.rates = Some(comparison.subject.rates());
    out.totals = Some(comparison.subject);
    out.ready = true;
    Ok(())
}
