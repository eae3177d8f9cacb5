// Entry point for presentation layers: always returns a well-formed result.

use std::sync::Arc;

use fieldstat_core::config::Config;
use fieldstat_core::source::AppearanceSource;
use fieldstat_metrics::eligibility::EligibilityPolicy;
use tracing::{info, warn};

use crate::error::parse_entity_id;
use crate::leaderboard::{compute_leaderboards, failed_leaderboards, Leaderboard};
use crate::player::{compute_player_metrics, PlayerMetrics};
use crate::scope::official_scope;
use crate::team::{compute_team_metrics, TeamMetrics};

/// Metrics service bound to one data source and one configuration.
///
/// Cheap to clone; clones share the source.
#[derive(Clone)]
pub struct StatsService {
    source: Arc<dyn AppearanceSource>,
    config: Config,
}

impl StatsService {
    pub fn new(source: Arc<dyn AppearanceSource>, config: Config) -> Self {
        StatsService { source, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Player metrics for a caller-supplied id. Invalid ids are rejected
    /// before any query; source failures become a not-ready result.
    pub async fn player_metrics(&self, raw_id: &str) -> PlayerMetrics {
        let player_id = match parse_entity_id(raw_id) {
            Ok(id) => id,
            Err(e) => return PlayerMetrics::not_ready(None, e.to_string()),
        };
        let metrics = compute_player_metrics(self.source.as_ref(), &self.config, player_id).await;
        info!(
            "player {player_id}: ready={} reason={:?}",
            metrics.ready, metrics.reason
        );
        metrics
    }

    pub async fn team_metrics(&self, raw_id: &str) -> TeamMetrics {
        let team_id = match parse_entity_id(raw_id) {
            Ok(id) => id,
            Err(e) => return TeamMetrics::not_ready(None, e.to_string()),
        };
        let metrics = compute_team_metrics(self.source.as_ref(), &self.config, team_id).await;
        info!(
            "team {team_id}: ready={} reason={:?}",
            metrics.ready, metrics.reason
        );
        metrics
    }

    /// All home-page boards. Each board carries its own `ok` flag.
    pub async fn leaderboards(&self) -> Vec<Leaderboard> {
        let policy = EligibilityPolicy::from_config(&self.config.league);
        let scope = match official_scope(self.source.as_ref(), &policy).await {
            Ok(scope) => scope,
            Err(e) => {
                warn!("leaderboards: {e}");
                return failed_leaderboards(&e);
            }
        };
        compute_leaderboards(
            self.source.as_ref(),
            &scope.matches,
            self.config.leaderboard.min_matches,
            self.config.leaderboard.size,
        )
        .await
    }
}
