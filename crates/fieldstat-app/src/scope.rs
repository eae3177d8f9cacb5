// The league-wide official scope shared by players, teams and leaderboards.

use fieldstat_core::model::MatchScope;
use fieldstat_core::source::AppearanceSource;
use fieldstat_metrics::eligibility::{resolve, EligibilityPolicy, EligibleTournaments};
use tracing::debug;

use crate::error::MetricsError;

/// Official tournaments and the matches they contain.
#[derive(Debug, Clone)]
pub struct OfficialScope {
    pub eligible: EligibleTournaments,
    pub matches: MatchScope,
}

/// Resolve every official tournament and collect its match ids.
///
/// With no official tournament the match scope is an empty explicit set,
/// which matches nothing.
pub async fn official_scope(
    source: &dyn AppearanceSource,
    policy: &EligibilityPolicy,
) -> Result<OfficialScope, MetricsError> {
    let all = source.fetch_all_tournaments().await?;
    let eligible = resolve(policy, &all);
    let matches = if eligible.is_empty() {
        MatchScope::Matches(Default::default())
    } else {
        MatchScope::Matches(source.fetch_match_ids(&eligible.ids()).await?)
    };
    debug!(
        "official scope: {} of {} tournaments, {:?} matches: {:?}",
        eligible.tournaments.len(),
        all.len(),
        matches.len(),
        eligible.names()
    );
    Ok(OfficialScope { eligible, matches })
}
