// Readiness gates.
//
// Player gates run: role -> cluster -> eligible tournaments -> sample size.
// Team gates run: eligible tournaments -> league -> sample size.
// The first failing gate ends the computation; its reason is reported as is.

use serde::Serialize;
use std::fmt;

use crate::aggregate::AggregateTotals;
use crate::eligibility::EligibleTournaments;
use crate::league::LeagueLabel;
use crate::roles::{Cluster, ResolvedRole};

/// Why a metrics result is not ready. Not an error: these are terminal
/// states of a well-formed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReady {
    RoleUnresolved,
    ClusterUnresolved,
    NoEligibleTournaments,
    LeagueUnresolved,
    InsufficientSample,
}

impl NotReady {
    pub fn reason(&self) -> &'static str {
        match self {
            NotReady::RoleUnresolved => "role_unresolved",
            NotReady::ClusterUnresolved => "cluster_unresolved",
            NotReady::NoEligibleTournaments => "no_eligible_tournaments",
            NotReady::LeagueUnresolved => "league_unresolved",
            NotReady::InsufficientSample => "insufficient_sample",
        }
    }
}

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

pub type Gate<T> = Result<T, NotReady>;

pub fn require_role(resolved: &ResolvedRole) -> Gate<&str> {
    resolved.role.as_deref().ok_or(NotReady::RoleUnresolved)
}

pub fn require_cluster(resolved: &ResolvedRole) -> Gate<Cluster> {
    resolved.cluster.ok_or(NotReady::ClusterUnresolved)
}

pub fn require_tournaments(eligible: &EligibleTournaments) -> Gate<()> {
    if eligible.is_empty() {
        Err(NotReady::NoEligibleTournaments)
    } else {
        Ok(())
    }
}

pub fn require_league(league: Option<LeagueLabel>) -> Gate<LeagueLabel> {
    league.ok_or(NotReady::LeagueUnresolved)
}

pub fn require_sample(totals: &AggregateTotals, min_matches: u32) -> Gate<()> {
    if totals.matches >= min_matches {
        Ok(())
    } else {
        Err(NotReady::InsufficientSample)
    }
}

/// Run the first two player gates in order.
pub fn player_classification(resolved: &ResolvedRole) -> Gate<(String, Cluster)> {
    let role = require_role(resolved)?.to_string();
    let cluster = require_cluster(resolved)?;
    Ok((role, cluster))
}
