// Radar profiles: per-cluster axis templates and the builder that scores
// a subject's totals against a peer pool.

use serde::Serialize;

use crate::aggregate::AggregateTotals;
use crate::percentile::rank_opt;
use crate::pool::PeerPoolRow;
use crate::roles::Cluster;

/// Formula evaluated over one set of totals.
pub type AxisFormula = fn(&AggregateTotals) -> Option<f64>;

/// A radar axis definition.
#[derive(Clone, Copy)]
pub struct AxisDef {
    pub key: &'static str,
    pub label: &'static str,
    /// Lower raw values are better.
    pub inverted: bool,
    pub formula: AxisFormula,
}

impl std::fmt::Debug for AxisDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisDef")
            .field("key", &self.key)
            .field("inverted", &self.inverted)
            .finish()
    }
}

/// One scored axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarAxis {
    pub key: &'static str,
    pub label: &'static str,
    /// `None` when the formula is undefined for the subject.
    pub value: Option<f64>,
    pub percentile: u8,
    pub inverted: bool,
}

// ---------------------------------------------------------------------------
// Axis definitions
// ---------------------------------------------------------------------------

const fn axis(key: &'static str, label: &'static str, formula: AxisFormula) -> AxisDef {
    AxisDef {
        key,
        label,
        inverted: false,
        formula,
    }
}

const fn inverted(key: &'static str, label: &'static str, formula: AxisFormula) -> AxisDef {
    AxisDef {
        key,
        label,
        inverted: true,
        formula,
    }
}

const GOAL_CONTRIBUTIONS: AxisDef = axis(
    "goal_contributions_per_match",
    "Goals + Assists / Match",
    AggregateTotals::goal_contributions_per_match,
);
const GOALS: AxisDef = axis("goals_per_match", "Goals / Match", AggregateTotals::goals_per_match);
const ASSISTS: AxisDef = axis(
    "assists_per_match",
    "Assists / Match",
    AggregateTotals::assists_per_match,
);
const XG_DELTA: AxisDef = axis(
    "xg_delta_per_match",
    "Goals - xG / Match",
    AggregateTotals::xg_delta_per_match,
);
const SHOTS: AxisDef = axis("shots_per_match", "Shots / Match", AggregateTotals::shots_per_match);
const SHOT_ACCURACY: AxisDef = axis("shot_accuracy", "Shot Accuracy", AggregateTotals::shot_accuracy);
const DRIBBLE_SUCCESS: AxisDef = axis(
    "dribble_success",
    "Dribble Success",
    AggregateTotals::dribble_success,
);
const OFFENSIVE_DUELS: AxisDef = axis(
    "offensive_duel_win_rate",
    "Offensive Duels Won",
    AggregateTotals::offensive_duel_win_rate,
);
const KEY_PASSES: AxisDef = axis(
    "key_passes_per_match",
    "Key Passes / Match",
    AggregateTotals::key_passes_per_match,
);
const PASS_ACCURACY: AxisDef = axis("pass_accuracy", "Pass Accuracy", AggregateTotals::pass_accuracy);
const PASSES_COMPLETED: AxisDef = axis(
    "passes_completed_per_match",
    "Completed Passes / Match",
    AggregateTotals::passes_completed_per_match,
);
const RECOVERIES: AxisDef = axis(
    "ball_recoveries_per_match",
    "Ball Recoveries / Match",
    AggregateTotals::ball_recoveries_per_match,
);
const TACKLE_SUCCESS: AxisDef = axis(
    "tackle_success",
    "Tackle Success",
    AggregateTotals::tackle_success,
);
const CROSS_ACCURACY: AxisDef = axis(
    "cross_accuracy",
    "Cross Accuracy",
    AggregateTotals::cross_accuracy,
);
const DEFENSIVE_ACTIONS: AxisDef = axis(
    "defensive_actions_per_match",
    "Defensive Actions / Match",
    AggregateTotals::defensive_actions_per_match,
);
const AERIALS: AxisDef = axis("aerial_win_rate", "Aerial Duels Won", AggregateTotals::aerial_win_rate);
const INTERCEPTIONS: AxisDef = axis(
    "interceptions_per_match",
    "Interceptions / Match",
    AggregateTotals::interceptions_per_match,
);
const CLEARANCES: AxisDef = axis(
    "clearances_per_match",
    "Clearances / Match",
    AggregateTotals::clearances_per_match,
);
const DRIBBLED_PAST: AxisDef = inverted(
    "dribbled_past_per_match",
    "Dribbled Past / Match",
    AggregateTotals::dribbled_past_per_match,
);
const SAVE_PERCENTAGE: AxisDef = axis(
    "save_percentage",
    "Save Percentage",
    AggregateTotals::save_percentage,
);
const SAVES: AxisDef = axis("saves_per_match", "Saves / Match", AggregateTotals::saves_per_match);
const CONCEDED: AxisDef = inverted(
    "goals_conceded_per_match",
    "Goals Conceded / Match",
    AggregateTotals::goals_conceded_per_match,
);
const CLEAN_SHEETS: AxisDef = axis(
    "clean_sheet_rate",
    "Clean Sheet Rate",
    AggregateTotals::clean_sheet_rate,
);

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub static FORWARD_AXES: &[AxisDef] = &[
    GOAL_CONTRIBUTIONS,
    GOALS,
    XG_DELTA,
    SHOTS,
    SHOT_ACCURACY,
    DRIBBLE_SUCCESS,
    OFFENSIVE_DUELS,
];

pub static ATTACKING_MIDFIELD_AXES: &[AxisDef] = &[
    GOAL_CONTRIBUTIONS,
    ASSISTS,
    KEY_PASSES,
    PASS_ACCURACY,
    DRIBBLE_SUCCESS,
    SHOT_ACCURACY,
    XG_DELTA,
];

pub static CENTRAL_MIDFIELD_AXES: &[AxisDef] = &[
    PASSES_COMPLETED,
    PASS_ACCURACY,
    KEY_PASSES,
    RECOVERIES,
    TACKLE_SUCCESS,
    GOAL_CONTRIBUTIONS,
];

/// The central-midfield template plus crossing.
pub static FLANK_MIDFIELD_AXES: &[AxisDef] = &[
    PASSES_COMPLETED,
    PASS_ACCURACY,
    KEY_PASSES,
    RECOVERIES,
    TACKLE_SUCCESS,
    GOAL_CONTRIBUTIONS,
    CROSS_ACCURACY,
];

pub static CENTER_BACK_AXES: &[AxisDef] = &[
    DEFENSIVE_ACTIONS,
    TACKLE_SUCCESS,
    AERIALS,
    INTERCEPTIONS,
    CLEARANCES,
    PASS_ACCURACY,
    DRIBBLED_PAST,
];

pub static GOALKEEPER_AXES: &[AxisDef] = &[
    SAVE_PERCENTAGE,
    SAVES,
    CONCEDED,
    CLEAN_SHEETS,
    PASS_ACCURACY,
];

pub static TEAM_AXES: &[AxisDef] = &[
    GOALS,
    CONCEDED,
    XG_DELTA,
    SHOT_ACCURACY,
    PASS_ACCURACY,
    DEFENSIVE_ACTIONS,
    CLEAN_SHEETS,
];

/// The fixed, ordered axis template of a cluster.
pub fn axes_for(cluster: Cluster) -> &'static [AxisDef] {
    match cluster {
        Cluster::Forward => FORWARD_AXES,
        Cluster::AttackingMidfield => ATTACKING_MIDFIELD_AXES,
        Cluster::FlankMidfield => FLANK_MIDFIELD_AXES,
        Cluster::CentralMidfield => CENTRAL_MIDFIELD_AXES,
        Cluster::CenterBack => CENTER_BACK_AXES,
        Cluster::Goalkeeper => GOALKEEPER_AXES,
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Score `totals` on every axis of `template`, ranking each value against the
/// same formula applied to each pool row. Empty when `totals` covers no
/// matches.
pub fn build_with(
    template: &[AxisDef],
    totals: &AggregateTotals,
    pool: &[PeerPoolRow],
) -> Vec<RadarAxis> {
    if totals.matches == 0 {
        return Vec::new();
    }

    template
        .iter()
        .map(|def| {
            let distribution: Vec<Option<f64>> =
                pool.iter().map(|row| (def.formula)(&row.totals)).collect();
            let value = (def.formula)(totals);
            RadarAxis {
                key: def.key,
                label: def.label,
                value,
                percentile: rank_opt(&distribution, value, def.inverted),
                inverted: def.inverted,
            }
        })
        .collect()
}

pub fn build_radar(cluster: Cluster, totals: &AggregateTotals, pool: &[PeerPoolRow]) -> Vec<RadarAxis> {
    build_with(axes_for(cluster), totals, pool)
}

pub fn build_team_radar(totals: &AggregateTotals, pool: &[PeerPoolRow]) -> Vec<RadarAxis> {
    build_with(TEAM_AXES, totals, pool)
}
