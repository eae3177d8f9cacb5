// Aggregation of appearance counters into totals and derived rates.
//
// Rates are always ratios of summed counters, never averages of per-match
// ratios. A ratio whose denominator is zero (or less) is undefined and
// reported as `None`.

use std::collections::{BTreeMap, BTreeSet};

use fieldstat_core::model::{MatchAppearance, MatchId};
use serde::Serialize;

use crate::roles::Cluster;

/// `num / den`, or `None` when the denominator is not positive or the
/// result is not finite.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den <= 0.0 || !den.is_finite() {
        return None;
    }
    let value = num / den;
    value.is_finite().then_some(value)
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Summed counters for one entity over one match scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateTotals {
    /// Distinct matches contributing rows.
    pub matches: u32,
    pub goals: u64,
    pub assists: u64,
    pub xg: f64,
    pub shots_on_target: u64,
    pub shots_off_target: u64,
    pub passes_attempted: u64,
    pub passes_completed: u64,
    pub key_passes: u64,
    pub dribbles_attempted: u64,
    pub dribbles_completed: u64,
    pub interceptions: u64,
    pub tackles_attempted: u64,
    pub tackles_won: u64,
    pub blocks: u64,
    pub clearances: u64,
    pub aerials_attempted: u64,
    pub aerials_won: u64,
    pub offensive_duels_won: u64,
    pub offensive_duels_lost: u64,
    pub crosses_attempted: u64,
    pub crosses_completed: u64,
    pub dribbled_past: u64,
    pub saves: u64,
    pub goals_conceded: u64,
    pub clean_sheets: u32,
}

impl AggregateTotals {
    fn add_counters(&mut self, row: &MatchAppearance) {
        self.goals += u64::from(row.goals);
        self.assists += u64::from(row.assists);
        self.xg += row.xg;
        self.shots_on_target += u64::from(row.shots_on_target);
        self.shots_off_target += u64::from(row.shots_off_target);
        self.passes_attempted += u64::from(row.passes_attempted);
        self.passes_completed += u64::from(row.passes_completed);
        self.key_passes += u64::from(row.key_passes);
        self.dribbles_attempted += u64::from(row.dribbles_attempted);
        self.dribbles_completed += u64::from(row.dribbles_completed);
        self.interceptions += u64::from(row.interceptions);
        self.tackles_attempted += u64::from(row.tackles_attempted);
        self.tackles_won += u64::from(row.tackles_won);
        self.blocks += u64::from(row.blocks);
        self.clearances += u64::from(row.clearances);
        self.aerials_attempted += u64::from(row.aerials_attempted);
        self.aerials_won += u64::from(row.aerials_won);
        self.offensive_duels_won += u64::from(row.offensive_duels_won);
        self.offensive_duels_lost += u64::from(row.offensive_duels_lost);
        self.crosses_attempted += u64::from(row.crosses_attempted);
        self.crosses_completed += u64::from(row.crosses_completed);
        self.dribbled_past += u64::from(row.dribbled_past);
        self.saves += u64::from(row.saves);
    }

    // ---- Composite counts ----

    pub fn shots(&self) -> u64 {
        self.shots_on_target + self.shots_off_target
    }

    pub fn goal_contributions(&self) -> u64 {
        self.goals + self.assists
    }

    /// Interceptions + tackles won + blocks + clearances.
    pub fn defensive_actions(&self) -> u64 {
        self.interceptions + self.tackles_won + self.blocks + self.clearances
    }

    /// Interceptions + tackles won.
    pub fn ball_recoveries(&self) -> u64 {
        self.interceptions + self.tackles_won
    }

    /// Attempts that were not won. Exports occasionally log more wins than
    /// attempts; those count as zero losses.
    pub fn tackles_lost(&self) -> u64 {
        self.tackles_attempted.saturating_sub(self.tackles_won)
    }

    // ---- Per-match ----

    /// `total / matches`, undefined when no matches are in scope.
    pub fn per_match(&self, total: f64) -> Option<f64> {
        ratio(total, f64::from(self.matches))
    }

    pub fn goals_per_match(&self) -> Option<f64> {
        self.per_match(self.goals as f64)
    }

    pub fn assists_per_match(&self) -> Option<f64> {
        self.per_match(self.assists as f64)
    }

    pub fn goal_contributions_per_match(&self) -> Option<f64> {
        self.per_match(self.goal_contributions() as f64)
    }

    /// `(goals - xg) / matches`: positive means finishing above expectation.
    pub fn xg_delta_per_match(&self) -> Option<f64> {
        self.per_match(self.goals as f64 - self.xg)
    }

    pub fn shots_per_match(&self) -> Option<f64> {
        self.per_match(self.shots() as f64)
    }

    pub fn key_passes_per_match(&self) -> Option<f64> {
        self.per_match(self.key_passes as f64)
    }

    pub fn passes_completed_per_match(&self) -> Option<f64> {
        self.per_match(self.passes_completed as f64)
    }

    pub fn defensive_actions_per_match(&self) -> Option<f64> {
        self.per_match(self.defensive_actions() as f64)
    }

    pub fn ball_recoveries_per_match(&self) -> Option<f64> {
        self.per_match(self.ball_recoveries() as f64)
    }

    pub fn interceptions_per_match(&self) -> Option<f64> {
        self.per_match(self.interceptions as f64)
    }

    pub fn clearances_per_match(&self) -> Option<f64> {
        self.per_match(self.clearances as f64)
    }

    pub fn dribbled_past_per_match(&self) -> Option<f64> {
        self.per_match(self.dribbled_past as f64)
    }

    pub fn saves_per_match(&self) -> Option<f64> {
        self.per_match(self.saves as f64)
    }

    pub fn goals_conceded_per_match(&self) -> Option<f64> {
        self.per_match(self.goals_conceded as f64)
    }

    // ---- Ratios ----

    pub fn shot_accuracy(&self) -> Option<f64> {
        ratio(self.shots_on_target as f64, self.shots() as f64)
    }

    pub fn goal_conversion(&self) -> Option<f64> {
        ratio(self.goals as f64, self.shots() as f64)
    }

    pub fn pass_accuracy(&self) -> Option<f64> {
        ratio(self.passes_completed as f64, self.passes_attempted as f64)
    }

    pub fn dribble_success(&self) -> Option<f64> {
        ratio(self.dribbles_completed as f64, self.dribbles_attempted as f64)
    }

    /// `won / (won + lost)`, so never above 1.
    pub fn tackle_success(&self) -> Option<f64> {
        let won = self.tackles_won;
        ratio(won as f64, (won + self.tackles_lost()) as f64)
    }

    pub fn aerial_win_rate(&self) -> Option<f64> {
        ratio(self.aerials_won as f64, self.aerials_attempted as f64)
    }

    pub fn cross_accuracy(&self) -> Option<f64> {
        ratio(self.crosses_completed as f64, self.crosses_attempted as f64)
    }

    pub fn offensive_duel_win_rate(&self) -> Option<f64> {
        ratio(
            self.offensive_duels_won as f64,
            (self.offensive_duels_won + self.offensive_duels_lost) as f64,
        )
    }

    /// Saves over shots faced on target (saves + goals conceded).
    pub fn save_percentage(&self) -> Option<f64> {
        ratio(self.saves as f64, (self.saves + self.goals_conceded) as f64)
    }

    pub fn clean_sheet_rate(&self) -> Option<f64> {
        self.per_match(f64::from(self.clean_sheets))
    }

    /// Snapshot of every derived rate, for serialization.
    pub fn rates(&self) -> DerivedRates {
        DerivedRates {
            shot_accuracy: self.shot_accuracy(),
            goal_conversion: self.goal_conversion(),
            pass_accuracy: self.pass_accuracy(),
            dribble_success: self.dribble_success(),
            tackle_success: self.tackle_success(),
            aerial_win_rate: self.aerial_win_rate(),
            cross_accuracy: self.cross_accuracy(),
            offensive_duel_win_rate: self.offensive_duel_win_rate(),
            save_percentage: self.save_percentage(),
            clean_sheet_rate: self.clean_sheet_rate(),
            goals_per_match: self.goals_per_match(),
            assists_per_match: self.assists_per_match(),
            goal_contributions_per_match: self.goal_contributions_per_match(),
            xg_delta_per_match: self.xg_delta_per_match(),
            key_passes_per_match: self.key_passes_per_match(),
            defensive_actions_per_match: self.defensive_actions_per_match(),
        }
    }
}

/// Derived rates; `None` serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedRates {
    pub shot_accuracy: Option<f64>,
    pub goal_conversion: Option<f64>,
    pub pass_accuracy: Option<f64>,
    pub dribble_success: Option<f64>,
    pub tackle_success: Option<f64>,
    pub aerial_win_rate: Option<f64>,
    pub cross_accuracy: Option<f64>,
    pub offensive_duel_win_rate: Option<f64>,
    pub save_percentage: Option<f64>,
    pub clean_sheet_rate: Option<f64>,
    pub goals_per_match: Option<f64>,
    pub assists_per_match: Option<f64>,
    pub goal_contributions_per_match: Option<f64>,
    pub xg_delta_per_match: Option<f64>,
    pub key_passes_per_match: Option<f64>,
    pub defensive_actions_per_match: Option<f64>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Sum a player's appearances, optionally keeping only rows whose role
/// belongs to `role_filter`.
///
/// A player appearing twice in one match (re-entry under another role)
/// counts that match once.
pub fn aggregate<'a, I>(rows: I, role_filter: Option<Cluster>) -> AggregateTotals
where
    I: IntoIterator<Item = &'a MatchAppearance>,
{
    let mut totals = AggregateTotals::default();
    let mut matches: BTreeSet<MatchId> = BTreeSet::new();
    let mut clean: BTreeSet<MatchId> = BTreeSet::new();

    for row in rows {
        if role_filter.is_some_and(|cluster| !cluster.includes(&row.role)) {
            continue;
        }
        matches.insert(row.match_id);
        totals.add_counters(row);
        totals.goals_conceded += u64::from(row.goals_conceded);
        if row.clean_sheet {
            clean.insert(row.match_id);
        }
    }

    totals.matches = matches.len() as u32;
    totals.clean_sheets = clean.len() as u32;
    totals
}

/// Sum every player row of a team.
///
/// Goals conceded are a team-level fact repeated on several rows, so each
/// match contributes its maximum rather than the sum; a match is a clean
/// sheet when any row flags it.
pub fn aggregate_team<'a, I>(rows: I) -> AggregateTotals
where
    I: IntoIterator<Item = &'a MatchAppearance>,
{
    let mut totals = AggregateTotals::default();
    let mut conceded: BTreeMap<MatchId, u32> = BTreeMap::new();
    let mut clean: BTreeSet<MatchId> = BTreeSet::new();

    for row in rows {
        totals.add_counters(row);
        let entry = conceded.entry(row.match_id).or_insert(0);
        *entry = (*entry).max(row.goals_conceded);
        if row.clean_sheet {
            clean.insert(row.match_id);
        }
    }

    totals.matches = conceded.len() as u32;
    totals.goals_conceded = conceded.values().map(|&g| u64::from(g)).sum();
    totals.clean_sheets = clean.len() as u32;
    totals
}
