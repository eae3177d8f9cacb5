// End-to-end tests: dataset -> source -> StatsService -> serialized results.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fieldstat_app::leaderboard::LeaderboardKind;
use fieldstat_app::StatsService;
use fieldstat_core::config::{Config, LeaderboardConfig, LeagueConfig, SamplingConfig};
use fieldstat_core::db::{Database, MatchRecord};
use fieldstat_core::model::{
    EntityKind, EntityRef, MatchAppearance, MatchId, MatchScope, PlayerId, TournamentId,
    TournamentSummary,
};
use fieldstat_core::source::{
    AppearanceSource, GroupedAppearances, MemorySource, SourceError, SourceResult, SqliteSource,
};
use fieldstat_metrics::league::LeagueLabel;
use fieldstat_metrics::roles::Cluster;

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------
//
// Tournaments:
//   1  Season 20 Super League   matches  1..=20
//   2  Season 21 Super League   matches 21..=40
//   3  Season 5 Super League    matches 41..=45  (below the season threshold)
//   4  Season 21 First League   matches 46..=60
//   5  Season 21 Cup            matches 61..=62
//
// Players:
//   1  team 10  CB   matches 1..=35 official, 41..=45 unofficial
//   2  team 11  CB   matches 1..=40
//   3  team 11  LCB  matches 1..=30
//   4  team 10  CB   matches 1..=10
//   5  team 10  ST   matches 1..=40, one goal each
//   6  team 10  LB   matches 1..=40
//   7  team 12  CB   matches 41..=45 only
//   9  team 12  CB   matches 46..=60
//  10  team 13  GK   matches 61..=62

const TOURNAMENTS: &[(TournamentId, &str)] = &[
    (1, "Season 20 Super League"),
    (2, "Season 21 Super League"),
    (3, "Season 5 Super League"),
    (4, "Season 21 First League"),
    (5, "Season 21 Cup"),
];

fn tournament_of(match_id: MatchId) -> TournamentId {
    match match_id {
        1..=20 => 1,
        21..=40 => 2,
        41..=45 => 3,
        46..=60 => 4,
        _ => 5,
    }
}

fn kickoff(match_id: MatchId) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + match_id * 86_400, 0).unwrap()
}

fn row(player_id: PlayerId, team_id: i64, match_id: MatchId, role: &str) -> MatchAppearance {
    MatchAppearance {
        player_id,
        team_id,
        match_id,
        tournament_id: tournament_of(match_id),
        played_at: kickoff(match_id),
        role: role.to_string(),
        ..Default::default()
    }
}

fn dataset() -> Vec<MatchAppearance> {
    let mut rows = Vec::new();

    // 50 tackles won of 60 attempted over 35 official matches.
    for m in 1..=35 {
        rows.push(MatchAppearance {
            tackles_won: if m <= 15 { 2 } else { 1 },
            tackles_attempted: (if m <= 15 { 2 } else { 1 }) + u32::from(m <= 10),
            interceptions: 1,
            clearances: 2,
            clean_sheet: true,
            ..row(1, 10, m, "CB")
        });
    }
    for m in 41..=45 {
        rows.push(MatchAppearance {
            tackles_won: 20,
            tackles_attempted: 20,
            ..row(1, 10, m, "CB")
        });
    }
    for m in 1..=40 {
        rows.push(MatchAppearance {
            tackles_won: 1,
            tackles_attempted: 2,
            interceptions: 2,
            goals_conceded: 1,
            ..row(2, 11, m, "CB")
        });
        rows.push(MatchAppearance { goals: 1, ..row(5, 10, m, "ST") });
        rows.push(row(6, 10, m, "LB"));
    }
    for m in 1..=30 {
        rows.push(MatchAppearance { goals_conceded: 1, ..row(3, 11, m, "LCB") });
    }
    for m in 1..=10 {
        rows.push(row(4, 10, m, "CB"));
    }
    for m in 41..=45 {
        rows.push(row(7, 12, m, "CB"));
    }
    for m in 46..=60 {
        rows.push(row(9, 12, m, "CB"));
    }
    for m in 61..=62 {
        rows.push(row(10, 13, m, "GK"));
    }
    rows
}

fn memory_source() -> MemorySource {
    TOURNAMENTS
        .iter()
        .fold(MemorySource::new(), |src, (id, name)| src.with_tournament(*id, name))
        .with_appearances(dataset())
}

fn sqlite_source() -> SqliteSource {
    let db = Database::open(":memory:").unwrap();
    let tournaments: Vec<TournamentSummary> = TOURNAMENTS
        .iter()
        .map(|(id, name)| TournamentSummary {
            id: *id,
            name: name.to_string(),
            match_count: 0,
        })
        .collect();
    let matches: Vec<MatchRecord> = (1..=62)
        .map(|id| MatchRecord {
            id,
            tournament_id: tournament_of(id),
            played_at: kickoff(id),
        })
        .collect();
    db.import(&tournaments, &matches, &dataset()).unwrap();
    SqliteSource::new(Arc::new(db))
}

fn config() -> Config {
    Config {
        league: LeagueConfig {
            name: "Test League".into(),
            min_official_season: 18,
            official_tournament_ids: vec![],
        },
        sampling: SamplingConfig::default(),
        leaderboard: LeaderboardConfig {
            size: 3,
            min_matches: 5,
        },
        db_path: String::new(),
    }
}

fn service() -> StatsService {
    StatsService::new(Arc::new(memory_source()), config())
}

/// Fails every query.
struct DownSource;

#[async_trait]
impl AppearanceSource for DownSource {
    async fn fetch_appearances(&self, _: EntityRef, _: &MatchScope) -> SourceResult<Vec<MatchAppearance>> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
    async fn fetch_recent_roles(&self, _: PlayerId, _: usize) -> SourceResult<Vec<String>> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
    async fn fetch_tournaments(&self, _: EntityRef) -> SourceResult<Vec<TournamentSummary>> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
    async fn fetch_all_tournaments(&self) -> SourceResult<Vec<TournamentSummary>> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
    async fn fetch_match_ids(&self, _: &[TournamentId]) -> SourceResult<std::collections::BTreeSet<MatchId>> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
    async fn fetch_pool_appearances(
        &self,
        _: EntityKind,
        _: Option<&[&str]>,
        _: &MatchScope,
    ) -> SourceResult<GroupedAppearances> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
}

/// Delegates to a memory source but fails the first pool query.
struct FlakyPoolSource {
    inner: MemorySource,
    pool_calls: AtomicUsize,
}

#[async_trait]
impl AppearanceSource for FlakyPoolSource {
    async fn fetch_appearances(&self, e: EntityRef, s: &MatchScope) -> SourceResult<Vec<MatchAppearance>> {
        self.inner.fetch_appearances(e, s).await
    }
    async fn fetch_recent_roles(&self, p: PlayerId, n: usize) -> SourceResult<Vec<String>> {
        self.inner.fetch_recent_roles(p, n).await
    }
    async fn fetch_tournaments(&self, e: EntityRef) -> SourceResult<Vec<TournamentSummary>> {
        self.inner.fetch_tournaments(e).await
    }
    async fn fetch_all_tournaments(&self) -> SourceResult<Vec<TournamentSummary>> {
        self.inner.fetch_all_tournaments().await
    }
    async fn fetch_match_ids(&self, ids: &[TournamentId]) -> SourceResult<std::collections::BTreeSet<MatchId>> {
        self.inner.fetch_match_ids(ids).await
    }
    async fn fetch_pool_appearances(
        &self,
        kind: EntityKind,
        roles: Option<&[&str]>,
        scope: &MatchScope,
    ) -> SourceResult<GroupedAppearances> {
        if self.pool_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(SourceError::Unavailable("timeout".into()));
        }
        self.inner.fetch_pool_appearances(kind, roles, scope).await
    }
}

// ---------------------------------------------------------------------------
// Player metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn center_back_with_35_official_matches() {
    let metrics = service().player_metrics("1").await;

    assert!(metrics.ready, "reason: {:?}", metrics.reason);
    assert_eq!(metrics.reason, None);
    assert_eq!(metrics.current_role.as_deref(), Some("CB"));
    assert_eq!(metrics.cluster, Some(Cluster::CenterBack));
    assert_eq!(metrics.matches_in_scope, 35);
    assert_eq!(
        metrics.tournaments_used,
        vec!["Season 20 Super League", "Season 21 Super League"]
    );
    // Players 1, 2 and 3 have 30+ center-back matches; 4 and 9 fall short.
    assert_eq!(metrics.pool_size, 3);

    let totals = metrics.totals.as_ref().unwrap();
    assert_eq!(totals.tackles_won, 50);
    assert_eq!(totals.tackles_lost(), 10);
    // Unofficial matches 41..=45 are left out.
    assert_eq!(totals.matches, 35);

    let radar = &metrics.radar;
    assert_eq!(radar.len(), 7);
    let def = &radar[0];
    assert_eq!(def.key, "defensive_actions_per_match");
    let expected = (35.0 + 50.0 + 0.0 + 70.0) / 35.0;
    assert!((def.value.unwrap() - expected).abs() < 1e-9);
    assert_eq!(def.percentile, 100);
    for axis in radar {
        assert!(axis.percentile <= 100);
    }

    let tackle = radar.iter().find(|a| a.key == "tackle_success").unwrap();
    assert!((tackle.value.unwrap() - 50.0 / 60.0).abs() < 1e-9);
    assert_eq!(tackle.percentile, 100);
}

#[tokio::test]
async fn peer_without_tackle_attempts_is_left_out_of_that_axis() {
    let metrics = service().player_metrics("2").await;
    assert!(metrics.ready);
    let tackle = metrics.radar.iter().find(|a| a.key == "tackle_success").unwrap();
    // Distribution is {50/60, 1/2}; player 3 never attempted a tackle.
    assert_eq!(tackle.percentile, 50);
}

#[tokio::test]
async fn readiness_gates_report_first_failure() {
    let svc = service();

    let no_history = svc.player_metrics("8").await;
    assert!(!no_history.ready);
    assert_eq!(no_history.reason.as_deref(), Some("role_unresolved"));
    assert_eq!(no_history.current_role, None);

    let full_back = svc.player_metrics("6").await;
    assert_eq!(full_back.reason.as_deref(), Some("cluster_unresolved"));
    assert_eq!(full_back.current_role.as_deref(), Some("LB"));
    assert!(full_back.radar.is_empty());

    let unofficial_only = svc.player_metrics("7").await;
    assert_eq!(unofficial_only.reason.as_deref(), Some("no_eligible_tournaments"));
    assert_eq!(unofficial_only.cluster, Some(Cluster::CenterBack));

    let short = svc.player_metrics("9").await;
    assert_eq!(short.reason.as_deref(), Some("insufficient_sample"));
    assert_eq!(short.matches_in_scope, 15);
    assert!(short.radar.is_empty());
    assert!(short.totals.is_none());
}

#[tokio::test]
async fn explicit_tournament_list_narrows_scope() {
    let mut cfg = config();
    cfg.league.official_tournament_ids = vec![1];
    let svc = StatsService::new(Arc::new(memory_source()), cfg);

    let metrics = svc.player_metrics("1").await;
    assert_eq!(metrics.reason.as_deref(), Some("insufficient_sample"));
    assert_eq!(metrics.matches_in_scope, 20);
    assert_eq!(metrics.tournaments_used, vec!["Season 20 Super League"]);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_querying() {
    // A source that fails every query would turn any query into
    // data_unavailable, so reaching invalid_input proves none was issued.
    let svc = StatsService::new(Arc::new(DownSource), config());

    for raw in ["", "abc", "-1", "0"] {
        let metrics = svc.player_metrics(raw).await;
        assert!(!metrics.ready);
        assert_eq!(metrics.entity_id, None);
        assert!(metrics.reason.as_deref().unwrap().starts_with("invalid_input"));

        let team = svc.team_metrics(raw).await;
        assert!(team.reason.as_deref().unwrap().starts_with("invalid_input"));
    }
}

#[tokio::test]
async fn source_failure_degrades_to_not_ready() {
    let svc = StatsService::new(Arc::new(DownSource), config());

    let metrics = svc.player_metrics("1").await;
    assert!(!metrics.ready);
    assert_eq!(metrics.entity_id, Some(1));
    let reason = metrics.reason.unwrap();
    assert!(reason.starts_with("data_unavailable"), "{reason}");
    assert!(reason.contains("connection refused"));

    let team = svc.team_metrics("10").await;
    assert!(team.reason.unwrap().starts_with("data_unavailable"));
}

fn flaky_pool_service() -> StatsService {
    let source = FlakyPoolSource {
        inner: memory_source(),
        pool_calls: AtomicUsize::new(0),
    };
    StatsService::new(Arc::new(source), config())
}

#[tokio::test]
async fn pool_failure_keeps_what_was_already_resolved() {
    let metrics = flaky_pool_service().player_metrics("1").await;
    assert!(!metrics.ready);
    assert!(metrics.reason.as_deref().unwrap().starts_with("data_unavailable"));
    assert_eq!(metrics.current_role.as_deref(), Some("CB"));
    assert_eq!(metrics.cluster, Some(Cluster::CenterBack));
    assert!(metrics.radar.is_empty());
    assert!(metrics.totals.is_none());

    let team = flaky_pool_service().team_metrics("10").await;
    assert!(!team.ready);
    assert!(team.reason.as_deref().unwrap().starts_with("data_unavailable"));
    assert_eq!(team.league, Some(LeagueLabel::SuperLeague));
}

#[tokio::test]
async fn tournaments_used_lists_only_those_played_in_the_cluster() {
    // Player 20: center-back in tournaments 1 and 4, striker in tournament 2.
    let mut rows = dataset();
    for m in (1..=20).chain(46..=60) {
        rows.push(row(20, 14, m, "CB"));
    }
    for m in 21..=25 {
        rows.push(row(20, 14, m, "ST"));
    }
    let source = TOURNAMENTS
        .iter()
        .fold(MemorySource::new(), |src, (id, name)| src.with_tournament(*id, name))
        .with_appearances(rows);
    let svc = StatsService::new(Arc::new(source), config());

    let metrics = svc.player_metrics("20").await;
    assert!(metrics.ready, "reason: {:?}", metrics.reason);
    assert_eq!(metrics.cluster, Some(Cluster::CenterBack));
    assert_eq!(metrics.matches_in_scope, 35);
    assert_eq!(
        metrics.tournaments_used,
        vec!["Season 20 Super League", "Season 21 First League"]
    );
}

#[tokio::test]
async fn player_metrics_serialize_to_json() {
    let metrics = service().player_metrics("1").await;
    let json = serde_json::to_value(&metrics).unwrap();
    assert_eq!(json["ready"], true);
    assert_eq!(json["cluster"], "center_back");
    assert_eq!(json["radar"].as_array().unwrap().len(), 7);
    assert!(json["reason"].is_null());

    let gated = service().player_metrics("9").await;
    let json = serde_json::to_value(&gated).unwrap();
    assert_eq!(json["ready"], false);
    assert_eq!(json["reason"], "insufficient_sample");
    assert!(json["totals"].is_null());
}

// ---------------------------------------------------------------------------
// Team metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn team_ranked_against_same_league() {
    let metrics = service().team_metrics("10").await;

    assert!(metrics.ready, "reason: {:?}", metrics.reason);
    assert_eq!(metrics.league, Some(LeagueLabel::SuperLeague));
    assert_eq!(metrics.matches_in_scope, 40);
    assert_eq!(metrics.pool_size, 2);
    assert_eq!(metrics.radar.len(), 7);

    let totals = metrics.totals.as_ref().unwrap();
    assert_eq!(totals.goals, 40);
    assert_eq!(totals.clean_sheets, 35);
    assert_eq!(totals.goals_conceded, 0);

    let conceded = metrics
        .radar
        .iter()
        .find(|a| a.key == "goals_conceded_per_match")
        .unwrap();
    assert!(conceded.inverted);
    // 0 vs 1 conceded per match: team 10 sits at the bottom of the raw
    // distribution, which inverts to the top half.
    assert_eq!(conceded.percentile, 50);
}

#[tokio::test]
async fn team_conceded_counts_once_per_match() {
    let metrics = service().team_metrics("11").await;
    assert!(metrics.ready);
    let totals = metrics.totals.unwrap();
    // Two rows per match carry the same conceded goal.
    assert_eq!(totals.goals_conceded, 40);
}

#[tokio::test]
async fn team_gates() {
    let svc = service();

    let first_league = svc.team_metrics("12").await;
    assert!(first_league.ready);
    assert_eq!(first_league.league, Some(LeagueLabel::FirstLeague));
    assert_eq!(first_league.tournaments_used, vec!["Season 21 First League"]);
    assert_eq!(first_league.matches_in_scope, 15);

    let cup_only = svc.team_metrics("13").await;
    assert_eq!(cup_only.reason.as_deref(), Some("league_unresolved"));

    let unknown = svc.team_metrics("99").await;
    assert_eq!(unknown.reason.as_deref(), Some("no_eligible_tournaments"));
}

// ---------------------------------------------------------------------------
// Leaderboards
// ---------------------------------------------------------------------------

fn ids(board: &fieldstat_app::leaderboard::Leaderboard) -> Vec<PlayerId> {
    board.entries.iter().map(|e| e.player_id).collect()
}

#[tokio::test]
async fn leaderboards_rank_official_totals() {
    let boards = service().leaderboards().await;
    assert_eq!(boards.len(), LeaderboardKind::ALL.len());
    assert!(boards.iter().all(|b| b.ok));

    let goals = &boards[0];
    assert_eq!(goals.kind, LeaderboardKind::Goals);
    assert_eq!(ids(goals), vec![5, 1, 2]);
    assert_eq!(goals.entries[0].value, 40);

    let defensive = boards
        .iter()
        .find(|b| b.kind == LeaderboardKind::DefensiveActions)
        .unwrap();
    assert_eq!(ids(defensive), vec![1, 2, 3]);
    assert_eq!(defensive.entries[0].value, 155);
    assert_eq!(defensive.entries[1].value, 120);

    let clean = boards
        .iter()
        .find(|b| b.kind == LeaderboardKind::CleanSheets)
        .unwrap();
    assert_eq!(clean.entries[0].player_id, 1);
    assert_eq!(clean.entries[0].value, 35);
}

#[tokio::test]
async fn one_failing_board_does_not_fail_the_others() {
    let source = FlakyPoolSource {
        inner: memory_source(),
        pool_calls: AtomicUsize::new(0),
    };
    let svc = StatsService::new(Arc::new(source), config());
    let boards = svc.leaderboards().await;

    assert_eq!(boards.len(), 5);
    let failed: Vec<_> = boards.iter().filter(|b| !b.ok).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].entries.is_empty());
    assert!(failed[0].error.as_deref().unwrap().contains("timeout"));
    assert!(boards.iter().filter(|b| b.ok).all(|b| !b.entries.is_empty()));
}

#[tokio::test]
async fn unavailable_scope_fails_every_board() {
    let svc = StatsService::new(Arc::new(DownSource), config());
    let boards = svc.leaderboards().await;
    assert_eq!(boards.len(), 5);
    assert!(boards.iter().all(|b| !b.ok && b.error.is_some()));
}

// ---------------------------------------------------------------------------
// SQLite parity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sqlite_source_matches_memory_source() {
    let memory = service();
    let sqlite = StatsService::new(Arc::new(sqlite_source()), config());

    for id in ["1", "2", "6", "7", "9"] {
        assert_eq!(memory.player_metrics(id).await, sqlite.player_metrics(id).await, "player {id}");
    }
    for id in ["10", "12", "13"] {
        assert_eq!(memory.team_metrics(id).await, sqlite.team_metrics(id).await, "team {id}");
    }
    assert_eq!(memory.leaderboards().await, sqlite.leaderboards().await);
}
