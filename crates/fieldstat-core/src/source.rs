// Data-access interface the metrics engine reads through, plus the two
// implementations shipped with the crate: an in-process dataset and the
// SQLite store.
//
// Every metrics entry point receives a source explicitly; nothing in the
// engine opens or caches its own handle.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::Database;
use crate::model::{
    EntityKind, EntityRef, MatchAppearance, MatchId, MatchScope, PlayerId, TournamentId,
    TournamentSummary,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("database query failed: {0}")]
    Database(String),

    #[error("blocking query task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

impl From<anyhow::Error> for SourceError {
    fn from(e: anyhow::Error) -> Self {
        SourceError::Database(format!("{e:#}"))
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Appearances grouped by player or team id.
pub type GroupedAppearances = BTreeMap<i64, Vec<MatchAppearance>>;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Read-only query interface over the match-appearance dataset.
///
/// Implementations must be safe to query concurrently; independent metric
/// requests are issued in parallel against the same source.
#[async_trait]
pub trait AppearanceSource: Send + Sync {
    /// Appearances of `entity` within `scope`, newest first.
    ///
    /// The metric pipelines read subjects out of `fetch_pool_appearances`
    /// so subject and pool share one query; this is the per-entity read for
    /// callers outside them, such as match-history views.
    async fn fetch_appearances(
        &self,
        entity: EntityRef,
        scope: &MatchScope,
    ) -> SourceResult<Vec<MatchAppearance>>;

    /// Role codes of the player's most recent `limit` appearances, newest first.
    async fn fetch_recent_roles(&self, player_id: PlayerId, limit: usize) -> SourceResult<Vec<String>>;

    /// Tournaments the entity played in, with its match count in each.
    async fn fetch_tournaments(&self, entity: EntityRef) -> SourceResult<Vec<TournamentSummary>>;

    /// Every known tournament with its total match count.
    async fn fetch_all_tournaments(&self) -> SourceResult<Vec<TournamentSummary>>;

    /// Match ids belonging to any of the given tournaments.
    async fn fetch_match_ids(&self, tournament_ids: &[TournamentId]) -> SourceResult<BTreeSet<MatchId>>;

    /// Appearances within `scope` (optionally restricted to `roles`),
    /// grouped by the id selected by `kind`.
    async fn fetch_pool_appearances(
        &self,
        kind: EntityKind,
        roles: Option<&[&str]>,
        scope: &MatchScope,
    ) -> SourceResult<GroupedAppearances>;
}

fn role_matches(roles: Option<&[&str]>, role: &str) -> bool {
    match roles {
        None => true,
        Some(set) => set.iter().any(|r| r.eq_ignore_ascii_case(role.trim())),
    }
}

// ---------------------------------------------------------------------------
// In-process dataset
// ---------------------------------------------------------------------------

/// A source backed by plain vectors. Used by tests and by callers that
/// already hold the dataset in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tournaments: Vec<(TournamentId, String)>,
    appearances: Vec<MatchAppearance>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tournament(mut self, id: TournamentId, name: &str) -> Self {
        self.tournaments.push((id, name.to_string()));
        self
    }

    pub fn with_appearances(mut self, rows: impl IntoIterator<Item = MatchAppearance>) -> Self {
        self.appearances.extend(rows);
        self
    }

    fn newest_first(&self) -> Vec<&MatchAppearance> {
        let mut rows: Vec<&MatchAppearance> = self.appearances.iter().collect();
        rows.sort_by(|a, b| {
            b.played_at
                .cmp(&a.played_at)
                .then_with(|| b.match_id.cmp(&a.match_id))
        });
        rows
    }

    fn summaries<'a>(&self, rows: impl Iterator<Item = &'a MatchAppearance>) -> Vec<TournamentSummary> {
        let mut matches: BTreeMap<TournamentId, BTreeSet<MatchId>> = BTreeMap::new();
        for row in rows {
            matches.entry(row.tournament_id).or_default().insert(row.match_id);
        }
        self.tournaments
            .iter()
            .filter_map(|(id, name)| {
                matches.get(id).map(|ids| TournamentSummary {
                    id: *id,
                    name: name.clone(),
                    match_count: ids.len() as u32,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AppearanceSource for MemorySource {
    async fn fetch_appearances(
        &self,
        entity: EntityRef,
        scope: &MatchScope,
    ) -> SourceResult<Vec<MatchAppearance>> {
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|r| entity.owns(r) && scope.contains(r.match_id))
            .cloned()
            .collect())
    }

    async fn fetch_recent_roles(&self, player_id: PlayerId, limit: usize) -> SourceResult<Vec<String>> {
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|r| r.player_id == player_id)
            .take(limit)
            .map(|r| r.role.clone())
            .collect())
    }

    async fn fetch_tournaments(&self, entity: EntityRef) -> SourceResult<Vec<TournamentSummary>> {
        let mut out = self.summaries(self.appearances.iter().filter(|r| entity.owns(r)));
        out.sort_by_key(|t| t.id);
        Ok(out)
    }

    async fn fetch_all_tournaments(&self) -> SourceResult<Vec<TournamentSummary>> {
        let mut out = self.summaries(self.appearances.iter());
        // Tournaments without any recorded match still exist.
        for (id, name) in &self.tournaments {
            if !out.iter().any(|t| t.id == *id) {
                out.push(TournamentSummary {
                    id: *id,
                    name: name.clone(),
                    match_count: 0,
                });
            }
        }
        out.sort_by_key(|t| t.id);
        Ok(out)
    }

    async fn fetch_match_ids(&self, tournament_ids: &[TournamentId]) -> SourceResult<BTreeSet<MatchId>> {
        Ok(self
            .appearances
            .iter()
            .filter(|r| tournament_ids.contains(&r.tournament_id))
            .map(|r| r.match_id)
            .collect())
    }

    async fn fetch_pool_appearances(
        &self,
        kind: EntityKind,
        roles: Option<&[&str]>,
        scope: &MatchScope,
    ) -> SourceResult<GroupedAppearances> {
        let mut grouped = GroupedAppearances::new();
        for row in self.newest_first() {
            if scope.contains(row.match_id) && role_matches(roles, &row.role) {
                grouped
                    .entry(EntityRef::key_of(kind, row))
                    .or_default()
                    .push(row.clone());
            }
        }
        Ok(grouped)
    }
}

// ---------------------------------------------------------------------------
// SQLite-backed source
// ---------------------------------------------------------------------------

/// Runs each query on the blocking pool so slow reads never stall the
/// async runtime or unrelated requests.
#[derive(Clone)]
pub struct SqliteSource {
    db: Arc<Database>,
}

impl SqliteSource {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, f: F) -> SourceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || f(db.as_ref())).await?;
        result.map_err(SourceError::from)
    }
}

#[async_trait]
impl AppearanceSource for SqliteSource {
    async fn fetch_appearances(
        &self,
        entity: EntityRef,
        scope: &MatchScope,
    ) -> SourceResult<Vec<MatchAppearance>> {
        let scope = scope.clone();
        self.run(move |db| db.appearances(entity, &scope)).await
    }

    async fn fetch_recent_roles(&self, player_id: PlayerId, limit: usize) -> SourceResult<Vec<String>> {
        self.run(move |db| db.recent_roles(player_id, limit)).await
    }

    async fn fetch_tournaments(&self, entity: EntityRef) -> SourceResult<Vec<TournamentSummary>> {
        self.run(move |db| db.tournaments_for(entity)).await
    }

    async fn fetch_all_tournaments(&self) -> SourceResult<Vec<TournamentSummary>> {
        self.run(|db| db.all_tournaments()).await
    }

    async fn fetch_match_ids(&self, tournament_ids: &[TournamentId]) -> SourceResult<BTreeSet<MatchId>> {
        let ids = tournament_ids.to_vec();
        self.run(move |db| db.match_ids(&ids)).await
    }

    async fn fetch_pool_appearances(
        &self,
        kind: EntityKind,
        roles: Option<&[&str]>,
        scope: &MatchScope,
    ) -> SourceResult<GroupedAppearances> {
        let roles: Option<Vec<String>> = roles.map(|r| r.iter().map(|s| s.to_string()).collect());
        let scope = scope.clone();
        self.run(move |db| {
            let borrowed: Option<Vec<&str>> =
                roles.as_ref().map(|r| r.iter().map(String::as_str).collect());
            db.pool_appearances(kind, borrowed.as_deref(), &scope)
        })
        .await
    }
}
