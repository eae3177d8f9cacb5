// SQLite persistence layer for tournaments, matches, and player appearances.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::model::{
    EntityKind, EntityRef, MatchAppearance, MatchId, MatchScope, PlayerId, TournamentId,
    TournamentSummary,
};

/// Column list shared by every appearance query. Order must match
/// `appearance_from_row`.
const APPEARANCE_COLUMNS: &str = "
    a.player_id, a.team_id, a.match_id, m.tournament_id, m.played_at, a.role,
    a.goals, a.assists, a.xg, a.shots_on_target, a.shots_off_target,
    a.passes_attempted, a.passes_completed, a.key_passes,
    a.dribbles_attempted, a.dribbles_completed, a.interceptions,
    a.tackles_attempted, a.tackles_won, a.blocks, a.clearances,
    a.aerials_attempted, a.aerials_won, a.offensive_duels_won, a.offensive_duels_lost,
    a.crosses_attempted, a.crosses_completed, a.dribbled_past,
    a.saves, a.goals_conceded, a.clean_sheet";

/// A match row as stored: id, owning tournament, and kickoff time.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub played_at: DateTime<Utc>,
}

/// SQLite-backed store for the match-event dataset.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tournaments (
                id   INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS matches (
                id            INTEGER PRIMARY KEY,
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id),
                played_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS appearances (
                player_id            INTEGER NOT NULL,
                team_id              INTEGER NOT NULL,
                match_id             INTEGER NOT NULL REFERENCES matches(id),
                role                 TEXT NOT NULL,
                goals                INTEGER NOT NULL DEFAULT 0,
                assists              INTEGER NOT NULL DEFAULT 0,
                xg                   REAL    NOT NULL DEFAULT 0,
                shots_on_target      INTEGER NOT NULL DEFAULT 0,
                shots_off_target     INTEGER NOT NULL DEFAULT 0,
                passes_attempted     INTEGER NOT NULL DEFAULT 0,
                passes_completed     INTEGER NOT NULL DEFAULT 0,
                key_passes           INTEGER NOT NULL DEFAULT 0,
                dribbles_attempted   INTEGER NOT NULL DEFAULT 0,
                dribbles_completed   INTEGER NOT NULL DEFAULT 0,
                interceptions        INTEGER NOT NULL DEFAULT 0,
                tackles_attempted    INTEGER NOT NULL DEFAULT 0,
                tackles_won          INTEGER NOT NULL DEFAULT 0,
                blocks               INTEGER NOT NULL DEFAULT 0,
                clearances           INTEGER NOT NULL DEFAULT 0,
                aerials_attempted    INTEGER NOT NULL DEFAULT 0,
                aerials_won          INTEGER NOT NULL DEFAULT 0,
                offensive_duels_won  INTEGER NOT NULL DEFAULT 0,
                offensive_duels_lost INTEGER NOT NULL DEFAULT 0,
                crosses_attempted    INTEGER NOT NULL DEFAULT 0,
                crosses_completed    INTEGER NOT NULL DEFAULT 0,
                dribbled_past        INTEGER NOT NULL DEFAULT 0,
                saves                INTEGER NOT NULL DEFAULT 0,
                goals_conceded       INTEGER NOT NULL DEFAULT 0,
                clean_sheet          INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (player_id, match_id)
            );

            CREATE INDEX IF NOT EXISTS idx_appearances_team ON appearances(team_id);
            CREATE INDEX IF NOT EXISTS idx_appearances_match ON appearances(match_id);
            CREATE INDEX IF NOT EXISTS idx_matches_tournament ON matches(tournament_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Import tournaments, matches, and appearances in a single transaction.
    ///
    /// Tournaments and matches are upserted and appearances use INSERT OR
    /// REPLACE, so re-importing the same export is idempotent. Appearance
    /// `tournament_id`/`played_at` fields are ignored on write; they are
    /// always read back through the owning match.
    pub fn import(
        &self,
        tournaments: &[TournamentSummary],
        matches: &[MatchRecord],
        appearances: &[MatchAppearance],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for t in tournaments {
            tx.execute(
                "INSERT INTO tournaments (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![t.id, t.name],
            )
            .context("failed to insert tournament in batch")?;
        }

        for m in matches {
            tx.execute(
                "INSERT INTO matches (id, tournament_id, played_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    tournament_id = excluded.tournament_id,
                    played_at     = excluded.played_at",
                params![m.id, m.tournament_id, m.played_at.to_rfc3339()],
            )
            .context("failed to insert match in batch")?;
        }

        for a in appearances {
            tx.execute(
                "INSERT OR REPLACE INTO appearances (
                    player_id, team_id, match_id, role,
                    goals, assists, xg, shots_on_target, shots_off_target,
                    passes_attempted, passes_completed, key_passes,
                    dribbles_attempted, dribbles_completed, interceptions,
                    tackles_attempted, tackles_won, blocks, clearances,
                    aerials_attempted, aerials_won, offensive_duels_won, offensive_duels_lost,
                    crosses_attempted, crosses_completed, dribbled_past,
                    saves, goals_conceded, clean_sheet)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)",
                params![
                    a.player_id,
                    a.team_id,
                    a.match_id,
                    a.role.trim().to_uppercase(),
                    a.goals,
                    a.assists,
                    a.xg,
                    a.shots_on_target,
                    a.shots_off_target,
                    a.passes_attempted,
                    a.passes_completed,
                    a.key_passes,
                    a.dribbles_attempted,
                    a.dribbles_completed,
                    a.interceptions,
                    a.tackles_attempted,
                    a.tackles_won,
                    a.blocks,
                    a.clearances,
                    a.aerials_attempted,
                    a.aerials_won,
                    a.offensive_duels_won,
                    a.offensive_duels_lost,
                    a.crosses_attempted,
                    a.crosses_completed,
                    a.dribbled_past,
                    a.saves,
                    a.goals_conceded,
                    a.clean_sheet,
                ],
            )
            .with_context(|| {
                format!(
                    "failed to insert appearance (player {}, match {})",
                    a.player_id, a.match_id
                )
            })?;
        }

        tx.commit().context("failed to commit import")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All appearances belonging to `entity` inside `scope`, ordered by
    /// recency (newest first).
    pub fn appearances(&self, entity: EntityRef, scope: &MatchScope) -> Result<Vec<MatchAppearance>> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let column = match entity.kind() {
            EntityKind::Player => "a.player_id",
            EntityKind::Team => "a.team_id",
        };
        let mut conn = self.conn();
        let scope_join = stage_scope(&mut conn, scope)?;
        let sql = format!(
            "SELECT {APPEARANCE_COLUMNS}
             FROM appearances a JOIN matches m ON m.id = a.match_id
             {scope_join}
             WHERE {column} = ?1
             ORDER BY m.played_at DESC, a.match_id DESC"
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare appearances query")?;
        let rows = stmt
            .query_map(params![entity.id()], appearance_from_row)
            .context("failed to query appearances")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map appearance rows")?;
        Ok(rows)
    }

    /// Role codes of a player's most recent `limit` appearances, newest first.
    pub fn recent_roles(&self, player_id: PlayerId, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT a.role
                 FROM appearances a JOIN matches m ON m.id = a.match_id
                 WHERE a.player_id = ?1
                 ORDER BY m.played_at DESC, a.match_id DESC
                 LIMIT ?2",
            )
            .context("failed to prepare recent_roles query")?;
        let roles = stmt
            .query_map(params![player_id, limit as i64], |row| row.get(0))
            .context("failed to query recent roles")?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("failed to map role rows")?;
        Ok(roles)
    }

    /// Tournaments the entity appeared in, with the number of distinct
    /// matches it played in each. Ordered by tournament id.
    pub fn tournaments_for(&self, entity: EntityRef) -> Result<Vec<TournamentSummary>> {
        let column = match entity.kind() {
            EntityKind::Player => "a.player_id",
            EntityKind::Team => "a.team_id",
        };
        let sql = format!(
            "SELECT t.id, t.name, COUNT(DISTINCT a.match_id)
             FROM appearances a
             JOIN matches m ON m.id = a.match_id
             JOIN tournaments t ON t.id = m.tournament_id
             WHERE {column} = ?1
             GROUP BY t.id, t.name
             ORDER BY t.id"
        );
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare tournaments_for query")?;
        let rows = stmt
            .query_map(params![entity.id()], tournament_from_row)
            .context("failed to query entity tournaments")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map tournament rows")?;
        Ok(rows)
    }

    /// Every tournament with its total match count. Ordered by id.
    pub fn all_tournaments(&self) -> Result<Vec<TournamentSummary>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.name, COUNT(m.id)
                 FROM tournaments t LEFT JOIN matches m ON m.tournament_id = t.id
                 GROUP BY t.id, t.name
                 ORDER BY t.id",
            )
            .context("failed to prepare all_tournaments query")?;
        let rows = stmt
            .query_map([], tournament_from_row)
            .context("failed to query tournaments")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map tournament rows")?;
        Ok(rows)
    }

    /// Ids of every match played in any of the given tournaments.
    pub fn match_ids(&self, tournament_ids: &[TournamentId]) -> Result<BTreeSet<MatchId>> {
        if tournament_ids.is_empty() {
            return Ok(BTreeSet::new());
        }
        let placeholders = vec!["?"; tournament_ids.len()].join(", ");
        let sql = format!("SELECT id FROM matches WHERE tournament_id IN ({placeholders})");
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare match_ids query")?;
        let ids = stmt
            .query_map(params_from_iter(tournament_ids.iter()), |row| row.get(0))
            .context("failed to query match ids")?
            .collect::<std::result::Result<BTreeSet<MatchId>, _>>()
            .context("failed to map match id rows")?;
        Ok(ids)
    }

    /// Appearances inside `scope`, optionally restricted to a role-code set,
    /// grouped by player or team id.
    pub fn pool_appearances(
        &self,
        kind: EntityKind,
        roles: Option<&[&str]>,
        scope: &MatchScope,
    ) -> Result<BTreeMap<i64, Vec<MatchAppearance>>> {
        if scope.is_empty() || roles.is_some_and(|r| r.is_empty()) {
            return Ok(BTreeMap::new());
        }
        let role_params: Vec<String> = roles
            .unwrap_or_default()
            .iter()
            .map(|r| r.trim().to_uppercase())
            .collect();
        let role_clause = if role_params.is_empty() {
            String::new()
        } else {
            format!(
                "WHERE a.role IN ({})",
                vec!["?"; role_params.len()].join(", ")
            )
        };
        let mut conn = self.conn();
        let scope_join = stage_scope(&mut conn, scope)?;
        let sql = format!(
            "SELECT {APPEARANCE_COLUMNS}
             FROM appearances a JOIN matches m ON m.id = a.match_id
             {scope_join}
             {role_clause}
             ORDER BY m.played_at DESC, a.match_id DESC"
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare pool query")?;
        let rows = stmt
            .query_map(params_from_iter(role_params.iter()), appearance_from_row)
            .context("failed to query pool appearances")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pool rows")?;

        let mut grouped: BTreeMap<i64, Vec<MatchAppearance>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(EntityRef::key_of(kind, &row))
                .or_default()
                .push(row);
        }
        Ok(grouped)
    }
}

/// Load an explicit match scope into `temp.scope_matches` and return the
/// join that restricts an appearance query to it. `MatchScope::All` stages
/// nothing. The caller must keep holding the connection guard until its
/// query has run.
fn stage_scope(conn: &mut Connection, scope: &MatchScope) -> Result<&'static str> {
    let MatchScope::Matches(ids) = scope else {
        return Ok("");
    };
    let tx = conn.transaction().context("failed to begin scope transaction")?;
    tx.execute_batch(
        "CREATE TEMP TABLE IF NOT EXISTS scope_matches (id INTEGER PRIMARY KEY);
         DELETE FROM temp.scope_matches;",
    )
    .context("failed to reset scope table")?;
    {
        let mut insert = tx
            .prepare("INSERT INTO temp.scope_matches (id) VALUES (?1)")
            .context("failed to prepare scope insert")?;
        for id in ids {
            insert
                .execute(params![id])
                .with_context(|| format!("failed to stage match {id} in scope"))?;
        }
    }
    tx.commit().context("failed to commit scope")?;
    Ok("JOIN temp.scope_matches s ON s.id = a.match_id")
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn tournament_from_row(row: &Row<'_>) -> rusqlite::Result<TournamentSummary> {
    let count: i64 = row.get(2)?;
    Ok(TournamentSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        match_count: count.max(0) as u32,
    })
}

fn appearance_from_row(row: &Row<'_>) -> rusqlite::Result<MatchAppearance> {
    let played_at_raw: String = row.get(4)?;
    let played_at = DateTime::parse_from_rfc3339(&played_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(MatchAppearance {
        player_id: row.get(0)?,
        team_id: row.get(1)?,
        match_id: row.get(2)?,
        tournament_id: row.get(3)?,
        played_at,
        role: row.get(5)?,
        goals: row.get(6)?,
        assists: row.get(7)?,
        xg: row.get(8)?,
        shots_on_target: row.get(9)?,
        shots_off_target: row.get(10)?,
        passes_attempted: row.get(11)?,
        passes_completed: row.get(12)?,
        key_passes: row.get(13)?,
        dribbles_attempted: row.get(14)?,
        dribbles_completed: row.get(15)?,
        interceptions: row.get(16)?,
        tackles_attempted: row.get(17)?,
        tackles_won: row.get(18)?,
        blocks: row.get(19)?,
        clearances: row.get(20)?,
        aerials_attempted: row.get(21)?,
        aerials_won: row.get(22)?,
        offensive_duels_won: row.get(23)?,
        offensive_duels_lost: row.get(24)?,
        crosses_attempted: row.get(25)?,
        crosses_completed: row.get(26)?,
        dribbled_past: row.get(27)?,
        saves: row.get(28)?,
        goals_conceded: row.get(29)?,
        clean_sheet: row.get(30)?,
    })
}
