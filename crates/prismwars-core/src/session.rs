// SQLite persistence for the resumable session record.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

/// The only key the client ever stores a session under.
pub const SESSION_KEY: &str = "prismwars_session";

/// Records older than this are treated as absent.
pub const DEFAULT_FRESHNESS_HOURS: i64 = 6;

/// Enough to rejoin a game after a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub game_id: String,
    pub player_id: String,
    pub display_name: String,
    pub last_active: DateTime<Utc>,
}

/// Default database location in the platform data directory.
pub fn default_db_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "prismwars").map(|dirs| dirs.data_dir().join("session.db"))
}

pub struct SessionStore {
    conn: Mutex<Connection>,
    freshness: Duration,
}

impl SessionStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_freshness(path, DEFAULT_FRESHNESS_HOURS)
    }

    pub fn open_with_freshness(path: &str, freshness_hours: i64) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open session database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sessions (
                storage_key  TEXT PRIMARY KEY,
                game_id      TEXT NOT NULL,
                player_id    TEXT NOT NULL,
                display_name TEXT NOT NULL,
                last_active  INTEGER NOT NULL
            );
            ",
        )
        .context("failed to create session schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            freshness: Duration::hours(freshness_hours),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn save(&self, game_id: &str, player_id: &str, display_name: &str) -> Result<()> {
        self.save_at(game_id, player_id, display_name, Utc::now())
    }

    pub fn save_at(
        &self,
        game_id: &str,
        player_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO sessions
                    (storage_key, game_id, player_id, display_name, last_active)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    SESSION_KEY,
                    game_id,
                    player_id,
                    display_name,
                    now.timestamp_millis()
                ],
            )
            .context("failed to save session")?;
        info!("saved session for game {game_id} as {player_id}");
        Ok(())
    }

    /// Load the record if it is still fresh. A stale record is deleted and
    /// reported as absent.
    pub fn load(&self) -> Result<Option<SessionRecord>> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Result<Option<SessionRecord>> {
        let row = self
            .conn()
            .query_row(
                "SELECT game_id, player_id, display_name, last_active
                 FROM sessions WHERE storage_key = ?1",
                params![SESSION_KEY],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()
            .context("failed to query session")?;

        let Some((game_id, player_id, display_name, millis)) = row else {
            return Ok(None);
        };
        let last_active = DateTime::<Utc>::from_timestamp_millis(millis)
            .context("session has an out-of-range timestamp")?;

        if now - last_active > self.freshness {
            info!("discarding stale session for game {game_id}");
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(SessionRecord {
            game_id,
            player_id,
            display_name,
            last_active,
        }))
    }

    /// Refresh the activity timestamp. Returns false when there is no record.
    pub fn touch(&self) -> Result<bool> {
        self.touch_at(Utc::now())
    }

    pub fn touch_at(&self, now: DateTime<Utc>) -> Result<bool> {
        let updated = self
            .conn()
            .execute(
                "UPDATE sessions SET last_active = ?1 WHERE storage_key = ?2",
                params![now.timestamp_millis(), SESSION_KEY],
            )
            .context("failed to touch session")?;
        debug!("session touched ({updated} row)");
        Ok(updated > 0)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn()
            .execute(
                "DELETE FROM sessions WHERE storage_key = ?1",
                params![SESSION_KEY],
            )
            .context("failed to clear session")?;
        Ok(())
    }
}
