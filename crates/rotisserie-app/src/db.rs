// SQLite persistence for draft snapshots and finished-draft history.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use rotisserie_core::{DraftSnapshot, Player};

/// SQLite-backed persistence for engine snapshots, keyed by draft table.
pub struct Database {
    conn: Mutex<Connection>,
}

/// A snapshot as read back from the database.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub snapshot: DraftSnapshot,
    pub saved_at: DateTime<Utc>,
}

/// One player's deck in a finished draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decklist {
    pub player: Player,
    pub list: String,
}

impl Decklist {
    /// File name for this deck, `<name>_<id>.txt`. Anything outside
    /// `[A-Za-z0-9_-]` is replaced with `_`, so the result never leaves the
    /// directory it is joined onto; the id keeps same-named players apart.
    pub fn file_name(&self) -> String {
        fn clean(raw: &str) -> String {
            raw.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect()
        }
        format!("{}_{}.txt", clean(&self.player.name), clean(&self.player.id.0))
    }
}

/// A completed draft, kept after the live snapshot is cleared.
#[derive(Debug, Clone)]
pub struct FinishedDraft {
    pub finished_at: DateTime<Utc>,
    pub decklists: Vec<Decklist>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_snapshots (
                draft_key  TEXT PRIMARY KEY,
                snapshot   TEXT NOT NULL,
                saved_at   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS finished_drafts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                draft_key   TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                decklists   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_finished_drafts_key ON finished_drafts(draft_key);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Store the latest snapshot for `draft_key`, replacing any previous one.
    pub fn save_snapshot(&self, draft_key: &str, snapshot: &DraftSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).context("failed to serialize snapshot")?;
        let now = Utc::now().to_rfc3339();
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO draft_snapshots (draft_key, snapshot, saved_at)
                 VALUES (?1, ?2, ?3)",
                params![draft_key, json, now],
            )
            .context("failed to save snapshot")?;
        Ok(())
    }

    /// Load the snapshot for `draft_key`. Returns `None` if nothing was saved.
    pub fn load_snapshot(&self, draft_key: &str) -> Result<Option<StoredSnapshot>> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT snapshot, saved_at FROM draft_snapshots WHERE draft_key = ?1",
                params![draft_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query snapshot")?;

        let Some((json, saved_at)) = row else {
            return Ok(None);
        };
        let snapshot: DraftSnapshot =
            serde_json::from_str(&json).context("failed to deserialize snapshot")?;
        let saved_at = parse_timestamp(&saved_at)?;
        Ok(Some(StoredSnapshot { snapshot, saved_at }))
    }

    pub fn clear_snapshot(&self, draft_key: &str) -> Result<()> {
        self.conn()?
            .execute(
                "DELETE FROM draft_snapshots WHERE draft_key = ?1",
                params![draft_key],
            )
            .context("failed to clear snapshot")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Finished drafts
    // ------------------------------------------------------------------

    /// Archive the decklists of a finished draft.
    pub fn record_finished(&self, draft_key: &str, decklists: &[Decklist]) -> Result<()> {
        let json = serde_json::to_string(decklists).context("failed to serialize decklists")?;
        let now = Utc::now().to_rfc3339();
        self.conn()?
            .execute(
                "INSERT INTO finished_drafts (draft_key, finished_at, decklists)
                 VALUES (?1, ?2, ?3)",
                params![draft_key, now, json],
            )
            .context("failed to record finished draft")?;
        Ok(())
    }

    /// Finished drafts for `draft_key`, oldest first.
    pub fn finished_drafts(&self, draft_key: &str) -> Result<Vec<FinishedDraft>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT finished_at, decklists FROM finished_drafts
                 WHERE draft_key = ?1 ORDER BY id",
            )
            .context("failed to prepare finished_drafts query")?;

        let rows = stmt
            .query_map(params![draft_key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("failed to query finished drafts")?;

        let mut drafts = Vec::new();
        for row in rows {
            let (finished_at, json) = row.context("failed to read finished draft row")?;
            drafts.push(FinishedDraft {
                finished_at: parse_timestamp(&finished_at)?,
                decklists: serde_json::from_str(&json)
                    .context("failed to deserialize decklists")?,
            });
        }
        Ok(drafts)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp {raw}"))
}
