//! SQLite-backed cell storage.
//! Keeps pending message content off the heap. One row per content key with a
//! wall-clock expiry so rows orphaned by a failed removal are still purged.
//! Rows never survive a restart: their in-memory cells are gone with the process.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::CellBackend;
use crate::dialog::ContentKey;
use crate::error::WorkflowError;

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, WorkflowError> {
        let conn = Connection::open(db_path)?;
        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let backend = Self::init(conn)?;
        info!(path = %db_path.display(), "SQLite cell backend opened");
        Ok(backend)
    }

    pub fn open_in_memory() -> Result<Self, WorkflowError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, WorkflowError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS content_cells (
                cell_key TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cells_expires
                ON content_cells(expires_at);",
        )?;
        let stale = conn.execute("DELETE FROM content_cells", [])?;
        if stale > 0 {
            info!(removed = stale, "discarded cells from a previous run");
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Remove rows past their wall-clock expiry.
    pub fn purge_expired(&self) -> Result<usize, WorkflowError> {
        let conn = self.conn.lock();
        let count = conn.execute(
            "DELETE FROM content_cells WHERE expires_at <= ?1",
            params![now_unix()],
        )?;
        if count > 0 {
            info!(removed = count, "cell backend purge");
        }
        Ok(count)
    }

    /// Purge periodically on the tokio runtime.
    pub fn start_purge_loop(backend: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = backend.purge_expired() {
                    warn!(error = %e, "cell backend purge failed");
                }
            }
        })
    }

    pub fn row_count(&self) -> Result<usize, WorkflowError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM content_cells", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl CellBackend for SqliteBackend {
    fn write(&self, key: &ContentKey, value: &str, ttl: Duration) -> Result<(), WorkflowError> {
        let conn = self.conn.lock();
        let expires_at = expiry_after(ttl);
        conn.execute(
            "INSERT OR REPLACE INTO content_cells (cell_key, content, expires_at)
             VALUES (?1, ?2, ?3)",
            params![key.to_string(), value, expires_at],
        )?;
        Ok(())
    }

    fn read(&self, key: &ContentKey) -> Result<Option<String>, WorkflowError> {
        let conn = self.conn.lock();
        let content = conn
            .query_row(
                "SELECT content FROM content_cells WHERE cell_key = ?1",
                params![key.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if content.is_some() {
            debug!(key = %key, "cell backend hit");
        }
        Ok(content)
    }

    fn remove(&self, key: &ContentKey) -> Result<(), WorkflowError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM content_cells WHERE cell_key = ?1",
            params![key.to_string()],
        )?;
        Ok(())
    }
}

/// Wall-clock expiry for a row written now, rounded up so the row never
/// expires before its cell. Saturates instead of overflowing.
fn expiry_after(ttl: Duration) -> i64 {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let round_up = i64::from(ttl.subsec_nanos() > 0);
    now_unix().saturating_add(secs).saturating_add(round_up)
}

/// Current time as Unix timestamp (seconds).
fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
