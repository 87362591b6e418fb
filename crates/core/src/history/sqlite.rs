//! SQLite-backed history store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::quality::Quality;
use crate::tv::{EpisodeKey, ShowId};

use super::{HistoryAction, HistoryError, HistoryRecord, HistoryStore};

/// SQLite-backed history/failed-history store.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (and initialize) the history database at the given path.
    pub fn new(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path).map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, for tests.
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), HistoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                show INTEGER NOT NULL,
                season INTEGER NOT NULL,
                episode INTEGER NOT NULL,
                action TEXT NOT NULL,
                title TEXT NOT NULL,
                provider TEXT NOT NULL,
                quality INTEGER NOT NULL,
                size INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_show ON history(show, season, episode);

            CREATE TABLE IF NOT EXISTS failed (
                release_name TEXT NOT NULL,
                size INTEGER NOT NULL,
                provider TEXT NOT NULL,
                date TEXT NOT NULL,
                UNIQUE(release_name, size, provider)
            );
            "#,
        )
        .map_err(|e| HistoryError::Database(e.to_string()))
    }

    fn action_str(action: HistoryAction) -> &'static str {
        match action {
            HistoryAction::Snatched => "snatched",
            HistoryAction::SnatchedProper => "snatched_proper",
            HistoryAction::SnatchedBest => "snatched_best",
            HistoryAction::Downloaded => "downloaded",
        }
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn log_snatch(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO history (date, show, season, episode, action, title, provider, quality, size) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.date.to_rfc3339(),
                record.show.0,
                record.key.season,
                record.key.episode,
                Self::action_str(record.action),
                record.title,
                record.provider,
                record.quality.as_bits(),
                record.size_bytes,
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(())
    }

    fn log_download(
        &self,
        show: ShowId,
        key: EpisodeKey,
        release_name: &str,
        quality: Quality,
    ) -> Result<(), HistoryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO history (date, show, season, episode, action, title, provider, quality, size) VALUES (?, ?, ?, ?, ?, ?, '', ?, 0)",
            params![
                Utc::now().to_rfc3339(),
                show.0,
                key.season,
                key.episode,
                Self::action_str(HistoryAction::Downloaded),
                release_name,
                quality.as_bits(),
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(())
    }

    fn has_failed(
        &self,
        release_name: &str,
        size: u64,
        provider: &str,
    ) -> Result<bool, HistoryError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM failed WHERE release_name = ? AND size = ? AND provider = ?",
                params![release_name, size, provider],
                |row| row.get(0),
            )
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    fn mark_failed(
        &self,
        release_name: &str,
        size: u64,
        provider: &str,
    ) -> Result<(), HistoryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO failed (release_name, size, provider, date) VALUES (?, ?, ?, ?)",
            params![release_name, size, provider, Utc::now().to_rfc3339()],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(())
    }
}
