//! Snatch/download history and failed-download tracking.

mod sqlite;

pub use sqlite::SqliteHistoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quality::Quality;
use crate::tv::{EpisodeKey, ShowId};

/// Error type for history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Which status a history row recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Snatched,
    SnatchedProper,
    SnatchedBest,
    Downloaded,
}

/// One history row; snatches write one per episode covered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub show: ShowId,
    pub key: EpisodeKey,
    pub action: HistoryAction,
    pub title: String,
    pub provider: String,
    pub quality: Quality,
    pub size_bytes: u64,
    pub date: DateTime<Utc>,
}

/// History/failed-history collaborator contract.
pub trait HistoryStore: Send + Sync {
    /// Persist one snatch row.
    fn log_snatch(&self, record: &HistoryRecord) -> Result<(), HistoryError>;

    /// Persist a confirmed-download row (written by post-processing).
    fn log_download(
        &self,
        show: ShowId,
        key: EpisodeKey,
        release_name: &str,
        quality: Quality,
    ) -> Result<(), HistoryError>;

    /// Whether a release previously failed to download.
    fn has_failed(&self, release_name: &str, size: u64, provider: &str)
        -> Result<bool, HistoryError>;

    /// Record a failed download so future searches skip the release.
    fn mark_failed(
        &self,
        release_name: &str,
        size: u64,
        provider: &str,
    ) -> Result<(), HistoryError>;
}
