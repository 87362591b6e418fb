//! Show and episode boundary types.
//!
//! The persistent metadata store itself lives outside the engine; the
//! [`Library`] trait is the contract the engine consumes, and
//! [`MemoryLibrary`] is the in-process implementation the server binary
//! and the tests run against.

mod memory;
mod types;

pub use memory::MemoryLibrary;
pub use types::*;

use std::sync::Arc;

use thiserror::Error;

/// Error type for library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Show not found: {0}")]
    ShowNotFound(i64),

    #[error("Episode not found: show {show} S{season:02}E{episode:02}")]
    EpisodeNotFound { show: i64, season: i32, episode: i32 },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// The show/episode store the engine consumes.
pub trait Library: Send + Sync {
    /// Look up a show by id.
    fn show(&self, id: ShowId) -> Result<Arc<Show>, LibraryError>;

    /// Look up a single episode.
    fn episode(&self, show: ShowId, key: EpisodeKey) -> Result<Arc<Episode>, LibraryError>;

    /// All episodes of one season, in episode order.
    fn season_episodes(&self, show: ShowId, season: i32)
        -> Result<Vec<Arc<Episode>>, LibraryError>;

    /// Persist an episode's current in-memory fields if dirty.
    fn save(&self, episode: &Episode) -> Result<(), LibraryError>;
}
