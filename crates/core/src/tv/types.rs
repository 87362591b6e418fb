//! Core show/episode data types.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quality::{CombinedQuality, Quality};

/// Opaque show identifier (indexer id in the metadata store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(pub i64);

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Season/episode pair identifying one episode within a show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EpisodeKey {
    pub season: i32,
    pub episode: i32,
}

impl EpisodeKey {
    pub fn new(season: i32, episode: i32) -> Self {
        Self { season, episode }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// Lifecycle status of an episode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    Unset,
    Unaired,
    Snatched,
    Wanted,
    Downloaded,
    Skipped,
    Archived,
    Ignored,
    SnatchedProper,
    Subtitled,
    Failed,
    SnatchedBest,
}

impl EpisodeStatus {
    /// Statuses that carry a meaningful quality alongside them.
    pub fn bears_quality(self) -> bool {
        matches!(
            self,
            EpisodeStatus::Snatched
                | EpisodeStatus::SnatchedProper
                | EpisodeStatus::SnatchedBest
                | EpisodeStatus::Downloaded
                | EpisodeStatus::Archived
        )
    }

    /// Any of the three snatched variants.
    pub fn is_snatched(self) -> bool {
        matches!(
            self,
            EpisodeStatus::Snatched | EpisodeStatus::SnatchedProper | EpisodeStatus::SnatchedBest
        )
    }
}

/// A show as the search engine sees it: identity, quality settings and the
/// word lists the ranker filters against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    /// Anime shows restrict results to a release-group whitelist.
    #[serde(default)]
    pub anime: bool,
    /// Release-group whitelist, only consulted for anime shows.
    #[serde(default)]
    pub release_groups: Vec<String>,
    /// Packed allowed/preferred quality settings.
    pub quality: CombinedQuality,
    /// Results whose name matches any of these are rejected.
    #[serde(default)]
    pub ignored_words: Vec<String>,
    /// When non-empty, results must match at least one of these.
    #[serde(default)]
    pub required_words: Vec<String>,
    /// Tie-break bonus words at equal quality.
    #[serde(default)]
    pub preferred_words: Vec<String>,
    /// Tie-break malus words at equal quality.
    #[serde(default)]
    pub undesired_words: Vec<String>,
}

/// Mutable episode fields, guarded by the episode's own lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeState {
    pub status: EpisodeStatus,
    pub quality: Quality,
    /// Set when the current status came from a manual search; makes the
    /// result sticky against automatic replacement.
    #[serde(default)]
    pub manually_searched: bool,
    #[serde(default)]
    pub release_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub subtitles: Vec<String>,
    #[serde(default)]
    pub is_proper: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<DateTime<Utc>>,
    /// Explicit dirty flag; `Library::save` only persists dirty episodes.
    #[serde(skip)]
    pub dirty: bool,
}

impl EpisodeState {
    pub fn new(status: EpisodeStatus) -> Self {
        Self {
            status,
            quality: Quality::None,
            manually_searched: false,
            release_name: String::new(),
            file_size: 0,
            subtitles: Vec::new(),
            is_proper: false,
            air_date: None,
            dirty: false,
        }
    }

    /// Mark the record as needing persistence.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear download-specific metadata; a new snatch invalidates it.
    pub fn reset_transients(&mut self) {
        self.release_name.clear();
        self.file_size = 0;
        self.subtitles.clear();
        self.is_proper = false;
    }
}

/// One episode record: immutable identity plus lock-guarded state.
///
/// All status/quality mutation goes through [`Episode::update`], which
/// holds the per-episode lock for the whole read-modify-write.
#[derive(Debug)]
pub struct Episode {
    pub show: ShowId,
    pub key: EpisodeKey,
    /// Episode title, used to build provider search strings.
    pub name: String,
    state: Mutex<EpisodeState>,
}

impl Episode {
    pub fn new(show: ShowId, key: EpisodeKey, name: impl Into<String>, state: EpisodeState) -> Self {
        Self {
            show,
            key,
            name: name.into(),
            state: Mutex::new(state),
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> EpisodeState {
        self.state.lock().unwrap().clone()
    }

    /// Current status without holding the lock past the read.
    pub fn status(&self) -> EpisodeStatus {
        self.state.lock().unwrap().status
    }

    /// Current quality without holding the lock past the read.
    pub fn quality(&self) -> Quality {
        self.state.lock().unwrap().quality
    }

    /// Run a closure under the episode lock. The closure is the full
    /// read-modify-write sequence; callers must `mark_dirty` themselves.
    pub fn update<R>(&self, f: impl FnOnce(&mut EpisodeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }
}
