//! In-memory library implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::{Episode, EpisodeKey, Library, LibraryError, Show, ShowId};

struct ShowEntry {
    show: Arc<Show>,
    episodes: BTreeMap<EpisodeKey, Arc<Episode>>,
}

/// In-process show/episode store.
///
/// `save` is a no-op beyond clearing the dirty flag since the records live
/// in place; the trait round-trip still exercises the same contract a
/// database-backed library would.
#[derive(Default)]
pub struct MemoryLibrary {
    shows: RwLock<HashMap<i64, ShowEntry>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a show with its episodes. Replaces any existing entry.
    pub fn add_show(&self, show: Show, episodes: Vec<Episode>) {
        let id = show.id;
        let entry = ShowEntry {
            show: Arc::new(show),
            episodes: episodes
                .into_iter()
                .map(|ep| (ep.key, Arc::new(ep)))
                .collect(),
        };
        self.shows.write().unwrap().insert(id.0, entry);
    }

    /// All registered shows.
    pub fn shows(&self) -> Vec<Arc<Show>> {
        let shows = self.shows.read().unwrap();
        let mut out: Vec<_> = shows.values().map(|e| Arc::clone(&e.show)).collect();
        out.sort_by_key(|s| s.id);
        out
    }
}

impl Library for MemoryLibrary {
    fn show(&self, id: ShowId) -> Result<Arc<Show>, LibraryError> {
        let shows = self.shows.read().unwrap();
        shows
            .get(&id.0)
            .map(|e| Arc::clone(&e.show))
            .ok_or(LibraryError::ShowNotFound(id.0))
    }

    fn episode(&self, show: ShowId, key: EpisodeKey) -> Result<Arc<Episode>, LibraryError> {
        let shows = self.shows.read().unwrap();
        let entry = shows.get(&show.0).ok_or(LibraryError::ShowNotFound(show.0))?;
        entry
            .episodes
            .get(&key)
            .map(Arc::clone)
            .ok_or(LibraryError::EpisodeNotFound {
                show: show.0,
                season: key.season,
                episode: key.episode,
            })
    }

    fn season_episodes(
        &self,
        show: ShowId,
        season: i32,
    ) -> Result<Vec<Arc<Episode>>, LibraryError> {
        let shows = self.shows.read().unwrap();
        let entry = shows.get(&show.0).ok_or(LibraryError::ShowNotFound(show.0))?;
        Ok(entry
            .episodes
            .range(EpisodeKey::new(season, 0)..EpisodeKey::new(season + 1, 0))
            .map(|(_, ep)| Arc::clone(ep))
            .collect())
    }

    fn save(&self, episode: &Episode) -> Result<(), LibraryError> {
        episode.update(|state| state.dirty = false);
        Ok(())
    }
}
