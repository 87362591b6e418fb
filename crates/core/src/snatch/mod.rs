//! Snatch execution.
//!
//! Commits a chosen result: dispatch the download, transition every
//! covered episode's status under its lock, write history, emit events.
//! Only the dispatch step can fail the snatch; later side effects are
//! logged and swallowed so an already-started download is never reported
//! as failed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::download::DownloadDispatcher;
use crate::events::{EngineEvent, EventBus};
use crate::history::{HistoryAction, HistoryRecord, HistoryStore};
use crate::metrics;
use crate::provider::ProviderKind;
use crate::search::SearchResult;
use crate::tv::{EpisodeStatus, Library};

/// Executes snatch decisions.
pub struct SnatchExecutor {
    library: Arc<dyn Library>,
    history: Arc<dyn HistoryStore>,
    dispatcher: Arc<DownloadDispatcher>,
    events: EventBus,
    /// When set, a deferred watchlist-sync side effect is queued per snatch.
    watchlist_sync: bool,
}

impl SnatchExecutor {
    pub fn new(
        library: Arc<dyn Library>,
        history: Arc<dyn HistoryStore>,
        dispatcher: Arc<DownloadDispatcher>,
        events: EventBus,
        watchlist_sync: bool,
    ) -> Self {
        Self {
            library,
            history,
            dispatcher,
            events,
            watchlist_sync,
        }
    }

    /// Snatch one result.
    ///
    /// `true` iff the download dispatch succeeded; no episode status is
    /// mutated otherwise. `manual` marks the episodes as manually
    /// searched, `is_first_best` selects SNATCHED_BEST over SNATCHED.
    pub async fn snatch(
        &self,
        kind: ProviderKind,
        result: &SearchResult,
        is_first_best: bool,
        manual: bool,
    ) -> bool {
        if result.episodes.is_empty() {
            warn!(title = %result.title, "refusing to snatch result without episode references");
            return false;
        }

        match self.dispatcher.dispatch(kind, result).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(title = %result.title, "download mechanism refused the result");
                self.report_failure(result, "download refused");
                return false;
            }
            Err(e) => {
                warn!(title = %result.title, error = %e, "download dispatch failed");
                self.report_failure(result, &e.to_string());
                return false;
            }
        }

        let new_status = if result.is_proper() {
            EpisodeStatus::SnatchedProper
        } else if is_first_best {
            EpisodeStatus::SnatchedBest
        } else {
            EpisodeStatus::Snatched
        };

        for key in result.episode_keys() {
            let episode = match self.library.episode(result.show, key) {
                Ok(ep) => ep,
                Err(e) => {
                    warn!(show = %result.show, key = %key, error = %e, "snatched episode missing from library");
                    continue;
                }
            };

            // Whole read-modify-write under the episode's own lock.
            let old_status = episode.update(|state| {
                let old = state.status;
                state.status = new_status;
                state.quality = result.quality;
                state.manually_searched = manual;
                state.reset_transients();
                state.is_proper = result.is_proper();
                state.mark_dirty();
                old
            });

            if let Err(e) = self.library.save(&episode) {
                warn!(show = %result.show, key = %key, error = %e, "failed to persist episode status");
            }

            self.events.emit(EngineEvent::EpisodeStatusChanged {
                show: result.show,
                season: key.season,
                episode: key.episode,
                from: old_status,
                to: new_status,
            });

            let record = HistoryRecord {
                show: result.show,
                key,
                action: match new_status {
                    EpisodeStatus::SnatchedProper => HistoryAction::SnatchedProper,
                    EpisodeStatus::SnatchedBest => HistoryAction::SnatchedBest,
                    _ => HistoryAction::Snatched,
                },
                title: result.title.clone(),
                provider: result.provider.clone(),
                quality: result.quality,
                size_bytes: result.size_bytes,
                date: Utc::now(),
            };
            if let Err(e) = self.history.log_snatch(&record) {
                warn!(show = %result.show, key = %key, error = %e, "failed to write history row");
            }
        }

        let status_label = match new_status {
            EpisodeStatus::SnatchedProper => "snatched_proper",
            EpisodeStatus::SnatchedBest => "snatched_best",
            _ => "snatched",
        };
        metrics::SNATCHES_TOTAL.with_label_values(&[status_label]).inc();
        self.events.emit(EngineEvent::ResultSnatched {
            show: result.show,
            title: result.title.clone(),
            provider: result.provider.clone(),
            quality: result.quality,
            status: status_label.to_string(),
        });

        if self.watchlist_sync {
            // Deferred side effect; failures downstream are non-fatal.
            self.events.emit(EngineEvent::WatchlistQueued {
                show: result.show,
                title: result.title.clone(),
            });
        }

        info!(title = %result.title, status = status_label, "snatch committed");
        true
    }

    fn report_failure(&self, result: &SearchResult, reason: &str) {
        metrics::SNATCHES_TOTAL.with_label_values(&["failed"]).inc();
        self.events.emit(EngineEvent::SnatchFailed {
            show: result.show,
            title: result.title.clone(),
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SqliteHistoryStore;
    use crate::quality::Quality;
    use crate::testing::{fixtures, MockDownloadClient};
    use crate::tv::{EpisodeKey, MemoryLibrary, ShowId};

    fn executor(
        library: Arc<MemoryLibrary>,
        client: MockDownloadClient,
    ) -> SnatchExecutor {
        SnatchExecutor::new(
            library,
            Arc::new(SqliteHistoryStore::in_memory().unwrap()),
            Arc::new(DownloadDispatcher::with_client(Arc::new(client))),
            EventBus::default(),
            false,
        )
    }

    #[tokio::test]
    async fn test_snatch_success_transitions_status() {
        let library = Arc::new(fixtures::library_with_wanted_show(1, 1, 3));
        let exec = executor(Arc::clone(&library), MockDownloadClient::accepting());

        let result = fixtures::hdtv_result("Show.S01E02.720p.HDTV.x264-GRP", 1, vec![2]);
        assert!(exec.snatch(ProviderKind::Nzb, &result, false, false).await);

        let ep = library.episode(ShowId(1), EpisodeKey::new(1, 2)).unwrap();
        assert_eq!(ep.status(), EpisodeStatus::Snatched);
        assert_eq!(ep.quality(), Quality::Hdtv);
    }

    #[tokio::test]
    async fn test_snatch_proper_and_best_statuses() {
        let library = Arc::new(fixtures::library_with_wanted_show(1, 1, 3));
        let exec = executor(Arc::clone(&library), MockDownloadClient::accepting());

        let mut proper = fixtures::hdtv_result("Show.S01E01.PROPER.720p-GRP", 1, vec![1]);
        proper.proper_tags = vec!["proper".to_string()];
        assert!(exec.snatch(ProviderKind::Nzb, &proper, true, false).await);
        let ep = library.episode(ShowId(1), EpisodeKey::new(1, 1)).unwrap();
        // Proper wins over first-best.
        assert_eq!(ep.status(), EpisodeStatus::SnatchedProper);

        let best = fixtures::hdtv_result("Show.S01E02.720p-GRP", 1, vec![2]);
        assert!(exec.snatch(ProviderKind::Nzb, &best, true, false).await);
        let ep = library.episode(ShowId(1), EpisodeKey::new(1, 2)).unwrap();
        assert_eq!(ep.status(), EpisodeStatus::SnatchedBest);
    }

    #[tokio::test]
    async fn test_failed_dispatch_leaves_status_untouched() {
        let library = Arc::new(fixtures::library_with_wanted_show(1, 1, 3));
        let exec = executor(Arc::clone(&library), MockDownloadClient::refusing());

        let result = fixtures::hdtv_result("Show.S01E01.720p.HDTV-GRP", 1, vec![1]);
        assert!(!exec.snatch(ProviderKind::Nzb, &result, false, false).await);

        let ep = library.episode(ShowId(1), EpisodeKey::new(1, 1)).unwrap();
        assert_eq!(ep.status(), EpisodeStatus::Wanted);
    }

    #[tokio::test]
    async fn test_snatch_without_episodes_refused() {
        let library = Arc::new(fixtures::library_with_wanted_show(1, 1, 3));
        let exec = executor(Arc::clone(&library), MockDownloadClient::accepting());

        let pack = fixtures::hdtv_result("Show.S01.720p.HDTV-GRP", 1, vec![]);
        assert!(!exec.snatch(ProviderKind::Nzb, &pack, false, false).await);
    }

    #[tokio::test]
    async fn test_manual_snatch_sets_sticky_flag() {
        let library = Arc::new(fixtures::library_with_wanted_show(1, 1, 3));
        let exec = executor(Arc::clone(&library), MockDownloadClient::accepting());

        let result = fixtures::hdtv_result("Show.S01E03.720p.HDTV-GRP", 1, vec![3]);
        assert!(exec.snatch(ProviderKind::Nzb, &result, false, true).await);

        let ep = library.episode(ShowId(1), EpisodeKey::new(1, 3)).unwrap();
        assert!(ep.snapshot().manually_searched);
    }
}
