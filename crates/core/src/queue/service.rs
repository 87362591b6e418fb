//! The queue service: one handle owning every queue family and its
//! worker, plus the status and pick-and-snatch APIs callers poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::search::{CacheError, ResultCache};
use crate::tv::{EpisodeKey, ShowId};

use super::runner::{spawn_worker, QueueRunner};
use super::{ItemPhase, QueueError, QueueItem, QueueKind, SearchQueue};

/// Error type for the pick-and-snatch API.
#[derive(Debug, Error)]
pub enum PickError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Cached result has no episode references")]
    NoEpisodes,

    #[error("Timed out waiting for the snatch to finish")]
    Timeout,
}

/// One queue item as reported to status callers.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusEntry {
    pub show: ShowId,
    pub segment: Vec<EpisodeKey>,
    pub kind: QueueKind,
    /// "queued", "searching" or "finished".
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// Owns the four queue families and their workers.
pub struct SearchService {
    /// Forced / Manual / FailedRetry items.
    pub search_queue: Arc<SearchQueue>,
    pub daily_queue: Arc<SearchQueue>,
    pub backlog_queue: Arc<SearchQueue>,
    pub snatch_queue: Arc<SearchQueue>,
    runner: Arc<dyn QueueRunner>,
    cache: Arc<ResultCache>,
    /// Breather on a manual-search cache miss.
    breather: Duration,
    shutdown_tx: broadcast::Sender<()>,
    running: AtomicBool,
}

impl SearchService {
    pub fn new(runner: Arc<dyn QueueRunner>, cache: Arc<ResultCache>, breather: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            search_queue: Arc::new(SearchQueue::new("search")),
            daily_queue: Arc::new(SearchQueue::new("daily")),
            backlog_queue: Arc::new(SearchQueue::new("backlog")),
            snatch_queue: Arc::new(SearchQueue::new("snatch")),
            runner,
            cache,
            breather,
            shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Spawn one worker per queue family.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("search service already running");
            return;
        }
        info!("starting search service workers");
        for queue in [
            &self.search_queue,
            &self.daily_queue,
            &self.backlog_queue,
            &self.snatch_queue,
        ] {
            spawn_worker(
                Arc::clone(queue),
                Arc::clone(&self.runner),
                self.shutdown_tx.subscribe(),
            );
        }
    }

    /// Signal every worker to stop after its in-flight item.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("stopping search service workers");
        let _ = self.shutdown_tx.send(());
    }

    fn queue_for(&self, kind: QueueKind) -> &Arc<SearchQueue> {
        match kind {
            QueueKind::Daily => &self.daily_queue,
            QueueKind::Backlog => &self.backlog_queue,
            QueueKind::ManualSnatch => &self.snatch_queue,
            QueueKind::Forced | QueueKind::Manual | QueueKind::FailedRetry => &self.search_queue,
        }
    }

    /// Route an item to its queue family.
    pub fn enqueue(&self, item: QueueItem) -> Result<String, QueueError> {
        self.queue_for(item.kind).push(item)
    }

    /// Enqueue a manual search; sleeps the breather so the worker can
    /// claim the item before the caller starts polling the cache.
    pub async fn manual_search(
        &self,
        show: ShowId,
        segment: Vec<EpisodeKey>,
    ) -> Result<String, QueueError> {
        let id = self.enqueue(QueueItem::new(QueueKind::Manual, show, segment))?;
        if !self.breather.is_zero() {
            tokio::time::sleep(self.breather).await;
        }
        Ok(id)
    }

    /// Keep backlog items queued without dispatching them.
    pub fn pause_backlog(&self) {
        self.backlog_queue.pause_backlog();
    }

    pub fn resume_backlog(&self) {
        self.backlog_queue.resume_backlog();
    }

    pub fn backlog_paused(&self) -> bool {
        self.backlog_queue.backlog_paused()
    }

    /// Queued/searching/finished view of one show across the forced/
    /// manual and snatch queues. A segment already represented by an
    /// active entry is not duplicated from the finished history.
    pub fn show_status(&self, show: ShowId) -> Vec<QueueStatusEntry> {
        let mut entries = Vec::new();
        let mut active_keys: Vec<(ShowId, Vec<EpisodeKey>)> = Vec::new();

        for queue in [&self.search_queue, &self.snatch_queue] {
            for item in queue.snapshot_for_show(show) {
                let status = match item.phase {
                    ItemPhase::Queued => "queued",
                    ItemPhase::Running => "searching",
                    ItemPhase::Finished => "finished",
                };

                let key = item.segment_key();
                if item.phase == ItemPhase::Finished {
                    if active_keys.contains(&key) {
                        continue;
                    }
                } else {
                    active_keys.push(key);
                }

                entries.push(QueueStatusEntry {
                    show: item.show,
                    segment: item.segment,
                    kind: item.kind,
                    status,
                    success: item.success,
                });
            }
        }

        entries
    }

    /// Cached manual-search rows for a show, best first.
    pub fn cached_results(
        &self,
        show: ShowId,
        season: i32,
        episode: Option<i32>,
    ) -> Result<Vec<crate::search::CachedResult>, CacheError> {
        self.cache.query(show, season, episode)
    }

    /// Materialize a cached result, enqueue its snatch and block until
    /// the item reports success or failure.
    pub async fn pick_and_snatch(
        &self,
        provider: &str,
        rowid: i64,
        timeout: Duration,
    ) -> Result<bool, PickError> {
        let cached = self.cache.get(provider, rowid)?;
        let segment = cached.result.episode_keys();
        if segment.is_empty() {
            return Err(PickError::NoEpisodes);
        }

        let item = QueueItem::manual_snatch(cached.result.show, segment, cached.result);
        let id = self.snatch_queue.push(item)?;

        match self.snatch_queue.wait_for(&id, timeout).await {
            Some(success) => Ok(success),
            None => Err(PickError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use async_trait::async_trait;

    /// Runner that instantly succeeds.
    struct NoopRunner;

    #[async_trait]
    impl QueueRunner for NoopRunner {
        async fn run(&self, item: &mut QueueItem) {
            item.success = Some(true);
        }
    }

    fn service() -> SearchService {
        SearchService::new(
            Arc::new(NoopRunner),
            Arc::new(ResultCache::in_memory().unwrap()),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_enqueue_routes_by_kind() {
        let service = service();
        service
            .enqueue(QueueItem::new(QueueKind::Daily, ShowId(1), vec![]))
            .unwrap();
        service
            .enqueue(fixtures::backlog_item(2, 1, &[1]))
            .unwrap();
        service
            .enqueue(QueueItem::new(
                QueueKind::Forced,
                ShowId(3),
                vec![EpisodeKey::new(1, 1)],
            ))
            .unwrap();

        assert_eq!(service.daily_queue.pending_len(), 1);
        assert_eq!(service.backlog_queue.pending_len(), 1);
        assert_eq!(service.search_queue.pending_len(), 1);
        assert_eq!(service.snatch_queue.pending_len(), 0);
    }

    #[test]
    fn test_show_status_dedups_history() {
        let service = service();
        let queue = &service.search_queue;

        // A finished run for the same segment as a queued one.
        queue
            .push(QueueItem::new(
                QueueKind::Forced,
                ShowId(1),
                vec![EpisodeKey::new(1, 1)],
            ))
            .unwrap();
        let mut done = queue.start_next().unwrap();
        done.success = Some(true);
        queue.finish(done);

        queue
            .push(QueueItem::new(
                QueueKind::Forced,
                ShowId(1),
                vec![EpisodeKey::new(1, 1)],
            ))
            .unwrap();

        let entries = service.show_status(ShowId(1));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "queued");
    }

    #[test]
    fn test_show_status_includes_finished() {
        let service = service();
        let queue = &service.search_queue;

        queue
            .push(QueueItem::new(
                QueueKind::Manual,
                ShowId(1),
                vec![EpisodeKey::new(1, 2)],
            ))
            .unwrap();
        let mut done = queue.start_next().unwrap();
        done.success = Some(false);
        queue.finish(done);

        let entries = service.show_status(ShowId(1));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "finished");
        assert_eq!(entries[0].success, Some(false));
    }

    #[tokio::test]
    async fn test_pick_and_snatch_round_trip() {
        let cache = Arc::new(ResultCache::in_memory().unwrap());
        let result = fixtures::hdtv_result("Show.S01E01.720p.HDTV.x264-GRP", 1, vec![1]);
        cache.put("geek", &[result]).unwrap();
        let rows = cache.query(ShowId(1), 1, Some(1)).unwrap();

        let service = SearchService::new(Arc::new(NoopRunner), cache, Duration::ZERO);
        service.start();

        let success = service
            .pick_and_snatch("geek", rows[0].rowid, Duration::from_secs(10))
            .await
            .unwrap();
        assert!(success);

        service.stop();
    }

    #[tokio::test]
    async fn test_pick_and_snatch_unknown_row() {
        let service = service();
        let err = service
            .pick_and_snatch("geek", 1, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PickError::Cache(_)));
    }
}
