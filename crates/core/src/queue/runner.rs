//! Queue item execution.
//!
//! The worker loop claims one item at a time and hands it here. Every
//! failure path is caught and folded into `success = false`; the worker
//! must survive to process the next item.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::events::{EngineEvent, EventBus};
use crate::metrics;
use crate::provider::{ProviderKind, ProviderRegistry};
use crate::quality::{self, Quality, SearchType};
use crate::search::{ranker, SearchCoordinator, SearchResult};
use crate::snatch::SnatchExecutor;
use crate::tv::Library;

use super::{QueueItem, QueueKind, SearchQueue};

/// Executes one queue item to completion.
#[async_trait]
pub trait QueueRunner: Send + Sync {
    async fn run(&self, item: &mut QueueItem);
}

/// The real runner: coordinator for searches, executor for snatches.
pub struct SearchRunner {
    coordinator: Arc<SearchCoordinator>,
    snatcher: Arc<SnatchExecutor>,
    library: Arc<dyn Library>,
    registry: Arc<ProviderRegistry>,
    events: EventBus,
    /// Breather after each successful snatch.
    breather: Duration,
}

impl SearchRunner {
    pub fn new(
        coordinator: Arc<SearchCoordinator>,
        snatcher: Arc<SnatchExecutor>,
        library: Arc<dyn Library>,
        registry: Arc<ProviderRegistry>,
        events: EventBus,
        breather: Duration,
    ) -> Self {
        Self {
            coordinator,
            snatcher,
            library,
            registry,
            events,
            breather,
        }
    }

    fn provider_kind(&self, provider_id: &str) -> ProviderKind {
        self.registry
            .get(provider_id)
            .map(|p| p.config().kind)
            .unwrap_or(ProviderKind::Nzb)
    }

    async fn run_manual_snatch(&self, item: &mut QueueItem) {
        let Some(result) = item.snatch_result.clone() else {
            error!(item = %item.id, "manual snatch item without a result payload");
            item.success = Some(false);
            return;
        };

        let show = match self.library.show(item.show) {
            Ok(show) => show,
            Err(e) => {
                warn!(show = %item.show, error = %e, "manual snatch for unknown show");
                item.success = Some(false);
                return;
            }
        };

        let (_, preferred) = show.quality.split();
        let is_best = ranker::is_first_best_match(&result, &preferred);
        let kind = self.provider_kind(&result.provider);
        let ok = self.snatcher.snatch(kind, &result, is_best, true).await;
        item.success = Some(ok);
    }

    async fn run_search(&self, item: &mut QueueItem) {
        let show = match self.library.show(item.show) {
            Ok(show) => show,
            Err(e) => {
                warn!(show = %item.show, error = %e, "search for unknown show");
                item.success = Some(false);
                return;
            }
        };

        let manual = item.kind == QueueKind::Manual;
        let forced = item.kind == QueueKind::Forced;
        let outcome = match self
            .coordinator
            .search(&show, &item.segment, item.kind.search_type(), manual, forced)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(show = %item.show, error = %e, "search run failed");
                item.success = Some(false);
                return;
            }
        };

        if outcome.cached {
            // Manual mode: results are in the provider cache, the caller
            // polls them back out. No snatching here.
            item.success = Some(!outcome.results.is_empty());
            item.results = outcome.results;
            return;
        }

        if outcome.results.is_empty() {
            info!(show = %item.show, kind = item.kind.label(), "no results found");
            item.success = Some(false);
            return;
        }

        let (allowed, preferred) = show.quality.split();
        let search_type = item.kind.search_type();
        let forced = item.kind == QueueKind::Forced;
        let mut attempted = 0usize;
        let mut all_snatched = true;
        for result in &outcome.results {
            if !self.replacement_accepted(result, &allowed, &preferred, forced, search_type) {
                continue;
            }

            attempted += 1;
            let is_best = ranker::is_first_best_match(result, &preferred);
            let kind = self.provider_kind(&result.provider);
            let ok = self.snatcher.snatch(kind, result, is_best, false).await;
            all_snatched &= ok;

            if ok && !self.breather.is_zero() {
                tokio::time::sleep(self.breather).await;
            }
        }

        item.results = outcome.results;
        item.success = Some(attempted > 0 && all_snatched);
    }

    /// Whether every episode a result covers accepts the new quality.
    ///
    /// WANTED (and other non-quality-bearing) episodes take anything the
    /// ranker let through; episodes that already have something go
    /// through the replacement decision table.
    fn replacement_accepted(
        &self,
        result: &SearchResult,
        allowed: &[Quality],
        preferred: &[Quality],
        forced: bool,
        search_type: SearchType,
    ) -> bool {
        result.episode_keys().iter().all(|key| {
            let episode = match self.library.episode(result.show, *key) {
                Ok(ep) => ep,
                Err(_) => return false,
            };
            let snap = episode.snapshot();
            if !snap.status.bears_quality() {
                return true;
            }
            let (replace, reason) = quality::should_replace(
                snap.status,
                snap.quality,
                result.quality,
                allowed,
                preferred,
                false,
                forced,
                snap.manually_searched,
                search_type,
            );
            if !replace {
                info!(show = %result.show, key = %key, reason = %reason, "keeping current quality");
            }
            replace
        })
    }
}

#[async_trait]
impl QueueRunner for SearchRunner {
    async fn run(&self, item: &mut QueueItem) {
        let started = Instant::now();
        self.events.emit(EngineEvent::SearchStarted {
            show: item.show,
            kind: item.kind.label().to_string(),
        });

        match item.kind {
            QueueKind::ManualSnatch => self.run_manual_snatch(item).await,
            _ => self.run_search(item).await,
        }

        let success = item.success.unwrap_or(false);
        let result_label = if success {
            "found"
        } else if item.results.is_empty() {
            "empty"
        } else {
            "failed"
        };
        metrics::SEARCHES_TOTAL
            .with_label_values(&[item.kind.label(), result_label])
            .inc();
        metrics::SEARCH_DURATION
            .with_label_values(&[item.kind.label()])
            .observe(started.elapsed().as_secs_f64());

        self.events.emit(EngineEvent::SearchFinished {
            show: item.show,
            kind: item.kind.label().to_string(),
            success,
            results: item.results.len(),
        });
    }
}

/// Spawn the worker task for one queue.
///
/// The worker claims at most one item at a time, runs it to completion
/// and loops; a shutdown signal stops it after the in-flight item.
pub fn spawn_worker(
    queue: Arc<SearchQueue>,
    runner: Arc<dyn QueueRunner>,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(queue = queue.name(), "queue worker started");
        loop {
            // Drain everything currently dispatchable.
            while let Some(mut item) = queue.start_next() {
                runner.run(&mut item).await;
                queue.finish(item);
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!(queue = queue.name(), "queue worker received shutdown signal");
                    break;
                }
                _ = queue.wait_for_work() => {}
            }
        }
        info!(queue = queue.name(), "queue worker stopped");
    })
}
