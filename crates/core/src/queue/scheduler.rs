//! Priority queue with single-flight admission control.
//!
//! One `SearchQueue` backs one logical queue family and admits at most
//! one Running item at a time. Finished items land in a bounded ring used
//! only for status reporting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::tv::ShowId;

use super::{ItemPhase, QueueItem, QueuePriority};

/// Finished-item ring capacity.
const HISTORY_CAP: usize = 100;

/// Error type for queue admission.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("An item for this (show, segment) is already queued or running")]
    AlreadyQueued,
}

struct Inner {
    pending: Vec<(u64, QueueItem)>,
    next_seq: u64,
    running: Option<QueueItem>,
    history: VecDeque<QueueItem>,
}

/// One logical queue family.
pub struct SearchQueue {
    name: &'static str,
    inner: Mutex<Inner>,
    notify: Notify,
    /// Minimum dispatchable priority, as `QueuePriority as u8`.
    dispatch_floor: AtomicU8,
}

impl SearchQueue {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                pending: Vec::new(),
                next_seq: 0,
                running: None,
                history: VecDeque::with_capacity(HISTORY_CAP),
            }),
            notify: Notify::new(),
            dispatch_floor: AtomicU8::new(QueuePriority::Low as u8),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueue an item, enforcing the single-flight invariant for
    /// admission-controlled kinds.
    pub fn push(&self, item: QueueItem) -> Result<String, QueueError> {
        let mut inner = self.inner.lock().unwrap();

        if item.kind.admission_controlled() {
            let key = item.segment_key();
            let duplicate = inner
                .pending
                .iter()
                .map(|(_, i)| i)
                .chain(inner.running.iter())
                .any(|existing| existing.segment_key() == key);
            if duplicate {
                warn!(
                    queue = self.name,
                    show = %item.show,
                    "dropping duplicate queue item for in-flight segment"
                );
                return Err(QueueError::AlreadyQueued);
            }
        }

        let id = item.id.clone();
        debug!(queue = self.name, show = %item.show, kind = item.kind.label(), "item enqueued");
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.pending.push((seq, item));
        drop(inner);

        self.notify.notify_one();
        Ok(id)
    }

    /// Claim the next dispatchable item, marking it Running. `None` while
    /// another item is Running or nothing clears the dispatch floor.
    pub fn start_next(&self) -> Option<QueueItem> {
        let mut inner = self.inner.lock().unwrap();
        if inner.running.is_some() {
            return None;
        }

        let floor = self.dispatch_floor.load(Ordering::Relaxed);
        // Highest priority first, FIFO within a tier.
        let best_idx = inner
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, item))| item.priority as u8 >= floor)
            .max_by_key(|(_, (seq, item))| (item.priority, std::cmp::Reverse(*seq)))
            .map(|(idx, _)| idx)?;

        let (_, mut item) = inner.pending.remove(best_idx);
        item.phase = ItemPhase::Running;
        item.started_at = Some(Utc::now());
        inner.running = Some(item.clone());
        Some(item)
    }

    /// Move the finished item into the history ring.
    pub fn finish(&self, mut item: QueueItem) {
        let mut inner = self.inner.lock().unwrap();
        item.phase = ItemPhase::Finished;
        item.finished_at = Some(Utc::now());

        if inner
            .running
            .as_ref()
            .map(|r| r.id == item.id)
            .unwrap_or(false)
        {
            inner.running = None;
        }

        if inner.history.len() >= HISTORY_CAP {
            inner.history.pop_front();
        }
        inner.history.push_back(item);
        drop(inner);

        // A slot freed up; wake the worker for the next item.
        self.notify.notify_one();
    }

    /// Raise the dispatch floor above the backlog tier.
    pub fn pause_backlog(&self) {
        self.dispatch_floor
            .store(QueuePriority::Normal as u8, Ordering::Relaxed);
    }

    /// Restore the dispatch floor.
    pub fn resume_backlog(&self) {
        self.dispatch_floor
            .store(QueuePriority::Low as u8, Ordering::Relaxed);
        self.notify.notify_one();
    }

    pub fn backlog_paused(&self) -> bool {
        self.dispatch_floor.load(Ordering::Relaxed) > QueuePriority::Low as u8
    }

    /// Wait until an item is enqueued or a slot frees up.
    pub async fn wait_for_work(&self) {
        self.notify.notified().await;
    }

    /// Number of pending items.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Clones of every item in the queue, for status reporting:
    /// pending, running, then finished history (oldest first).
    pub fn snapshot(&self) -> Vec<QueueItem> {
        let inner = self.inner.lock().unwrap();
        inner
            .pending
            .iter()
            .map(|(_, item)| item.clone())
            .chain(inner.running.iter().cloned())
            .chain(inner.history.iter().cloned())
            .collect()
    }

    /// Items touching the given show.
    pub fn snapshot_for_show(&self, show: ShowId) -> Vec<QueueItem> {
        self.snapshot()
            .into_iter()
            .filter(|item| item.show == show)
            .collect()
    }

    /// Look up an item anywhere in the queue.
    pub fn find(&self, id: &str) -> Option<QueueItem> {
        self.snapshot().into_iter().find(|item| item.id == id)
    }

    /// Block until the item finishes, polling at 1-second intervals.
    /// Returns its success flag, or `None` on timeout / unknown id.
    pub async fn wait_for(&self, id: &str, timeout: Duration) -> Option<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find(id) {
                Some(item) if item.phase == ItemPhase::Finished => return item.success,
                Some(_) => {}
                None => return None,
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}
