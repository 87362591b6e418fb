//! Engine event bus.
//!
//! Fire-and-forget broadcast of engine happenings; notification dispatch
//! and UI push channels subscribe here. Emitting never blocks and never
//! fails, with or without receivers.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::quality::Quality;
use crate::tv::{EpisodeStatus, ShowId};

/// Events emitted by the search engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SearchStarted {
        show: ShowId,
        kind: String,
    },
    SearchFinished {
        show: ShowId,
        kind: String,
        success: bool,
        results: usize,
    },
    ResultSnatched {
        show: ShowId,
        title: String,
        provider: String,
        quality: Quality,
        status: String,
    },
    SnatchFailed {
        show: ShowId,
        title: String,
        reason: String,
    },
    ProviderError {
        provider: String,
        error: String,
    },
    EpisodeStatusChanged {
        show: ShowId,
        season: i32,
        episode: i32,
        from: EpisodeStatus,
        to: EpisodeStatus,
    },
    /// Deferred watchlist-sync side effect was queued.
    WatchlistQueued {
        show: ShowId,
        title: String,
    },
}

/// Broadcast handle shared by everything that emits or listens.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event; dropped silently when nobody listens.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(EngineEvent::SearchStarted {
            show: ShowId(1),
            kind: "backlog".to_string(),
        });

        match rx.recv().await.unwrap() {
            EngineEvent::SearchStarted { show, kind } => {
                assert_eq!(show, ShowId(1));
                assert_eq!(kind, "backlog");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_receivers_is_fine() {
        let bus = EventBus::new(8);
        bus.emit(EngineEvent::ProviderError {
            provider: "geek".to_string(),
            error: "timeout".to_string(),
        });
    }
}
