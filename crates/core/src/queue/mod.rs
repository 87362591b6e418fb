//! Search queues: priority scheduling, single-flight admission control,
//! per-family workers and the bounded finished-history ring.

mod runner;
mod scheduler;
mod service;
mod types;

pub use runner::{spawn_worker, QueueRunner, SearchRunner};
pub use scheduler::{QueueError, SearchQueue};
pub use service::{PickError, QueueStatusEntry, SearchService};
pub use types::{ItemPhase, QueueItem, QueueKind, QueuePriority};
