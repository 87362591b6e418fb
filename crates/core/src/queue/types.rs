//! Queue item data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quality::SearchType;
use crate::search::SearchResult;
use crate::tv::{EpisodeKey, ShowId};

/// The scheduled-work families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    Daily,
    Backlog,
    Forced,
    Manual,
    FailedRetry,
    ManualSnatch,
}

impl QueueKind {
    pub fn priority(self) -> QueuePriority {
        match self {
            QueueKind::Backlog => QueuePriority::Low,
            QueueKind::Daily => QueuePriority::Normal,
            QueueKind::Forced
            | QueueKind::Manual
            | QueueKind::FailedRetry
            | QueueKind::ManualSnatch => QueuePriority::High,
        }
    }

    /// The search type a run of this kind performs.
    pub fn search_type(self) -> SearchType {
        match self {
            QueueKind::Daily => SearchType::Daily,
            QueueKind::Backlog | QueueKind::Forced => SearchType::Backlog,
            QueueKind::Manual | QueueKind::ManualSnatch => SearchType::Manual,
            QueueKind::FailedRetry => SearchType::FailedRetry,
        }
    }

    /// Daily sweeps are exempt from single-flight admission control.
    pub fn admission_controlled(self) -> bool {
        !matches!(self, QueueKind::Daily)
    }

    pub fn label(self) -> &'static str {
        match self {
            QueueKind::Daily => "daily",
            QueueKind::Backlog => "backlog",
            QueueKind::Forced => "forced",
            QueueKind::Manual => "manual",
            QueueKind::FailedRetry => "failed_retry",
            QueueKind::ManualSnatch => "manual_snatch",
        }
    }
}

/// Dispatch priority tiers. Pausing the backlog raises the dispatch floor
/// above `Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QueuePriority {
    Low,
    Normal,
    High,
}

/// Queue item lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPhase {
    Queued,
    Running,
    Finished,
}

/// One unit of scheduled search work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub kind: QueueKind,
    pub show: ShowId,
    pub segment: Vec<EpisodeKey>,
    pub priority: QueuePriority,
    pub phase: ItemPhase,
    /// Set when the run finishes.
    pub success: Option<bool>,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Manual searches park their results here for the caller.
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// ManualSnatch items carry the cached result to snatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snatch_result: Option<SearchResult>,
}

impl QueueItem {
    pub fn new(kind: QueueKind, show: ShowId, segment: Vec<EpisodeKey>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            show,
            segment,
            priority: kind.priority(),
            phase: ItemPhase::Queued,
            success: None,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            results: Vec::new(),
            snatch_result: None,
        }
    }

    /// ManualSnatch item for one cached result.
    pub fn manual_snatch(show: ShowId, segment: Vec<EpisodeKey>, result: SearchResult) -> Self {
        let mut item = Self::new(QueueKind::ManualSnatch, show, segment);
        item.snatch_result = Some(result);
        item
    }

    /// Single-flight identity: (show, sorted segment).
    pub fn segment_key(&self) -> (ShowId, Vec<EpisodeKey>) {
        let mut segment = self.segment.clone();
        segment.sort();
        (self.show, segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_tiers() {
        assert_eq!(QueueKind::Backlog.priority(), QueuePriority::Low);
        assert_eq!(QueueKind::Daily.priority(), QueuePriority::Normal);
        assert_eq!(QueueKind::Forced.priority(), QueuePriority::High);
        assert_eq!(QueueKind::ManualSnatch.priority(), QueuePriority::High);
        assert!(QueuePriority::High > QueuePriority::Normal);
        assert!(QueuePriority::Normal > QueuePriority::Low);
    }

    #[test]
    fn test_admission_control_exemption() {
        assert!(!QueueKind::Daily.admission_controlled());
        assert!(QueueKind::Backlog.admission_controlled());
        assert!(QueueKind::ManualSnatch.admission_controlled());
    }

    #[test]
    fn test_segment_key_is_order_independent() {
        let a = QueueItem::new(
            QueueKind::Backlog,
            ShowId(1),
            vec![EpisodeKey::new(1, 2), EpisodeKey::new(1, 1)],
        );
        let b = QueueItem::new(
            QueueKind::Backlog,
            ShowId(1),
            vec![EpisodeKey::new(1, 1), EpisodeKey::new(1, 2)],
        );
        assert_eq!(a.segment_key(), b.segment_key());
        assert_ne!(a.id, b.id);
    }
}
