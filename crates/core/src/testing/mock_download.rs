//! Mock download client for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::download::{DownloadClient, DownloadError};
use crate::search::SearchResult;

/// Behavior of the next `send` calls.
#[derive(Debug, Clone, Copy)]
enum Behavior {
    Accept,
    Refuse,
    Fail,
}

/// Mock implementation of the [`DownloadClient`] trait.
pub struct MockDownloadClient {
    behavior: Behavior,
    sent: Arc<RwLock<Vec<String>>>,
}

impl MockDownloadClient {
    /// Accepts everything.
    pub fn accepting() -> Self {
        Self {
            behavior: Behavior::Accept,
            sent: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Returns `Ok(false)` for everything.
    pub fn refusing() -> Self {
        Self {
            behavior: Behavior::Refuse,
            sent: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Errors on every call.
    pub fn failing() -> Self {
        Self {
            behavior: Behavior::Fail,
            sent: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Titles of results the client accepted.
    pub async fn sent_titles(&self) -> Vec<String> {
        self.sent.read().await.clone()
    }

    /// Shared handle to the accepted-title log, for assertions after the
    /// client has been moved into a dispatcher.
    pub fn sent_handle(&self) -> Arc<RwLock<Vec<String>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl DownloadClient for MockDownloadClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, result: &SearchResult) -> Result<bool, DownloadError> {
        match self.behavior {
            Behavior::Accept => {
                self.sent.write().await.push(result.title.clone());
                Ok(true)
            }
            Behavior::Refuse => Ok(false),
            Behavior::Fail => Err(DownloadError::Client("mock failure".to_string())),
        }
    }
}
