//! Mock provider for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::provider::{
    Provider, ProviderConfig, ProviderError, ProviderKind, ProviderSearchRequest, ProviderStatus,
};
use crate::search::SearchResult;

/// Scriptable [`Provider`] implementation.
///
/// Result batches pushed with [`push_results`](Self::push_results) are
/// consumed one per `search` call (so a fallback retry can see a
/// different batch than the first pass); once drained, the default
/// result set is returned. Requests are recorded for assertions.
pub struct MockProvider {
    config: ProviderConfig,
    batches: Arc<RwLock<VecDeque<Vec<SearchResult>>>>,
    default_results: Arc<RwLock<Vec<SearchResult>>>,
    next_error: Arc<RwLock<Option<ProviderError>>>,
    requests: Arc<RwLock<Vec<ProviderSearchRequest>>>,
}

impl MockProvider {
    pub fn new(id: &str) -> Self {
        let config = ProviderConfig {
            id: id.to_string(),
            name: id.to_string(),
            kind: ProviderKind::Nzb,
            url: format!("http://{}.example.test", id),
            api_key: String::new(),
            min_seeders: None,
            min_leechers: None,
            search_fallback: false,
            enable_daily: true,
            enable_backlog: true,
            enable_manual: true,
            rate_limit_rpm: 1000,
            cooldown_secs: 1,
            timeout_secs: 5,
        };
        Self {
            config,
            batches: Arc::new(RwLock::new(VecDeque::new())),
            default_results: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Mark this provider as a torrent tracker.
    pub fn torrent(mut self) -> Self {
        self.config.kind = ProviderKind::Torrent;
        self
    }

    pub fn with_fallback(mut self) -> Self {
        self.config.search_fallback = true;
        self
    }

    pub fn daily_only(mut self) -> Self {
        self.config.enable_backlog = false;
        self.config.enable_manual = false;
        self
    }

    pub fn with_peer_floor(mut self, min_seeders: u32, min_leechers: u32) -> Self {
        self.config.min_seeders = Some(min_seeders);
        self.config.min_leechers = Some(min_leechers);
        self
    }

    /// Queue one batch; consumed by the next `search` call.
    pub async fn push_results(&self, results: Vec<SearchResult>) {
        self.batches.write().await.push_back(results);
    }

    /// Results returned once the scripted batches are drained.
    pub async fn set_results(&self, results: Vec<SearchResult>) {
        *self.default_results.write().await = results;
    }

    /// Fail the next `search` call with the given error.
    pub async fn fail_next(&self, error: ProviderError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_requests(&self) -> Vec<ProviderSearchRequest> {
        self.requests.read().await.clone()
    }

    pub async fn search_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn search(
        &self,
        req: &ProviderSearchRequest,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        self.requests.write().await.push(req.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(batch) = self.batches.write().await.pop_front() {
            return Ok(batch);
        }

        Ok(self.default_results.read().await.clone())
    }

    async fn status(&self) -> ProviderStatus {
        ProviderStatus {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            kind: self.config.kind,
            enable_daily: self.config.enable_daily,
            enable_backlog: self.config.enable_backlog,
            enable_manual: self.config.enable_manual,
            last_used: None,
            last_error: None,
            cooldown_remaining_ms: None,
        }
    }
}
