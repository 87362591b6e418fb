//! Provider gateway types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::SearchResult;
use crate::tv::ShowId;

/// Transport family of a provider's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Nzb,
    Torrent,
}

/// Which shape of search a gateway call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Episode,
    Season,
}

impl SearchMode {
    pub fn flipped(self) -> SearchMode {
        match self {
            SearchMode::Episode => SearchMode::Season,
            SearchMode::Season => SearchMode::Episode,
        }
    }
}

/// The queue families a provider can be enabled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    Daily,
    Backlog,
    Manual,
}

/// Static per-provider configuration, read-only at search time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    pub kind: ProviderKind,
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Torrent floor; results below are rejected when both floors are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_seeders: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_leechers: Option<u32>,
    /// Retry the other search mode when the first returns nothing.
    #[serde(default)]
    pub search_fallback: bool,
    #[serde(default = "default_true")]
    pub enable_daily: bool,
    #[serde(default = "default_true")]
    pub enable_backlog: bool,
    #[serde(default = "default_true")]
    pub enable_manual: bool,
    #[serde(default = "default_rpm")]
    pub rate_limit_rpm: u32,
    /// Cooldown window after the provider rate-limits us.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_rpm() -> u32 {
    30
}

fn default_cooldown() -> u64 {
    300
}

fn default_timeout() -> u64 {
    30
}

impl ProviderConfig {
    pub fn enabled_for(&self, mode: ProviderMode) -> bool {
        match mode {
            ProviderMode::Daily => self.enable_daily,
            ProviderMode::Backlog => self.enable_backlog,
            ProviderMode::Manual => self.enable_manual,
        }
    }
}

/// One gateway invocation: a show, a segment, and the search shape.
#[derive(Debug, Clone)]
pub struct ProviderSearchRequest {
    pub show: ShowId,
    pub show_title: String,
    pub season: i32,
    /// Episode numbers to search in Episode mode; ignored in Season mode.
    pub episodes: Vec<i32>,
    /// Episode titles for the season, for backends that match release
    /// titles by name rather than SxxEyy numbering.
    pub episode_names: Vec<String>,
    pub mode: SearchMode,
    pub manual: bool,
    pub forced: bool,
}

impl ProviderSearchRequest {
    /// Same request in the other search mode, for the fallback retry.
    pub fn flipped(&self) -> ProviderSearchRequest {
        let mut req = self.clone();
        req.mode = self.mode.flipped();
        req
    }
}

/// Errors a provider call can fail with.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials rejected; skip this provider for the rest of the run.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Provider API error: {0}")]
    Api(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Provider is in (or just entered) a rate-limit cooldown.
    #[error("Rate limited, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

impl ProviderError {
    /// Transient errors are logged and the coordinator moves on to the
    /// next provider; auth and rate-limit failures change skip behavior.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout
                | ProviderError::Connection(_)
                | ProviderError::Api(_)
                | ProviderError::Decode(_)
        )
    }
}

/// Runtime snapshot of one provider, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub id: String,
    pub name: String,
    pub kind: ProviderKind,
    pub enable_daily: bool,
    pub enable_backlog: bool,
    pub enable_manual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_ms: Option<u64>,
}

/// One external search backend.
#[async_trait]
pub trait Provider: Send + Sync {
    fn config(&self) -> &ProviderConfig;

    /// Execute one search and return normalized results, possibly empty.
    async fn search(&self, req: &ProviderSearchRequest)
        -> Result<Vec<SearchResult>, ProviderError>;

    /// Runtime status snapshot.
    async fn status(&self) -> ProviderStatus;
}
