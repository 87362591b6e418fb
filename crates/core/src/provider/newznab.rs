//! Jackett-style JSON search backend.
//!
//! One instance per configured provider. Request building and response
//! parsing are two explicit phases so either can be unit tested without a
//! network in between.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::search::{naming, DownloadLocator, SearchResult};

use super::throttle::Throttle;
use super::{
    Provider, ProviderConfig, ProviderError, ProviderSearchRequest, ProviderStatus, SearchMode,
};

#[derive(Debug, Default)]
struct RunState {
    last_used: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// HTTP search backend speaking the Jackett/Newznab JSON results API.
pub struct NewznabProvider {
    config: ProviderConfig,
    client: Client,
    throttle: Throttle,
    state: RwLock<RunState>,
}

impl NewznabProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let throttle = Throttle::new(
            config.rate_limit_rpm,
            Duration::from_secs(config.cooldown_secs),
        );

        Ok(Self {
            config,
            client,
            throttle,
            state: RwLock::new(RunState::default()),
        })
    }

    /// The query strings one request expands to: one per episode in
    /// episode mode, a single season string in season mode.
    fn search_strings(req: &ProviderSearchRequest) -> Vec<String> {
        match req.mode {
            SearchMode::Season => {
                vec![format!("{} S{:02}", req.show_title, req.season)]
            }
            SearchMode::Episode => req
                .episodes
                .iter()
                .map(|e| format!("{} S{:02}E{:02}", req.show_title, req.season, e))
                .collect(),
        }
    }

    /// Phase one: build the API URL for one query string.
    fn build_search_url(&self, query: &str) -> String {
        format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}&Category[]=5000",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.id),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(query)
        )
    }

    /// Phase two: normalize a raw response body into search results.
    ///
    /// Hits that do not parse to the requested season are dropped here;
    /// everything else is the ranker's job.
    fn parse_response(
        &self,
        req: &ProviderSearchRequest,
        body: &str,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let response: ApiResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let mut results = Vec::new();
        for item in response.Results {
            let Some((season, episodes)) = naming::parse_episode_refs(&item.Title) else {
                continue;
            };
            if season != req.season {
                continue;
            }

            let locator = match (&item.MagnetUri, &item.Link) {
                (Some(magnet), _) if magnet.starts_with("magnet:") => {
                    DownloadLocator::Magnet(magnet.clone())
                }
                (_, Some(link)) if !link.is_empty() => DownloadLocator::Url(link.clone()),
                _ => continue,
            };

            let seeders = item.Seeders.unwrap_or(-1);
            let leechers = match (item.Peers, item.Seeders) {
                (Some(peers), Some(seeders)) => (peers - seeders).max(0),
                _ => -1,
            };

            results.push(SearchResult {
                quality: naming::parse_quality(&item.Title),
                proper_tags: naming::proper_tags(&item.Title),
                release_group: naming::release_group(&item.Title),
                title: item.Title,
                locator,
                size_bytes: item.Size.unwrap_or(0).max(0) as u64,
                seeders,
                leechers,
                publish_date: item
                    .PublishDate
                    .as_deref()
                    .and_then(parse_publish_date),
                show: req.show,
                season,
                episodes,
                provider: self.config.id.clone(),
            });
        }

        Ok(results)
    }

    async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else if e.is_connect() {
                ProviderError::Connection(e.to_string())
            } else {
                ProviderError::Api(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::Auth(format!("HTTP {}", status)));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.throttle.enter_cooldown();
            let remaining = self
                .throttle
                .cooldown_remaining()
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            return Err(ProviderError::RateLimited {
                retry_after_ms: remaining,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn record_outcome(&self, error: Option<&ProviderError>) {
        let mut state = self.state.write().await;
        state.last_used = Some(Utc::now());
        state.last_error = error.map(|e| e.to_string());
    }
}

#[async_trait]
impl Provider for NewznabProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn search(
        &self,
        req: &ProviderSearchRequest,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let mut results = Vec::new();

        for query in Self::search_strings(req) {
            self.throttle.acquire()?;

            let url = self.build_search_url(&query);
            debug!(provider = %self.config.id, query = %query, "provider search");

            let body = match self.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(provider = %self.config.id, error = %e, "provider request failed");
                    self.record_outcome(Some(&e)).await;
                    return Err(e);
                }
            };

            let mut hits = self.parse_response(req, &body)?;
            results.append(&mut hits);
        }

        self.record_outcome(None).await;
        debug!(
            provider = %self.config.id,
            results = results.len(),
            "provider search complete"
        );
        Ok(results)
    }

    async fn status(&self) -> ProviderStatus {
        let state = self.state.read().await;
        ProviderStatus {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            kind: self.config.kind,
            enable_daily: self.config.enable_daily,
            enable_backlog: self.config.enable_backlog,
            enable_manual: self.config.enable_manual,
            last_used: state.last_used,
            last_error: state.last_error.clone(),
            cooldown_remaining_ms: self
                .throttle
                .cooldown_remaining()
                .map(|d| d.as_millis() as u64),
        }
    }
}

fn parse_publish_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Raw API response shape.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ApiResponse {
    Results: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ApiItem {
    Title: String,
    MagnetUri: Option<String>,
    Link: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    PublishDate: Option<String>,
}
