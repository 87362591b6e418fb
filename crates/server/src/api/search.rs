//! Search API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telesnatch_core::{
    EpisodeKey, QueueItem, QueueKind, QueueStatusEntry, SearchResult, ShowId,
};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartSearchRequest {
    pub kind: QueueKind,
    pub show: i64,
    pub season: i32,
    pub episodes: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct StartSearchResponse {
    pub id: String,
}

/// Enqueue a daily/backlog/forced/failed-retry search.
pub async fn start_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartSearchRequest>,
) -> Result<(StatusCode, Json<StartSearchResponse>), ApiError> {
    if matches!(request.kind, QueueKind::Manual | QueueKind::ManualSnatch) {
        return Err(ApiError::bad_request(
            "use /search/manual or /snatch for manual operations",
        ));
    }

    let segment: Vec<EpisodeKey> = request
        .episodes
        .iter()
        .map(|&e| EpisodeKey::new(request.season, e))
        .collect();

    let item = QueueItem::new(request.kind, ShowId(request.show), segment);
    let id = state
        .service
        .enqueue(item)
        .map_err(|e| ApiError::conflict(e.to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartSearchResponse { id }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ManualSearchRequest {
    pub show: i64,
    pub season: i32,
    pub episodes: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct ManualSearchResponse {
    /// True when the rows came straight from the provider cache.
    pub cached: bool,
    /// Search id when a fresh search was enqueued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<String>,
    pub results: Vec<CachedRow>,
}

#[derive(Debug, Serialize)]
pub struct CachedRow {
    pub provider: String,
    pub rowid: i64,
    #[serde(flatten)]
    pub result: SearchResult,
}

/// Manual search: serve cached rows when available, otherwise enqueue a
/// manual search run and return whatever the cache holds afterwards.
pub async fn manual_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ManualSearchRequest>,
) -> Result<Json<ManualSearchResponse>, ApiError> {
    let show = ShowId(request.show);
    let episode_filter = if request.episodes.len() == 1 {
        Some(request.episodes[0])
    } else {
        None
    };

    let rows = state
        .service
        .cached_results(show, request.season, episode_filter)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if !rows.is_empty() {
        return Ok(Json(ManualSearchResponse {
            cached: true,
            search_id: None,
            results: rows.into_iter().map(row_view).collect(),
        }));
    }

    // Cache miss: enqueue a fresh manual search. The service sleeps the
    // breather so the worker can claim the item before we re-read.
    let segment: Vec<EpisodeKey> = request
        .episodes
        .iter()
        .map(|&e| EpisodeKey::new(request.season, e))
        .collect();
    let id = state
        .service
        .manual_search(show, segment)
        .await
        .map_err(|e| ApiError::conflict(e.to_string()))?;

    let rows = state
        .service
        .cached_results(show, request.season, episode_filter)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ManualSearchResponse {
        cached: false,
        search_id: Some(id),
        results: rows.into_iter().map(row_view).collect(),
    }))
}

fn row_view(row: telesnatch_core::search::CachedResult) -> CachedRow {
    CachedRow {
        provider: row.provider,
        rowid: row.rowid,
        result: row.result,
    }
}

/// Queued/searching/finished view for one show.
pub async fn search_status(
    State(state): State<Arc<AppState>>,
    Path(show): Path<i64>,
) -> Json<Vec<QueueStatusEntry>> {
    Json(state.service.show_status(ShowId(show)))
}
