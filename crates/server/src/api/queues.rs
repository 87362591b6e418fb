//! Queue overview and backlog pause handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QueueOverview {
    pub backlog_paused: bool,
    pub search_pending: usize,
    pub daily_pending: usize,
    pub backlog_pending: usize,
    pub snatch_pending: usize,
}

pub async fn queue_overview(State(state): State<Arc<AppState>>) -> Json<QueueOverview> {
    let service = &state.service;
    Json(QueueOverview {
        backlog_paused: service.backlog_paused(),
        search_pending: service.search_queue.pending_len(),
        daily_pending: service.daily_queue.pending_len(),
        backlog_pending: service.backlog_queue.pending_len(),
        snatch_pending: service.snatch_queue.pending_len(),
    })
}

#[derive(Debug, Serialize)]
pub struct PauseResponse {
    pub backlog_paused: bool,
}

pub async fn pause_backlog(State(state): State<Arc<AppState>>) -> Json<PauseResponse> {
    state.service.pause_backlog();
    Json(PauseResponse {
        backlog_paused: true,
    })
}

pub async fn resume_backlog(State(state): State<Arc<AppState>>) -> Json<PauseResponse> {
    state.service.resume_backlog();
    Json(PauseResponse {
        backlog_paused: false,
    })
}
