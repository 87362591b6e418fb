use axum::{extract::State, Json};
use prometheus::Encoder;
use serde::Serialize;
use std::sync::Arc;
use telesnatch_core::SanitizedConfig;

use super::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    let encoder = prometheus::TextEncoder::new();
    let families = state.metrics.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ApiError::internal(e.to_string()))
}
