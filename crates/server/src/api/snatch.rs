//! Pick-and-snatch API handler.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use telesnatch_core::PickError;

use super::ApiError;
use crate::state::AppState;

/// How long the handler polls the snatch queue before giving up.
const SNATCH_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
pub struct PickAndSnatchRequest {
    pub provider: String,
    pub rowid: i64,
}

#[derive(Debug, Serialize)]
pub struct PickAndSnatchResponse {
    pub success: bool,
}

/// Materialize a cached result and block until its snatch finishes.
pub async fn pick_and_snatch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PickAndSnatchRequest>,
) -> Result<Json<PickAndSnatchResponse>, ApiError> {
    let success = state
        .service
        .pick_and_snatch(&request.provider, request.rowid, SNATCH_WAIT)
        .await
        .map_err(|e| match e {
            PickError::Cache(_) | PickError::NoEpisodes => ApiError::not_found(e.to_string()),
            PickError::Queue(_) => ApiError::conflict(e.to_string()),
            PickError::Timeout => {
                ApiError::new(axum::http::StatusCode::GATEWAY_TIMEOUT, e.to_string())
            }
        })?;

    Ok(Json(PickAndSnatchResponse { success }))
}
