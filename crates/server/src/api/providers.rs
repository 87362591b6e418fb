//! Provider status handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use telesnatch_core::ProviderStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderStatus>,
}

pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.registry.status().await,
    })
}
