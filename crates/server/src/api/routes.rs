use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, providers, queues, search, shows, snatch};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Shows (boundary store passthrough)
        .route("/shows", post(shows::register_show))
        .route("/shows", get(shows::list_shows))
        // Search
        .route("/search/start", post(search::start_search))
        .route("/search/manual", post(search::manual_search))
        .route("/search/status/{show}", get(search::search_status))
        // Pick-and-snatch
        .route("/snatch", post(snatch::pick_and_snatch))
        // Providers
        .route("/providers", get(providers::list_providers))
        // Queues
        .route("/queues", get(queues::queue_overview))
        .route("/queues/backlog/pause", post(queues::pause_backlog))
        .route("/queues/backlog/resume", post(queues::resume_backlog))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics).with_state(state))
        .layer(TraceLayer::new_for_http())
}
