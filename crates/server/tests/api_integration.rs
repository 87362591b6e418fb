//! HTTP API integration tests against an in-memory engine.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use telesnatch_core::{
    load_config_from_str, metrics, DownloadDispatcher, BlackholeWriter, EventBus, HistoryStore,
    Library, MemoryLibrary, ProviderRegistry, ResultCache, SearchCoordinator, SearchRunner,
    SearchService, SnatchExecutor, SqliteHistoryStore,
};

// The router module lives in the binary crate; rebuild the same wiring
// here against in-memory stores.
#[path = "../src/api/mod.rs"]
mod api;
#[path = "../src/state.rs"]
mod state;

use state::AppState;

fn test_app() -> axum::Router {
    let config = load_config_from_str("").unwrap();

    let library = Arc::new(MemoryLibrary::new());
    let library_dyn: Arc<dyn Library> = Arc::clone(&library) as Arc<dyn Library>;
    let registry = Arc::new(ProviderRegistry::from_configs(vec![]).unwrap());
    let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::in_memory().unwrap());
    let cache = Arc::new(ResultCache::in_memory().unwrap());
    let events = EventBus::default();

    let coordinator = Arc::new(SearchCoordinator::new(
        Arc::clone(&registry),
        Arc::clone(&library_dyn),
        Arc::clone(&history),
        Arc::clone(&cache),
        events.clone(),
        true,
        Duration::ZERO,
    ));
    let tmp = std::env::temp_dir().join("telesnatch-test-blackhole");
    let snatcher = Arc::new(SnatchExecutor::new(
        Arc::clone(&library_dyn),
        Arc::clone(&history),
        Arc::new(DownloadDispatcher::with_blackhole(BlackholeWriter::new(
            tmp.join("nzb"),
            tmp.join("torrent"),
        ))),
        events.clone(),
        false,
    ));
    let runner = Arc::new(SearchRunner::new(
        coordinator,
        snatcher,
        library_dyn,
        Arc::clone(&registry),
        events,
        Duration::ZERO,
    ));

    // Workers deliberately not started; enqueued items stay Queued.
    let service = Arc::new(SearchService::new(runner, cache, Duration::ZERO));

    let metrics_registry = prometheus::Registry::new();
    metrics::register_metrics(&metrics_registry).unwrap();

    let app_state = Arc::new(AppState::new(
        config,
        service,
        library,
        registry,
        metrics_registry,
    ));
    api::create_router(app_state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn show_payload() -> Value {
    json!({
        "id": 1,
        "title": "Test Show",
        "allowed": ["hdtv", "hd_web_dl"],
        "preferred": ["full_hd_bluray"],
        "episodes": [
            {"season": 1, "episode": 1, "status": "wanted"},
            {"season": 1, "episode": 2, "status": "wanted"}
        ]
    })
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let response = app.oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let app = test_app();
    let response = app.oneshot(get("/api/v1/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["server"]["port"], 8081);
}

#[tokio::test]
async fn test_register_and_list_shows() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/shows", show_payload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["episodes"], 2);

    let response = app.oneshot(get("/api/v1/shows")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Test Show");
}

#[tokio::test]
async fn test_register_show_without_episodes_is_rejected() {
    let app = test_app();
    let mut payload = show_payload();
    payload["episodes"] = json!([]);

    let response = app
        .oneshot(post_json("/api/v1/shows", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_search_and_duplicate_rejection() {
    let app = test_app();
    app.clone()
        .oneshot(post_json("/api/v1/shows", show_payload()))
        .await
        .unwrap();

    let request = json!({"kind": "backlog", "show": 1, "season": 1, "episodes": [1, 2]});
    let response = app
        .clone()
        .oneshot(post_json("/api/v1/search/start", request.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Same segment again: admission control rejects it.
    let response = app
        .clone()
        .oneshot(post_json("/api/v1/search/start", request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The item shows up in the status view.
    let response = app
        .clone()
        .oneshot(get("/api/v1/search/status/1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.as_array().unwrap().is_empty()); // backlog items are not in the forced/manual view

    let response = app.oneshot(get("/api/v1/queues")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["backlog_pending"], 1);
}

#[tokio::test]
async fn test_start_search_rejects_manual_kind() {
    let app = test_app();
    let request = json!({"kind": "manual", "show": 1, "season": 1, "episodes": [1]});
    let response = app
        .oneshot(post_json("/api/v1/search/start", request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backlog_pause_resume() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/queues/backlog/pause", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["backlog_paused"], true);

    let response = app
        .clone()
        .oneshot(get("/api/v1/queues"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["backlog_paused"], true);

    let response = app
        .oneshot(post_json("/api/v1/queues/backlog/resume", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["backlog_paused"], false);
}

#[tokio::test]
async fn test_providers_empty() {
    let app = test_app();
    let response = app.oneshot(get("/api/v1/providers")).await.unwrap();
    let body = body_json(response).await;
    assert!(body["providers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app();
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_snatch_unknown_row_is_not_found() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/snatch",
            json!({"provider": "geek", "rowid": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
