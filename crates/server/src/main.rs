mod api;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telesnatch_core::{
    load_config, metrics, validate_config, BlackholeWriter, DownloadDispatcher,
    DownloadMethodConfig, EventBus, HistoryStore, Library, MemoryLibrary, ProviderRegistry,
    ResultCache, SearchCoordinator, SearchRunner, SearchService, SnatchExecutor,
    SqliteHistoryStore,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TELLY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("History database: {:?}", config.database.history_path);
    info!("Configured providers: {}", config.providers.len());

    // Stores
    let history: Arc<dyn HistoryStore> = Arc::new(
        SqliteHistoryStore::new(&config.database.history_path)
            .context("Failed to create history store")?,
    );
    let cache = Arc::new(
        ResultCache::new(&config.database.cache_path)
            .context("Failed to create result cache")?,
    );
    let library = Arc::new(MemoryLibrary::new());
    let library_dyn: Arc<dyn Library> = Arc::clone(&library) as Arc<dyn Library>;

    // Providers
    let registry = Arc::new(
        ProviderRegistry::from_configs(config.providers.clone())
            .context("Failed to build provider registry")?,
    );
    info!("Provider registry initialized ({} providers)", registry.len());

    // Engine
    let events = EventBus::default();
    let breather = config.search.breather.duration();

    let coordinator = Arc::new(SearchCoordinator::new(
        Arc::clone(&registry),
        Arc::clone(&library_dyn),
        Arc::clone(&history),
        Arc::clone(&cache),
        events.clone(),
        config.search.failed_downloads,
        breather,
    ));

    // No download-client wrapper ships in-tree; blackhole covers both
    // configured methods until one is wired up.
    if config.download.method == DownloadMethodConfig::Client {
        info!("download.method = client has no bundled client, falling back to blackhole dirs");
    }
    let dispatcher = Arc::new(DownloadDispatcher::with_blackhole(BlackholeWriter::new(
        config.download.nzb_blackhole_dir.clone(),
        config.download.torrent_blackhole_dir.clone(),
    )));

    let snatcher = Arc::new(SnatchExecutor::new(
        Arc::clone(&library_dyn),
        Arc::clone(&history),
        dispatcher,
        events.clone(),
        config.search.watchlist_sync,
    ));

    let runner = Arc::new(SearchRunner::new(
        coordinator,
        snatcher,
        Arc::clone(&library_dyn),
        Arc::clone(&registry),
        events.clone(),
        breather,
    ));

    let service = Arc::new(SearchService::new(runner, Arc::clone(&cache), breather));
    service.start();
    info!("Search service started");

    // Metrics
    let metrics_registry = prometheus::Registry::new();
    metrics::register_metrics(&metrics_registry).context("Failed to register metrics")?;

    // HTTP surface
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&service),
        library,
        registry,
        metrics_registry,
    ));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    service.stop();

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
