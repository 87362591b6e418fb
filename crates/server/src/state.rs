use std::sync::Arc;

use prometheus::Registry;
use telesnatch_core::{Config, MemoryLibrary, ProviderRegistry, SanitizedConfig, SearchService};

/// Shared application state
pub struct AppState {
    config: Config,
    pub service: Arc<SearchService>,
    pub library: Arc<MemoryLibrary>,
    pub registry: Arc<ProviderRegistry>,
    pub metrics: Registry,
}

impl AppState {
    pub fn new(
        config: Config,
        service: Arc<SearchService>,
        library: Arc<MemoryLibrary>,
        registry: Arc<ProviderRegistry>,
        metrics: Registry,
    ) -> Self {
        Self {
            config,
            service,
            library,
            registry,
            metrics,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }
}
