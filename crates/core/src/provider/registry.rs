//! Provider registry.

use std::sync::Arc;

use super::{NewznabProvider, Provider, ProviderConfig, ProviderError, ProviderMode,
    ProviderStatus};

/// Owns every configured provider instance; searches borrow them from
/// here filtered by the queue family they run for.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    /// Build HTTP providers from static configuration.
    pub fn from_configs(configs: Vec<ProviderConfig>) -> Result<Self, ProviderError> {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(configs.len());
        for config in configs {
            providers.push(Arc::new(NewznabProvider::new(config)?));
        }
        Ok(Self { providers })
    }

    /// Providers enabled for the given search family, in configured order.
    pub fn enabled(&self, mode: ProviderMode) -> Vec<Arc<dyn Provider>> {
        self.providers
            .iter()
            .filter(|p| p.config().enabled_for(mode))
            .cloned()
            .collect()
    }

    /// Look up a provider by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.config().id == id).cloned()
    }

    /// Status snapshot of every provider.
    pub async fn status(&self) -> Vec<ProviderStatus> {
        let mut out = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            out.push(provider.status().await);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
