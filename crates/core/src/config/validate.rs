use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Provider ids are non-empty and unique
/// - Provider URLs look like HTTP endpoints
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for provider in &config.providers {
        if provider.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "provider id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(provider.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate provider id '{}'",
                provider.id
            )));
        }
        if !provider.url.starts_with("http://") && !provider.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "provider '{}' url must be an http(s) endpoint",
                provider.id
            )));
        }
    }

    Ok(())
}
