use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::provider::ProviderConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8081
}

/// Database paths for the history store and the provider result cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            cache_path: default_cache_path(),
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("telesnatch-history.db")
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("telesnatch-cache.db")
}

/// Search engine knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// CPU breather between provider queries and after snatches.
    #[serde(default)]
    pub breather: BreatherPreset,
    /// Reject results whose (name, size, provider) previously failed.
    #[serde(default = "default_true")]
    pub failed_downloads: bool,
    /// Queue a deferred watchlist-sync side effect per snatch.
    #[serde(default)]
    pub watchlist_sync: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            breather: BreatherPreset::default(),
            failed_downloads: true,
            watchlist_sync: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Breather presets.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreatherPreset {
    Disabled,
    Low,
    #[default]
    Normal,
    High,
}

impl BreatherPreset {
    pub fn duration(self) -> Duration {
        match self {
            BreatherPreset::Disabled => Duration::ZERO,
            BreatherPreset::Low => Duration::from_secs(1),
            BreatherPreset::Normal => Duration::from_secs(3),
            BreatherPreset::High => Duration::from_secs(5),
        }
    }
}

/// Download dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default)]
    pub method: DownloadMethodConfig,
    #[serde(default = "default_nzb_dir")]
    pub nzb_blackhole_dir: PathBuf,
    #[serde(default = "default_torrent_dir")]
    pub torrent_blackhole_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            method: DownloadMethodConfig::default(),
            nzb_blackhole_dir: default_nzb_dir(),
            torrent_blackhole_dir: default_torrent_dir(),
        }
    }
}

fn default_nzb_dir() -> PathBuf {
    PathBuf::from("blackhole/nzb")
}

fn default_torrent_dir() -> PathBuf {
    PathBuf::from("blackhole/torrent")
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMethodConfig {
    #[default]
    Blackhole,
    Client,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub download: DownloadConfig,
    pub providers: Vec<SanitizedProviderConfig>,
}

/// Provider config with the API key hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    pub api_key_configured: bool,
    pub enable_daily: bool,
    pub enable_backlog: bool,
    pub enable_manual: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            search: config.search.clone(),
            download: config.download.clone(),
            providers: config
                .providers
                .iter()
                .map(|p| SanitizedProviderConfig {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    url: p.url.clone(),
                    api_key_configured: !p.api_key.is_empty(),
                    enable_daily: p.enable_daily,
                    enable_backlog: p.enable_backlog,
                    enable_manual: p.enable_manual,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert!(config.providers.is_empty());
        assert_eq!(config.search.breather, BreatherPreset::Normal);
        assert!(config.search.failed_downloads);
    }

    #[test]
    fn test_deserialize_with_providers() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[search]
breather = "disabled"

[[providers]]
id = "geek"
name = "Geek"
kind = "nzb"
url = "https://api.example.test"
api_key = "secret"
search_fallback = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.search.breather, BreatherPreset::Disabled);
        assert_eq!(config.providers.len(), 1);
        assert!(config.providers[0].search_fallback);
    }

    #[test]
    fn test_breather_durations() {
        assert_eq!(BreatherPreset::Disabled.duration(), Duration::ZERO);
        assert_eq!(BreatherPreset::Low.duration(), Duration::from_secs(1));
        assert_eq!(BreatherPreset::Normal.duration(), Duration::from_secs(3));
        assert_eq!(BreatherPreset::High.duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let toml = r#"
[[providers]]
id = "geek"
name = "Geek"
kind = "nzb"
url = "https://api.example.test"
api_key = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.providers[0].api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
    }
}
