//! Download dispatch boundary.
//!
//! A snatch hands the chosen result either to a download client
//! collaborator or to a blackhole directory watched by an external
//! client. Dispatch failure is the only thing that can fail a snatch.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::provider::ProviderKind;
use crate::search::{DownloadLocator, SearchResult};

/// Error type for download dispatch.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download client error: {0}")]
    Client(String),

    #[error("Blackhole write failed: {0}")]
    Io(String),

    #[error("No download mechanism configured for {0:?} results")]
    NotConfigured(ProviderKind),
}

/// External download client (NZB downloader or torrent client wrapper).
#[async_trait]
pub trait DownloadClient: Send + Sync {
    fn name(&self) -> &str;

    /// Hand the result over; `false` means the client refused it.
    async fn send(&self, result: &SearchResult) -> Result<bool, DownloadError>;
}

/// Writes locator stub files into watch directories.
pub struct BlackholeWriter {
    nzb_dir: PathBuf,
    torrent_dir: PathBuf,
}

impl BlackholeWriter {
    pub fn new(nzb_dir: PathBuf, torrent_dir: PathBuf) -> Self {
        Self {
            nzb_dir,
            torrent_dir,
        }
    }

    /// Write the result's locator into the kind-appropriate watch dir.
    pub async fn write_blackhole_file(
        &self,
        kind: ProviderKind,
        result: &SearchResult,
    ) -> Result<bool, DownloadError> {
        let dir = match kind {
            ProviderKind::Nzb => &self.nzb_dir,
            ProviderKind::Torrent => &self.torrent_dir,
        };
        let extension = match &result.locator {
            DownloadLocator::Magnet(_) => "magnet",
            DownloadLocator::Url(_) => match kind {
                ProviderKind::Nzb => "nzb.url",
                ProviderKind::Torrent => "torrent.url",
            },
        };

        let filename = format!("{}.{}", sanitize_filename(&result.title), extension);
        let path = dir.join(filename);

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DownloadError::Io(e.to_string()))?;
        tokio::fs::write(&path, result.locator.as_str())
            .await
            .map_err(|e| DownloadError::Io(e.to_string()))?;

        debug!(path = %path.display(), "wrote blackhole file");
        Ok(true)
    }
}

/// Chosen download mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMethod {
    Client,
    Blackhole,
}

/// Routes a snatched result to the configured mechanism.
pub struct DownloadDispatcher {
    method: DownloadMethod,
    client: Option<Arc<dyn DownloadClient>>,
    blackhole: Option<BlackholeWriter>,
}

impl DownloadDispatcher {
    pub fn with_client(client: Arc<dyn DownloadClient>) -> Self {
        Self {
            method: DownloadMethod::Client,
            client: Some(client),
            blackhole: None,
        }
    }

    pub fn with_blackhole(blackhole: BlackholeWriter) -> Self {
        Self {
            method: DownloadMethod::Blackhole,
            client: None,
            blackhole: Some(blackhole),
        }
    }

    /// Dispatch a result. `Ok(true)` is the only outcome that lets a
    /// snatch proceed to status mutation.
    pub async fn dispatch(
        &self,
        kind: ProviderKind,
        result: &SearchResult,
    ) -> Result<bool, DownloadError> {
        match self.method {
            DownloadMethod::Client => match &self.client {
                Some(client) => {
                    let accepted = client.send(result).await?;
                    if accepted {
                        info!(client = client.name(), title = %result.title, "sent to download client");
                    }
                    Ok(accepted)
                }
                None => Err(DownloadError::NotConfigured(kind)),
            },
            DownloadMethod::Blackhole => match &self.blackhole {
                Some(blackhole) => blackhole.write_blackhole_file(kind, result).await,
                None => Err(DownloadError::NotConfigured(kind)),
            },
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
