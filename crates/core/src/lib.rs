//! Episode search orchestration and snatch engine.
//!
//! The core crate: quality lattice, provider gateway, result ranking,
//! search coordination, snatch execution and the scheduling queues. The
//! server crate wires this up behind an HTTP API.

pub mod config;
pub mod download;
pub mod events;
pub mod history;
pub mod metrics;
pub mod provider;
pub mod quality;
pub mod queue;
pub mod search;
pub mod snatch;
pub mod testing;
pub mod tv;

pub use config::{
    load_config, load_config_from_str, validate_config, BreatherPreset, Config, ConfigError,
    DownloadMethodConfig, SanitizedConfig,
};
pub use download::{BlackholeWriter, DownloadClient, DownloadDispatcher, DownloadError};
pub use events::{EngineEvent, EventBus};
pub use history::{HistoryRecord, HistoryStore, SqliteHistoryStore};
pub use provider::{
    Provider, ProviderConfig, ProviderError, ProviderKind, ProviderMode, ProviderRegistry,
    ProviderStatus, SearchMode,
};
pub use quality::{CombinedQuality, Quality, SearchType};
pub use queue::{
    PickError, QueueItem, QueueKind, QueueStatusEntry, SearchQueue, SearchRunner, SearchService,
};
pub use search::{ResultCache, SearchCoordinator, SearchOutcome, SearchResult};
pub use snatch::SnatchExecutor;
pub use tv::{Episode, EpisodeKey, EpisodeState, EpisodeStatus, Library, MemoryLibrary, Show,
    ShowId};
