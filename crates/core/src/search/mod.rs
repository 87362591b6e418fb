//! Search pipeline: result model, release-name heuristics, ranking and
//! the per-invocation coordinator.

mod cache;
mod coordinator;
pub mod naming;
pub mod ranker;
mod result;

pub use cache::{CacheError, CachedResult, ResultCache};
pub use coordinator::{SearchCoordinator, SearchOutcome, SearchRunError};
pub use ranker::{FilterContext, RejectReason, SelectContext};
pub use result::{DownloadLocator, ResultShape, SearchResult};
