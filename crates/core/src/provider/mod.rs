//! Provider gateway.
//!
//! Uniform interface over heterogeneous external search backends, with
//! per-provider throttling and a season⇄episode fallback retry.

mod gateway;
mod newznab;
mod registry;
mod throttle;
mod types;

pub use gateway::search_with_fallback;
pub use newznab::NewznabProvider;
pub use registry::ProviderRegistry;
pub use throttle::Throttle;
pub use types::*;
