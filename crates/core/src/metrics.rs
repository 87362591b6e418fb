//! Prometheus metrics for the search engine.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Search runs by queue kind and outcome.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("telesnatch_searches_total", "Total search runs"),
        &["kind", "result"], // result: "found", "empty", "failed"
    )
    .unwrap()
});

/// Search run duration by queue kind.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "telesnatch_search_duration_seconds",
            "Duration of one search run",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["kind"],
    )
    .unwrap()
});

/// Provider failures by provider and error class.
pub static PROVIDER_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("telesnatch_provider_errors_total", "Provider call failures"),
        &["provider", "class"], // class: "auth", "transient", "rate_limited"
    )
    .unwrap()
});

/// Snatches by resulting episode status.
pub static SNATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("telesnatch_snatches_total", "Snatch attempts"),
        &["status"], // "snatched", "snatched_proper", "snatched_best", "failed"
    )
    .unwrap()
});

/// Register every engine metric with the given registry.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(SEARCHES_TOTAL.clone()))?;
    registry.register(Box::new(SEARCH_DURATION.clone()))?;
    registry.register(Box::new(PROVIDER_ERRORS.clone()))?;
    registry.register(Box::new(SNATCHES_TOTAL.clone()))?;
    Ok(())
}
