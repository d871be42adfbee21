//! Prometheus metrics for the query cache and fetch coordination.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

/// Cache lookups on query start.
/// Labels: result (hit/miss)
pub static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinlist_cache_lookups_total",
        "Display-key cache lookups on query start",
        &["result"]
    )
    .unwrap()
});

/// Number of display keys held by the cache.
pub static CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("coinlist_cache_entries", "Display keys held by the query cache")
        .unwrap()
});

/// Network fetches issued.
pub static FETCHES_STARTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("coinlist_fetches_started_total", "Network fetches issued").unwrap()
});

/// Runs that attached to an in-flight fetch instead of issuing a new one.
pub static FETCHES_DEDUPLICATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinlist_fetches_deduplicated_total",
        "Runs attached to an in-flight fetch"
    )
    .unwrap()
});

/// Completed fetches.
/// Labels: outcome (success/server_error/no_response/unknown)
pub static FETCHES_COMPLETED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinlist_fetches_completed_total",
        "Completed fetches by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Fetches currently in flight.
pub static FETCHES_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("coinlist_fetches_in_flight", "Fetches currently in flight").unwrap()
});

/// Fetch latency in milliseconds.
pub static FETCH_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "coinlist_fetch_latency_ms",
        "Remote fetch latency in milliseconds",
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Facade over the metric statics.
pub struct Metrics;

impl Metrics {
    /// Record a display-key lookup.
    pub fn cache_lookup(hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        CACHE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
    }

    /// Set the number of cached display keys.
    pub fn cache_entries(count: usize) {
        CACHE_ENTRIES.set(count as i64);
    }

    /// Record a new network fetch.
    pub fn fetch_started() {
        FETCHES_STARTED_TOTAL.inc();
        FETCHES_IN_FLIGHT.inc();
    }

    /// Record a run that reused an in-flight fetch.
    pub fn fetch_deduplicated() {
        FETCHES_DEDUPLICATED_TOTAL.inc();
    }

    /// Record a fetch completion.
    pub fn fetch_completed(outcome: &str, latency_ms: f64) {
        FETCHES_COMPLETED_TOTAL.with_label_values(&[outcome]).inc();
        FETCHES_IN_FLIGHT.dec();
        FETCH_LATENCY_MS.observe(latency_ms);
    }

    /// Render the default registry in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
