//! Prometheus metrics and structured logging for coinlist.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Counters and histograms for the query cache and fetch coordination

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
