//! One-shot failure notification.
//!
//! The coordinator calls the reporter exactly once per failed fetch, no
//! matter how many runs were attached to it.

use crate::error::QueryError;
use chrono::{DateTime, Utc};
use coinlist_core::FetchKey;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::error;

/// Receives failed fetches.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, key: &FetchKey, error: &QueryError);
}

/// Arc wrapper for ErrorReporter trait objects.
pub type DynErrorReporter = Arc<dyn ErrorReporter>;

/// Emits each failure as an error event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn report(&self, key: &FetchKey, err: &QueryError) {
        error!(key = %key, kind = err.kind(), error = %err, "Failed to load market data");
    }
}

/// A recorded failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub key: FetchKey,
    pub error: QueryError,
    pub reported_at: DateTime<Utc>,
}

/// Collects failures for inspection.
#[derive(Debug, Default)]
pub struct RecordingErrorReporter {
    reports: Mutex<Vec<ErrorReport>>,
}

impl RecordingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get recorded reports.
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn report(&self, key: &FetchKey, error: &QueryError) {
        self.reports.lock().push(ErrorReport {
            key: key.clone(),
            error: error.clone(),
            reported_at: Utc::now(),
        });
    }
}
