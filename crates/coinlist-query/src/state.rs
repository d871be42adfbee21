//! Observable query state.

use crate::cache::Rows;
use crate::error::QueryError;
use coinlist_core::{FetchKey, MarketEntry};
use std::fmt;
use std::sync::Arc;

/// Position of a fetch key in its lifecycle.
///
/// `Success` and `Error` are terminal for one fetch; a new run for the same
/// key moves it back to `Fetching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
    Success,
    Error,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Fetching => write!(f, "FETCHING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// What the presentation layer renders for the current query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    /// Fetch key this state belongs to. `None` before the first run.
    pub fetch_key: Option<FetchKey>,
    /// Rows for the current display key: the cached value when the run
    /// started, then the fetched value. Empty if neither exists.
    pub data: Rows,
    /// No successful result has ever been seen for this fetch key.
    pub is_loading: bool,
    /// A fetch for this key is outstanding.
    pub is_fetching: bool,
    /// Classified failure of the last fetch, if it failed.
    pub error: Option<QueryError>,
    /// Rows displayed before this run, kept while `data` is empty.
    pub previous_data: Option<Rows>,
}

impl QueryState {
    /// State before any run.
    pub fn idle() -> Self {
        Self {
            fetch_key: None,
            data: Arc::new(Vec::new()),
            is_loading: false,
            is_fetching: false,
            error: None,
            previous_data: None,
        }
    }

    /// Rows to render: `data`, or the previously displayed rows while the
    /// current key has nothing to show.
    pub fn rows(&self) -> &[MarketEntry] {
        match &self.previous_data {
            Some(previous) if self.data.is_empty() => previous,
            _ => &self.data,
        }
    }

    /// Whether `rows()` is showing rows from an earlier query.
    pub fn is_previous_data(&self) -> bool {
        self.data.is_empty() && self.previous_data.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::idle()
    }
}
