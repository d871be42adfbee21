//! Query error taxonomy.
//!
//! Raw `FetchError`s are classified here into what the table reports.

use coinlist_fetch::FetchError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Remote responded with a failure status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Request sent, no response received.
    #[error("No response received from server")]
    NoResponse,

    /// Anything else, including local failures.
    #[error("Unexpected error: {message}")]
    Unknown { message: String },
}

impl QueryError {
    /// Classify a raw fetch failure.
    pub fn classify(err: &FetchError) -> Self {
        match err {
            FetchError::Status { status, message } => Self::Server {
                status: *status,
                message: message
                    .clone()
                    .unwrap_or_else(|| format!("HTTP {status}")),
            },
            FetchError::Transport { .. } => Self::NoResponse,
            FetchError::Decode(_) | FetchError::Client(_) => Self::Unknown {
                message: err.to_string(),
            },
        }
    }

    /// Metric label for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Server { .. } => "server_error",
            Self::NoResponse => "no_response",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl From<FetchError> for QueryError {
    fn from(err: FetchError) -> Self {
        Self::classify(&err)
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
