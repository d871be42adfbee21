//! Fetch error types.
//!
//! These are the raw failure kinds surfaced by a fetcher. Classification
//! into what the table shows happens in the query layer.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request was sent (or attempted) but no response came back.
    #[error("No response from {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Remote answered with a failure status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    /// Response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Request could not be built locally.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// True when no response was received at all.
    pub fn is_no_response(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
