//! Error types for coinlist-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid page size: {0} (expected 10, 20 or 50)")]
    InvalidPageSize(u32),

    #[error("Invalid sort order: {0}")]
    InvalidSortOrder(String),

    #[error("Invalid page: {0} (pages start at 1)")]
    InvalidPage(u32),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
