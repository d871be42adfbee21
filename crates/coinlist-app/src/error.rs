//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(#[from] coinlist_core::CoreError),

    #[error("Fetcher error: {0}")]
    Fetch(#[from] coinlist_fetch::FetchError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] coinlist_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
