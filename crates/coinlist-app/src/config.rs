//! Application configuration.

use crate::error::{AppError, AppResult};
use coinlist_core::{PageSize, QueryParams, SortOrder};
use coinlist_fetch::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "COINLIST_CONFIG";

/// Config file used when neither the flag nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Initial filter and pagination for the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefaults {
    /// Quote currency. Default: "usd".
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Default: market_cap_desc.
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Default: 10.
    #[serde(default)]
    pub page_size: PageSize,
}

fn default_currency() -> String {
    "usd".to_string()
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            sort_order: SortOrder::default(),
            page_size: PageSize::default(),
        }
    }
}

/// Walk-through performed by the demo binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pages to walk, starting at page 1. At least 1. Default: 2.
    #[serde(default = "default_pages")]
    pub pages: u32,
    /// Page size to switch to at the end, if any.
    #[serde(default)]
    pub resize_to: Option<PageSize>,
}

fn default_pages() -> u32 {
    2
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pages: default_pages(),
            resize_to: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP request timeout (seconds). Default: 10.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Optional API key sent with each request.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub query: QueryDefaults,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
            query: QueryDefaults::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, else `COINLIST_CONFIG`, else the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("base_url must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.session.pages == 0 {
            return Err(AppError::Config(
                "session.pages must be at least 1".to_string(),
            ));
        }
        if self.query.currency.trim().is_empty() {
            return Err(AppError::Config(
                "query.currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parameters for the first page.
    pub fn initial_params(&self) -> QueryParams {
        QueryParams::new(
            self.query.currency.clone(),
            self.query.sort_order,
            1,
            self.query.page_size,
        )
    }
}
