//! HTTP client for the markets endpoint.
//!
//! Issues `GET {base}/coins/markets` with the query's filter and pagination
//! translated into `vs_currency`, `order`, `page` and `per_page`.

use crate::error::{FetchError, FetchResult};
use crate::fetcher::{BoxFuture, MarketFetcher};
use coinlist_core::{MarketEntry, QueryParams};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Public REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Header carrying the optional API key.
pub const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the markets endpoint, relative to the base URL.
const MARKETS_PATH: &str = "coins/markets";

/// Error body shapes the endpoint is known to return.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    status: Option<ErrorStatus>,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    #[serde(default)]
    error_message: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .or_else(|| self.status.and_then(|s| s.error_message))
    }
}

/// Client for fetching market pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMarketFetcher {
    /// HTTP client.
    client: Client,
    /// Full markets endpoint URL.
    markets_url: String,
    /// Optional API key sent as `API_KEY_HEADER`.
    api_key: Option<String>,
}

impl HttpMarketFetcher {
    /// Create a fetcher with the default timeout and no API key.
    ///
    /// # Arguments
    /// * `base_url` - API base (e.g., "https://api.coingecko.com/api/v3")
    pub fn new(base_url: impl AsRef<str>) -> FetchResult<Self> {
        Self::with_options(base_url, DEFAULT_TIMEOUT, None)
    }

    /// Create a fetcher with an explicit timeout and optional API key.
    pub fn with_options(
        base_url: impl AsRef<str>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            markets_url: markets_url(base_url.as_ref()),
            api_key,
        })
    }

    /// Full URL of the markets endpoint.
    pub fn markets_url(&self) -> &str {
        &self.markets_url
    }

    /// Fetch one page of market rows.
    pub async fn fetch_markets(&self, params: &QueryParams) -> FetchResult<Vec<MarketEntry>> {
        let query = query_pairs(params);
        debug!(url = %self.markets_url, ?query, "Fetching markets page");

        let mut request = self
            .client
            .get(&self.markets_url)
            .header(CONTENT_TYPE, "application/json")
            .query(&query);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                FetchError::Client(format!("Failed to build request: {e}"))
            } else {
                FetchError::Transport {
                    url: self.markets_url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            // The status line arrived, so a failed status is still a server answer.
            Err(e) if !status.is_success() => {
                warn!(status = status.as_u16(), error = %e, "Failed to read error body");
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    message: None,
                });
            }
            Err(e) => {
                return Err(FetchError::Transport {
                    url: self.markets_url.clone(),
                    reason: format!("Failed to read body: {e}"),
                })
            }
        };

        if !status.is_success() {
            let message = error_message(status, &body);
            warn!(status = status.as_u16(), message = ?message, "Markets request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let entries: Vec<MarketEntry> = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Decode(format!("Failed to parse markets: {e}")))?;

        info!(
            currency = %params.currency,
            order = %params.sort_order,
            page = params.page,
            per_page = params.page_size.get(),
            rows = entries.len(),
            "Fetched markets page"
        );

        Ok(entries)
    }
}

impl MarketFetcher for HttpMarketFetcher {
    fn fetch(&self, params: &QueryParams) -> BoxFuture<'static, FetchResult<Vec<MarketEntry>>> {
        let this = self.clone();
        let params = params.clone();
        Box::pin(async move { this.fetch_markets(&params).await })
    }
}

fn markets_url(base_url: &str) -> String {
    format!("{}/{MARKETS_PATH}", base_url.trim_end_matches('/'))
}

fn query_pairs(params: &QueryParams) -> [(&'static str, String); 4] {
    [
        ("vs_currency", params.currency.clone()),
        ("order", params.sort_order.as_str().to_string()),
        ("page", params.page.to_string()),
        ("per_page", params.page_size.get().to_string()),
    ]
}

/// Extract a human-readable message from an error body, falling back to the
/// status reason phrase.
fn error_message(status: StatusCode, body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .or_else(|| status.canonical_reason().map(str::to_string))
}
