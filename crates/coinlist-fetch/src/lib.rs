//! Remote market data fetcher for coinlist.
//!
//! Performs the single network call behind the market table: one page of
//! `/coins/markets` for a given `QueryParams`. No caching, no retry.

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::{HttpMarketFetcher, API_KEY_HEADER, DEFAULT_BASE_URL};
pub use error::{FetchError, FetchResult};
pub use fetcher::{BoxFuture, DynMarketFetcher, MarketFetcher, MockMarketFetcher};
