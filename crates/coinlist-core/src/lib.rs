//! Core domain types for the coinlist market table.
//!
//! This crate provides the types shared by the fetch and query layers:
//! - `MarketEntry`: one asset's market snapshot from `/coins/markets`
//! - `QueryParams`, `SortOrder`, `PageSize`: the request shape
//! - `DisplayKey`, `FetchKey`: cache and deduplication identities

pub mod error;
pub mod keys;
pub mod market;
pub mod query;

pub use error::{CoreError, Result};
pub use keys::{build_display_key, build_fetch_key, DisplayKey, FetchKey};
pub use market::MarketEntry;
pub use query::{PageSize, QueryParams, SortOrder};
