//! Query parameters for the market table.
//!
//! `QueryParams` is the full request shape sent to `/coins/markets`.
//! Filter fields (`currency`, `sort_order`) come from the filter form,
//! pagination fields (`page`, `page_size`) from the pagination control.

use crate::error::{CoreError, Result};
use crate::keys::{build_display_key, build_fetch_key, DisplayKey, FetchKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort order accepted by the markets endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Largest market cap first.
    #[default]
    MarketCapDesc,
    /// Smallest market cap first.
    MarketCapAsc,
}

impl SortOrder {
    /// Wire value used in the `order` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketCapDesc => "market_cap_desc",
            Self::MarketCapAsc => "market_cap_asc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "market_cap_desc" => Ok(Self::MarketCapDesc),
            "market_cap_asc" => Ok(Self::MarketCapAsc),
            other => Err(CoreError::InvalidSortOrder(other.to_string())),
        }
    }
}

/// Rows per page offered by the pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    #[default]
    Ten,
    Twenty,
    Fifty,
}

impl PageSize {
    /// All selectable sizes, in display order.
    pub const ALL: [PageSize; 3] = [PageSize::Ten, PageSize::Twenty, PageSize::Fifty];

    /// Number of rows, as sent in `per_page`.
    pub fn get(&self) -> u32 {
        match self {
            Self::Ten => 10,
            Self::Twenty => 20,
            Self::Fifty => 50,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            10 => Ok(Self::Ten),
            20 => Ok(Self::Twenty),
            50 => Ok(Self::Fifty),
            other => Err(CoreError::InvalidPageSize(other)),
        }
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Full request shape for one page of market data.
///
/// Values are trusted: the pagination control only emits pages >= 1 and the
/// filter form only emits known currencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryParams {
    /// Quote currency code (e.g., "usd", "eur").
    pub currency: String,
    pub sort_order: SortOrder,
    /// 1-based page number.
    pub page: u32,
    pub page_size: PageSize,
}

impl QueryParams {
    pub fn new(
        currency: impl Into<String>,
        sort_order: SortOrder,
        page: u32,
        page_size: PageSize,
    ) -> Self {
        Self {
            currency: currency.into(),
            sort_order,
            page,
            page_size,
        }
    }

    /// Same filters, different page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Same filters and page, different page size.
    pub fn with_page_size(&self, page_size: PageSize) -> Self {
        Self {
            page_size,
            ..self.clone()
        }
    }

    /// Cache identity used to seed stale rows.
    pub fn display_key(&self) -> DisplayKey {
        build_display_key(self)
    }

    /// Request identity used for deduplication.
    pub fn fetch_key(&self) -> FetchKey {
        build_fetch_key(self)
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::new("usd", SortOrder::default(), 1, PageSize::default())
    }
}
