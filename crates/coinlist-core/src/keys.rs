//! Cache and request identities.
//!
//! Two related identities are derived from `QueryParams`:
//! - `DisplayKey` (`currency`, `sort_order`, `page`) selects which cached rows
//!   can be shown immediately. Page size is excluded so rows fetched at a
//!   previous page size are shown while the new size loads.
//! - `FetchKey` (`DisplayKey` + `page_size`) decides whether an equivalent
//!   request is already in flight. Changing only the page size yields a new
//!   fetch key and therefore a new network call.

use crate::query::{PageSize, QueryParams, SortOrder};
use serde::{Deserialize, Serialize};
use std::fmt;

const KEY_NAMESPACE: &str = "markets";

/// Identity of a cached page of rows, independent of page size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayKey {
    pub currency: String,
    pub sort_order: SortOrder,
    pub page: u32,
}

impl fmt::Display for DisplayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{KEY_NAMESPACE}:{}:{}:{}",
            self.currency, self.sort_order, self.page
        )
    }
}

/// Identity of a network request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchKey {
    pub display: DisplayKey,
    pub page_size: PageSize,
}

impl FetchKey {
    /// The display key this request populates.
    pub fn display_key(&self) -> &DisplayKey {
        &self.display
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.display, self.page_size)
    }
}

/// Derive the display key. Pure.
pub fn build_display_key(params: &QueryParams) -> DisplayKey {
    DisplayKey {
        currency: params.currency.clone(),
        sort_order: params.sort_order,
        page: params.page,
    }
}

/// Derive the fetch key. Pure.
pub fn build_fetch_key(params: &QueryParams) -> FetchKey {
    FetchKey {
        display: build_display_key(params),
        page_size: params.page_size,
    }
}
