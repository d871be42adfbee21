//! Market table session.
//!
//! Holds the table's current filter and pagination and turns input events
//! into coordinator runs.

use coinlist_core::{CoreError, PageSize, QueryParams, SortOrder};
use coinlist_query::{QueryCoordinator, QueryHandle, QueryResult, QueryState, Rows};
use tokio::sync::watch;
use tracing::debug;

/// Input from the table's controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    /// Filter form submitted. Resets to the first page.
    Filter {
        currency: String,
        sort_order: SortOrder,
    },
    /// Pagination control moved to a page.
    Page(u32),
    /// Rows-per-page selector changed. Keeps the current page.
    PageSize(PageSize),
}

/// One market table bound to a coordinator.
pub struct MarketTable {
    coordinator: QueryCoordinator,
    params: QueryParams,
    current: Option<QueryHandle>,
}

impl MarketTable {
    pub fn new(coordinator: QueryCoordinator, params: QueryParams) -> Self {
        Self {
            coordinator,
            params,
            current: None,
        }
    }

    /// Run the query for the current parameters.
    pub fn load(&mut self) -> &QueryHandle {
        let handle = self.coordinator.run(self.params.clone());
        self.current.insert(handle)
    }

    /// Apply an input event. Returns whether a new query was run.
    ///
    /// Events that leave the parameters unchanged do nothing.
    pub fn apply(&mut self, event: TableEvent) -> coinlist_core::Result<bool> {
        let next = match event {
            TableEvent::Filter {
                currency,
                sort_order,
            } => {
                let currency = currency.trim().to_lowercase();
                if currency == self.params.currency && sort_order == self.params.sort_order {
                    self.params.clone()
                } else {
                    QueryParams::new(currency, sort_order, 1, self.params.page_size)
                }
            }
            TableEvent::Page(0) => return Err(CoreError::InvalidPage(0)),
            TableEvent::Page(page) => self.params.with_page(page),
            TableEvent::PageSize(page_size) => self.params.with_page_size(page_size),
        };

        if next == self.params && self.current.is_some() {
            return Ok(false);
        }

        debug!(from = %self.params.fetch_key(), to = %next.fetch_key(), "Table parameters changed");
        self.params = next;
        self.load();
        Ok(true)
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Handle of the latest run, if any.
    pub fn current(&self) -> Option<&QueryHandle> {
        self.current.as_ref()
    }

    /// Snapshot of what the table displays.
    pub fn state(&self) -> QueryState {
        self.coordinator.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.coordinator.subscribe()
    }

    /// Wait for the latest run's fetch. `None` before the first load.
    pub async fn settle(&self) -> Option<QueryResult<Rows>> {
        match &self.current {
            Some(handle) => Some(handle.outcome().await),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinlist_core::MarketEntry;
    use coinlist_fetch::{FetchError, MockMarketFetcher};
    use coinlist_query::QueryError;
    use std::sync::Arc;

    fn entries(prefix: &str, n: usize) -> Vec<MarketEntry> {
        (0..n)
            .map(|i| {
                serde_json::from_value(serde_json::json!({
                    "id": format!("{prefix}-{i}"),
                    "symbol": format!("{prefix}{i}"),
                    "name": format!("{prefix} {i}"),
                    "image": "https://example.invalid/coin.png",
                    "current_price": 1.5,
                    "market_cap": 1000,
                    "market_cap_rank": i + 1,
                    "circulating_supply": 10,
                    "total_supply": null,
                    "max_supply": null
                }))
                .unwrap()
            })
            .collect()
    }

    fn table() -> (Arc<MockMarketFetcher>, MarketTable) {
        let fetcher = Arc::new(MockMarketFetcher::new());
        let coordinator = QueryCoordinator::with_fetcher(fetcher.clone());
        (fetcher, MarketTable::new(coordinator, QueryParams::default()))
    }

    #[tokio::test]
    async fn test_settle_before_load_is_none() {
        let (_, table) = table();
        assert!(table.settle().await.is_none());
        assert!(table.current().is_none());
    }

    #[tokio::test]
    async fn test_load_then_page_change() {
        let (fetcher, mut table) = table();
        fetcher.push_response(Ok(entries("p1", 10)));
        fetcher.push_response(Ok(entries("p2", 10)));

        assert!(table.load().initial_state().is_loading);
        let rows = table.settle().await.unwrap().unwrap();
        assert_eq!(rows.len(), 10);

        assert!(table.apply(TableEvent::Page(2)).unwrap());
        let initial = table.current().unwrap().initial_state().clone();
        assert!(initial.data.is_empty());
        assert_eq!(initial.rows()[0].id, "p1-0");

        table.settle().await.unwrap().unwrap();
        assert_eq!(table.state().rows()[0].id, "p2-0");
        assert_eq!(fetcher.calls()[1].page, 2);
    }

    #[tokio::test]
    async fn test_unchanged_event_does_not_refetch() {
        let (fetcher, mut table) = table();
        table.load();
        table.settle().await.unwrap().unwrap();

        assert!(!table.apply(TableEvent::Page(1)).unwrap());
        assert!(!table.apply(TableEvent::PageSize(PageSize::Ten)).unwrap());
        assert!(!table
            .apply(TableEvent::Filter {
                currency: " USD ".to_string(),
                sort_order: SortOrder::MarketCapDesc,
            })
            .unwrap());
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_page_zero_rejected() {
        let (fetcher, mut table) = table();
        assert_eq!(
            table.apply(TableEvent::Page(0)),
            Err(CoreError::InvalidPage(0))
        );
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(table.params().page, 1);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let (fetcher, mut table) = table();
        table.apply(TableEvent::Page(3)).unwrap();
        table.apply(TableEvent::PageSize(PageSize::Fifty)).unwrap();

        assert!(table
            .apply(TableEvent::Filter {
                currency: "EUR".to_string(),
                sort_order: SortOrder::MarketCapAsc,
            })
            .unwrap());
        assert_eq!(
            table.params(),
            &QueryParams::new("eur", SortOrder::MarketCapAsc, 1, PageSize::Fifty)
        );
        table.settle().await.unwrap().unwrap();
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_page_size_change_keeps_rows_visible() {
        let (fetcher, mut table) = table();
        fetcher.push_response(Ok(entries("ten", 10)));
        table.load();
        table.settle().await.unwrap().unwrap();

        fetcher.pause();
        assert!(table.apply(TableEvent::PageSize(PageSize::Twenty)).unwrap());
        let state = table.state();
        assert_eq!(state.data.len(), 10);
        assert!(state.is_loading);
        assert!(state.is_fetching);

        assert!(fetcher.resolve(1, Ok(entries("twenty", 20))));
        table.settle().await.unwrap().unwrap();
        assert_eq!(table.state().data.len(), 20);
    }

    #[tokio::test]
    async fn test_failure_surfaces_in_state() {
        let (fetcher, mut table) = table();
        fetcher.push_response(Err(FetchError::Status {
            status: 500,
            message: Some("boom".to_string()),
        }));
        table.load();

        let outcome = table.settle().await.unwrap();
        assert!(matches!(outcome, Err(QueryError::Server { status: 500, .. })));
        assert!(table.state().is_error());
    }
}
