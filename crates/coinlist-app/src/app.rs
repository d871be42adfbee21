//! Application wiring and the demo table walk-through.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::session::{MarketTable, TableEvent};
use coinlist_core::MarketEntry;
use coinlist_fetch::{DynMarketFetcher, HttpMarketFetcher};
use coinlist_query::{LogErrorReporter, QueryCache, QueryCoordinator, QueryState};
use coinlist_telemetry::Metrics;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    coordinator: QueryCoordinator,
}

impl Application {
    /// Create an application backed by the HTTP fetcher.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let fetcher = HttpMarketFetcher::with_options(
            &config.base_url,
            config.request_timeout(),
            config.api_key.clone(),
        )?;
        info!(url = %fetcher.markets_url(), "Market fetcher ready");
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create an application over any fetcher.
    pub fn with_fetcher(config: AppConfig, fetcher: DynMarketFetcher) -> Self {
        let cache = Arc::new(QueryCache::new());
        let coordinator = QueryCoordinator::new(fetcher, cache, Arc::new(LogErrorReporter));
        Self {
            config,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &QueryCoordinator {
        &self.coordinator
    }

    /// Walk the configured pages, then apply the configured page size.
    ///
    /// Query failures are logged and do not stop the walk.
    pub async fn run(&self) -> AppResult<()> {
        let mut table = MarketTable::new(self.coordinator.clone(), self.config.initial_params());
        let watcher = spawn_state_logger(&table);

        table.load();
        self.settle_and_render(&table).await;

        for page in 2..=self.config.session.pages {
            table.apply(TableEvent::Page(page))?;
            self.settle_and_render(&table).await;
        }

        if let Some(page_size) = self.config.session.resize_to {
            if table.apply(TableEvent::PageSize(page_size))? {
                self.settle_and_render(&table).await;
            }
        }

        watcher.abort();

        info!(
            cached_pages = self.coordinator.cache().len(),
            in_flight = self.coordinator.in_flight_count(),
            "Session finished"
        );
        let metrics = Metrics::gather_text()?;
        debug!(%metrics, "Final metrics");
        Ok(())
    }

    async fn settle_and_render(&self, table: &MarketTable) {
        let key = table.params().fetch_key();
        match table.settle().await {
            Some(Ok(rows)) => info!(key = %key, rows = rows.len(), "Page loaded"),
            Some(Err(e)) => warn!(key = %key, kind = e.kind(), error = %e, "Page failed"),
            None => {}
        }
        render(&table.state());
    }
}

fn spawn_state_logger(table: &MarketTable) -> JoinHandle<()> {
    let mut rx = table.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            debug!(
                key = ?state.fetch_key.as_ref().map(ToString::to_string),
                rows = state.data.len(),
                previous = state.is_previous_data(),
                is_loading = state.is_loading,
                is_fetching = state.is_fetching,
                error = ?state.error,
                "Table state changed"
            );
        }
    })
}

fn render(state: &QueryState) {
    if state.is_previous_data() {
        debug!("Showing previous page while loading");
    }
    for entry in state.rows() {
        info!("{}", format_row(entry));
    }
}

/// One table line: rank, symbol, name, price, market cap.
pub fn format_row(entry: &MarketEntry) -> String {
    format!(
        "{:>4}  {:<8} {:<20} {:>16} {:>20}",
        or_dash(entry.market_cap_rank),
        entry.symbol.to_uppercase(),
        entry.name,
        or_dash(entry.current_price),
        or_dash(entry.market_cap)
    )
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
