//! Query coordination.
//!
//! `QueryCoordinator::run` binds the current query to its lifecycle:
//! 1. Publish the cached rows for the display key synchronously.
//! 2. Attach to an in-flight fetch for the same fetch key, or start one.
//! 3. On completion, update the cache (success only), report failures once,
//!    and publish the outcome if the key is still the active query.
//!
//! There is no retry, no refetch on focus and no cancellation. A run for a
//! different key leaves older fetches running; their successes still land
//! in the cache under their own display key, but they no longer touch the
//! displayed state.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use coinlist_core::{DisplayKey, FetchKey, MarketEntry, QueryParams};
use coinlist_fetch::{BoxFuture, DynMarketFetcher};
use coinlist_telemetry::Metrics;
use dashmap::{DashMap, DashSet};
use futures_util::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{QueryCache, Rows};
use crate::error::{QueryError, QueryResult};
use crate::reporter::{DynErrorReporter, LogErrorReporter};
use crate::state::{FetchStatus, QueryState};

type SharedOutcome = Shared<BoxFuture<'static, QueryResult<Rows>>>;

/// An outstanding fetch that later runs can attach to.
struct InFlight {
    id: u64,
    outcome: SharedOutcome,
}

struct Inner {
    fetcher: DynMarketFetcher,
    cache: Arc<QueryCache>,
    reporter: DynErrorReporter,
    /// Outstanding fetches by fetch key.
    in_flight: Mutex<HashMap<FetchKey, InFlight>>,
    /// Lifecycle position per fetch key.
    statuses: DashMap<FetchKey, FetchStatus>,
    /// Fetch keys that have completed successfully at least once.
    succeeded: DashSet<FetchKey>,
    /// Displayed state of the active query.
    state_tx: watch::Sender<QueryState>,
    next_fetch_id: AtomicU64,
}

impl Inner {
    /// Reconcile a finished fetch. Runs on the spawned fetch task.
    ///
    /// The in-flight entry is removed and the outcome published under the
    /// `in_flight` lock, the same lock `run` publishes under.
    fn complete(
        &self,
        fetch_id: u64,
        key: &FetchKey,
        result: QueryResult<Vec<MarketEntry>>,
        started: Instant,
    ) -> QueryResult<Rows> {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(key).is_some_and(|f| f.id == fetch_id) {
            in_flight.remove(key);
        }

        match result {
            Ok(entries) => {
                let rows: Rows = Arc::new(entries);
                self.cache.set(key.display.clone(), rows.clone());
                self.statuses.insert(key.clone(), FetchStatus::Success);
                self.succeeded.insert(key.clone());

                let applied = self.state_tx.send_if_modified(|state| {
                    if state.fetch_key.as_ref() != Some(key) {
                        return false;
                    }
                    state.data = rows.clone();
                    state.is_loading = false;
                    state.is_fetching = false;
                    state.error = None;
                    state.previous_data = None;
                    true
                });
                drop(in_flight);

                Metrics::fetch_completed("success", latency_ms);
                info!(key = %key, rows = rows.len(), latency_ms, applied, "Fetch succeeded");
                Ok(rows)
            }
            Err(err) => {
                self.statuses.insert(key.clone(), FetchStatus::Error);

                let applied = self.state_tx.send_if_modified(|state| {
                    if state.fetch_key.as_ref() != Some(key) {
                        return false;
                    }
                    state.is_loading = false;
                    state.is_fetching = false;
                    state.error = Some(err.clone());
                    true
                });
                drop(in_flight);

                Metrics::fetch_completed(err.kind(), latency_ms);
                self.reporter.report(key, &err);
                warn!(key = %key, error = %err, latency_ms, applied, "Fetch failed");
                Err(err)
            }
        }
    }
}

fn fetch_panicked() -> QueryError {
    QueryError::Unknown {
        message: "fetch panicked".to_string(),
    }
}

/// Coordinates market table queries over a shared cache.
///
/// Cheap to clone; clones share the cache, in-flight map and displayed
/// state. `run` spawns onto the current tokio runtime.
#[derive(Clone)]
pub struct QueryCoordinator {
    inner: Arc<Inner>,
}

impl QueryCoordinator {
    /// Create a coordinator over an existing cache.
    pub fn new(
        fetcher: DynMarketFetcher,
        cache: Arc<QueryCache>,
        reporter: DynErrorReporter,
    ) -> Self {
        let (state_tx, _) = watch::channel(QueryState::idle());
        Self {
            inner: Arc::new(Inner {
                fetcher,
                cache,
                reporter,
                in_flight: Mutex::new(HashMap::new()),
                statuses: DashMap::new(),
                succeeded: DashSet::new(),
                state_tx,
                next_fetch_id: AtomicU64::new(0),
            }),
        }
    }

    /// Create a coordinator with a fresh cache that logs failures.
    pub fn with_fetcher(fetcher: DynMarketFetcher) -> Self {
        Self::new(
            fetcher,
            Arc::new(QueryCache::new()),
            Arc::new(LogErrorReporter),
        )
    }

    /// Run a query.
    ///
    /// Returns before any network I/O with the initial state already
    /// published to subscribers.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn run(&self, params: QueryParams) -> QueryHandle {
        let display_key = params.display_key();
        let fetch_key = params.fetch_key();

        let mut in_flight = self.inner.in_flight.lock();

        let cached = self.inner.cache.get(&display_key);
        Metrics::cache_lookup(cached.is_some());
        let is_loading = !self.inner.succeeded.contains(&fetch_key);
        let data = cached.unwrap_or_else(|| Arc::new(Vec::new()));

        let mut initial = QueryState::idle();
        self.inner.state_tx.send_modify(|state| {
            let shown = if state.data.is_empty() {
                state.previous_data.clone()
            } else {
                Some(state.data.clone())
            };
            *state = QueryState {
                fetch_key: Some(fetch_key.clone()),
                previous_data: if data.is_empty() { shown } else { None },
                data,
                is_loading,
                is_fetching: true,
                error: None,
            };
            initial = state.clone();
        });

        let (outcome, deduplicated) = self.attach_or_start(&mut in_flight, &params, &fetch_key);
        drop(in_flight);

        debug!(
            key = %fetch_key,
            cached_rows = initial.data.len(),
            is_loading,
            deduplicated,
            "Query started"
        );

        QueryHandle {
            params,
            display_key,
            fetch_key,
            initial,
            deduplicated,
            outcome,
        }
    }

    /// Attach to the in-flight fetch for `key`, or issue a new one.
    ///
    /// Caller holds the `in_flight` lock.
    fn attach_or_start(
        &self,
        in_flight: &mut HashMap<FetchKey, InFlight>,
        params: &QueryParams,
        key: &FetchKey,
    ) -> (SharedOutcome, bool) {
        if let Some(existing) = in_flight.get(key) {
            Metrics::fetch_deduplicated();
            return (existing.outcome.clone(), true);
        }

        let request = self.request(params);
        let fetch_id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        self.inner.statuses.insert(key.clone(), FetchStatus::Fetching);
        Metrics::fetch_started();
        info!(key = %key, fetch_id, "Starting fetch");

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            let result = request.await;
            inner.complete(fetch_id, &task_key, result, started)
        });

        let outcome: BoxFuture<'static, QueryResult<Rows>> = Box::pin(async move {
            handle.await.unwrap_or_else(|e| {
                Err(QueryError::Unknown {
                    message: format!("fetch task failed: {e}"),
                })
            })
        });
        let outcome = outcome.shared();

        in_flight.insert(
            key.clone(),
            InFlight {
                id: fetch_id,
                outcome: outcome.clone(),
            },
        );
        (outcome, false)
    }

    /// Call the fetcher. A panic in the call or in its future resolves to
    /// `QueryError::Unknown`.
    fn request(&self, params: &QueryParams) -> BoxFuture<'static, QueryResult<Vec<MarketEntry>>> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.inner.fetcher.fetch(params))) {
            Ok(request) => Box::pin(async move {
                match AssertUnwindSafe(request).catch_unwind().await {
                    Ok(result) => result.map_err(QueryError::from),
                    Err(_) => Err(fetch_panicked()),
                }
            }),
            Err(_) => {
                warn!(
                    currency = %params.currency,
                    page = params.page,
                    "Fetcher panicked before returning a request"
                );
                Box::pin(async { Err::<Vec<MarketEntry>, _>(fetch_panicked()) })
            }
        }
    }

    /// Observe the displayed state of the active query.
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.inner.state_tx.subscribe()
    }

    /// Snapshot of the displayed state.
    pub fn state(&self) -> QueryState {
        self.inner.state_tx.borrow().clone()
    }

    /// Lifecycle position of a fetch key.
    pub fn status(&self, key: &FetchKey) -> FetchStatus {
        self.inner
            .statuses
            .get(key)
            .map(|s| *s)
            .unwrap_or_default()
    }

    /// Whether a fetch for `key` is outstanding.
    pub fn is_in_flight(&self, key: &FetchKey) -> bool {
        self.inner.in_flight.lock().contains_key(key)
    }

    /// Number of outstanding fetches.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// The session cache.
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.inner.cache
    }
}

/// One `run` call's view of its query.
///
/// Every handle for the same fetch key resolves with the same outcome.
pub struct QueryHandle {
    params: QueryParams,
    display_key: DisplayKey,
    fetch_key: FetchKey,
    initial: QueryState,
    deduplicated: bool,
    outcome: SharedOutcome,
}

impl QueryHandle {
    /// State published synchronously by `run`.
    pub fn initial_state(&self) -> &QueryState {
        &self.initial
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn display_key(&self) -> &DisplayKey {
        &self.display_key
    }

    pub fn fetch_key(&self) -> &FetchKey {
        &self.fetch_key
    }

    /// Whether this run attached to an already outstanding fetch.
    pub fn is_deduplicated(&self) -> bool {
        self.deduplicated
    }

    /// Wait for the fetch this run is attached to.
    pub async fn outcome(&self) -> QueryResult<Rows> {
        self.outcome.clone().await
    }
}

impl std::fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandle")
            .field("fetch_key", &self.fetch_key)
            .field("deduplicated", &self.deduplicated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingErrorReporter;
    use coinlist_core::{PageSize, SortOrder};
    use coinlist_fetch::{FetchError, MockMarketFetcher};
    use rust_decimal_macros::dec;

    fn params(page: u32, page_size: PageSize) -> QueryParams {
        QueryParams::new("usd", SortOrder::MarketCapDesc, page, page_size)
    }

    fn rows(prefix: &str, n: usize) -> Vec<MarketEntry> {
        (0..n)
            .map(|i| MarketEntry {
                id: format!("{prefix}-{i}"),
                symbol: format!("{prefix}{i}"),
                name: format!("{prefix} {i}"),
                image_url: String::new(),
                current_price: Some(dec!(1.5)),
                market_cap: Some(dec!(1000)),
                market_cap_rank: Some(i as u32 + 1),
                circulating_supply: Some(dec!(10)),
                total_supply: None,
                max_supply: None,
                extra: Default::default(),
            })
            .collect()
    }

    fn setup() -> (
        QueryCoordinator,
        Arc<MockMarketFetcher>,
        Arc<RecordingErrorReporter>,
    ) {
        let fetcher = Arc::new(MockMarketFetcher::new());
        let reporter = Arc::new(RecordingErrorReporter::new());
        let coordinator = QueryCoordinator::new(
            fetcher.clone(),
            Arc::new(QueryCache::new()),
            reporter.clone(),
        );
        (coordinator, fetcher, reporter)
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (coordinator, fetcher, _) = setup();
        fetcher.pause();
        let p = params(1, PageSize::Ten);
        let key = p.fetch_key();

        assert_eq!(coordinator.status(&key), FetchStatus::Idle);

        let handle = coordinator.run(p);
        assert_eq!(coordinator.status(&key), FetchStatus::Fetching);
        assert!(coordinator.is_in_flight(&key));

        let mut waiting = tokio_test::task::spawn(handle.outcome());
        tokio_test::assert_pending!(waiting.poll());
        drop(waiting);

        fetcher.resolve(0, Ok(rows("a", 2)));
        handle.outcome().await.unwrap();
        assert_eq!(coordinator.status(&key), FetchStatus::Success);
        assert!(!coordinator.is_in_flight(&key));
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_refetch_after_success_restarts_fetching() {
        let (coordinator, fetcher, _) = setup();
        fetcher.push_response(Ok(rows("a", 3)));
        let p = params(1, PageSize::Ten);

        coordinator.run(p.clone()).outcome().await.unwrap();

        fetcher.pause();
        let again = coordinator.run(p.clone());
        assert_eq!(fetcher.call_count(), 2);
        assert!(!again.is_deduplicated());
        assert_eq!(coordinator.status(&p.fetch_key()), FetchStatus::Fetching);

        let initial = again.initial_state();
        assert_eq!(initial.data.len(), 3);
        assert!(!initial.is_loading);
        assert!(initial.is_fetching);

        fetcher.resolve(1, Ok(rows("b", 3)));
        let refreshed = again.outcome().await.unwrap();
        assert_eq!(refreshed[0].id, "b-0");
        assert_eq!(coordinator.state().data[0].id, "b-0");
    }

    #[tokio::test]
    async fn test_error_status_then_refetch() {
        let (coordinator, fetcher, reporter) = setup();
        let p = params(1, PageSize::Ten);
        fetcher.push_response(Err(FetchError::Decode("truncated".to_string())));

        let err = coordinator.run(p.clone()).outcome().await.unwrap_err();
        assert!(matches!(err, QueryError::Unknown { .. }));
        assert_eq!(coordinator.status(&p.fetch_key()), FetchStatus::Error);
        assert_eq!(reporter.count(), 1);

        fetcher.push_response(Ok(rows("a", 1)));
        let handle = coordinator.run(p.clone());
        assert!(handle.initial_state().is_loading);
        assert!(handle.initial_state().error.is_none());
        handle.outcome().await.unwrap();
        assert_eq!(coordinator.status(&p.fetch_key()), FetchStatus::Success);
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn test_outcome_can_be_awaited_twice() {
        let (coordinator, fetcher, _) = setup();
        fetcher.push_response(Ok(rows("a", 2)));

        let handle = coordinator.run(params(1, PageSize::Ten));
        let first = handle.outcome().await.unwrap();
        let second = handle.outcome().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_fetch_completes_without_awaiting_handle() {
        let (coordinator, fetcher, _) = setup();
        fetcher.push_response(Ok(rows("a", 4)));
        let p = params(1, PageSize::Ten);
        let mut rx = coordinator.subscribe();

        drop(coordinator.run(p.clone()));

        rx.wait_for(|state| !state.is_fetching).await.unwrap();
        assert_eq!(coordinator.cache().get(&p.display_key()).unwrap().len(), 4);
    }
}
