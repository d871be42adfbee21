//! Market fetcher trait.
//!
//! Abstracts the network call so the query layer can be driven by the HTTP
//! client in production and by `MockMarketFetcher` in tests.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use coinlist_core::{MarketEntry, QueryParams};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{FetchError, FetchResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Fetches one page of market rows.
///
/// The returned future owns everything it needs, so callers can spawn it
/// and the call itself happens synchronously in `fetch`.
pub trait MarketFetcher: Send + Sync {
    /// Single attempt, no retry. Must not touch shared state.
    fn fetch(&self, params: &QueryParams) -> BoxFuture<'static, FetchResult<Vec<MarketEntry>>>;
}

/// Arc wrapper for MarketFetcher trait objects.
pub type DynMarketFetcher = Arc<dyn MarketFetcher>;

type PendingReply = oneshot::Sender<FetchResult<Vec<MarketEntry>>>;

/// Mock fetcher for testing.
///
/// By default each call pops the next queued response (or returns an empty
/// page). When paused, calls stay pending until resolved by call index.
#[derive(Debug, Default)]
pub struct MockMarketFetcher {
    /// Recorded calls for verification.
    calls: Mutex<Vec<QueryParams>>,
    /// Responses returned in order while not paused.
    responses: Mutex<VecDeque<FetchResult<Vec<MarketEntry>>>>,
    /// Whether new calls are held.
    paused: AtomicBool,
    /// Held calls by call index.
    pending: Mutex<Vec<(usize, PendingReply)>>,
}

impl MockMarketFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unpaused call.
    pub fn push_response(&self, response: FetchResult<Vec<MarketEntry>>) {
        self.responses.lock().push_back(response);
    }

    /// Hold subsequent calls until resolved.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Answer subsequent calls immediately again.
    pub fn unpause(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Complete a held call. Returns false if no such call is pending.
    pub fn resolve(&self, call_index: usize, response: FetchResult<Vec<MarketEntry>>) -> bool {
        let reply = {
            let mut pending = self.pending.lock();
            pending
                .iter()
                .position(|(idx, _)| *idx == call_index)
                .map(|pos| pending.remove(pos).1)
        };
        match reply {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Number of held calls.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Get recorded calls.
    pub fn calls(&self) -> Vec<QueryParams> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl MarketFetcher for MockMarketFetcher {
    fn fetch(&self, params: &QueryParams) -> BoxFuture<'static, FetchResult<Vec<MarketEntry>>> {
        let call_index = {
            let mut calls = self.calls.lock();
            calls.push(params.clone());
            calls.len() - 1
        };

        if self.paused.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().push((call_index, tx));
            Box::pin(async move {
                rx.await.unwrap_or_else(|_| {
                    Err(FetchError::Transport {
                        url: "mock".to_string(),
                        reason: "pending call dropped".to_string(),
                    })
                })
            })
        } else {
            let response = self
                .responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()));
            Box::pin(async move { response })
        }
    }
}
