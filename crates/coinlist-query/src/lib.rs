//! Query cache and fetch coordination for the coinlist market table.
//!
//! - `QueryCache`: session-wide display-key -> rows store
//! - `QueryCoordinator`: stale-while-revalidate runs with in-flight
//!   deduplication and error reconciliation
//! - `ErrorReporter`: one-shot failure notification

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod reporter;
pub mod state;

pub use cache::{CacheEntry, QueryCache, Rows};
pub use coordinator::{QueryCoordinator, QueryHandle};
pub use error::{QueryError, QueryResult};
pub use reporter::{
    DynErrorReporter, ErrorReport, ErrorReporter, LogErrorReporter, RecordingErrorReporter,
};
pub use state::{FetchStatus, QueryState};
