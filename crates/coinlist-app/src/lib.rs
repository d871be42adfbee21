//! Market table session and entry point for coinlist.
//!
//! Wires the HTTP fetcher, session cache and query coordinator together and
//! drives them from table input events:
//! - Filter changes (currency, sort order)
//! - Pagination changes (page, page size)

pub mod app;
pub mod config;
pub mod error;
pub mod session;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::{MarketTable, TableEvent};
