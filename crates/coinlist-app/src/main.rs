//! coinlist - market table demo entry point
//!
//! Loads the first page of the market table, walks the configured pages
//! and page size, and logs the rendered rows and state transitions.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Paginated cryptocurrency market table
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via COINLIST_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    coinlist_telemetry::init_logging()?;

    info!("Starting coinlist v{}", env!("CARGO_PKG_VERSION"));

    let config = coinlist_app::AppConfig::load(args.config.as_deref())?;
    info!(
        base_url = %config.base_url,
        currency = %config.query.currency,
        order = %config.query.sort_order,
        page_size = %config.query.page_size,
        "Configuration loaded"
    );

    let app = coinlist_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
