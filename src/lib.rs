//! # ergast-extract
//!
//! Extracts paginated motor racing data (circuits, constructors, drivers, race schedules,
//! seasons) from an Ergast-style REST API into flat CSV tables.
//!
//! ## How it works
//!
//! - [`fetcher`] issues one GET per page with `limit`/`offset` query parameters
//! - [`normalize`] flattens each JSON or XML page into rows and reads its pagination metadata
//! - [`collector`] walks the pages of one endpoint until `offset >= total`
//! - [`aggregator`] repeats the collection once per season and tags rows with the season
//! - [`export`] writes the resulting [`Table`] as CSV
//!
//! A failing page or season never discards rows that were already collected.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ergast_extract::{Config, Dataset, ExtractRequest, extract};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let request = ExtractRequest::new(Dataset::Constructors)
//!         .per_season(2020, 2023)
//!         .with_output("data/constructors");
//!
//!     let report = extract::run(&config, &request, CancellationToken::new()).await?;
//!     println!("{} rows written to {}", report.rows, report.output.display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Per-season repetition of a collection
pub mod aggregator;
/// Paginated collection of one endpoint
pub mod collector;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// CSV output
pub mod export;
/// Dataset presets and the end-to-end extraction run
pub mod extract;
/// Page retrieval over HTTP
pub mod fetcher;
/// JSON and XML page normalizers
pub mod normalize;
/// Retry logic with exponential backoff
pub mod retry;
/// Flat records and tables
pub mod table;
/// Core types
pub mod types;

// Re-export commonly used types
pub use aggregator::{PeriodFailure, RangeAggregator, RangeCollection};
pub use collector::{Collection, PaginatedCollector};
pub use config::{Config, RetryConfig};
pub use error::{Error, Result};
pub use extract::{Dataset, ExtractFailure, ExtractReport, ExtractRequest};
pub use fetcher::{HttpFetcher, PageSource};
pub use normalize::{JsonNormalizer, NormalizedPage, Normalizer, XmlNormalizer};
pub use table::{Record, Table, Value};
pub use types::{Cursor, Encoding, Endpoint, Page, PageMeta, Resource};

use tokio_util::sync::CancellationToken;

/// Cancel `cancel` when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The collection loop checks the token before every fetch, so a run stops after the
/// page in flight and still writes what it has.
pub fn cancel_on_signal(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => cancel.cancel(),
            _ = cancel.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal, stopping after current page");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C), stopping after current page");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C signal, stopping after current page");
            } else {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal, stopping after current page");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
