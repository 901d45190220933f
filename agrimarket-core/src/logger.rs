//! Structured logging for the market price service.
//!
//! Provides subscriber setup, correlation IDs, and named structured events
//! on top of `tracing`. Event names are stable so log pipelines can match on
//! them:
//!
//! - `DATASET_LOADED` / `DATASET_LOAD_FAILED`
//! - `PRICE_ORDER_VIOLATIONS`
//! - `SNAPSHOT_SWAPPED`
//! - `QUERY_EXECUTED` / `QUERY_FAILED`

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::data_loader::LoadReport;

/// Global correlation ID counter.
static CORRELATION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (e.g. `"info"`,
/// `"agrimarket_core=debug"`) is used. Returns `false` if a subscriber was
/// already installed, which is harmless.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Generate a new correlation ID.
pub fn new_correlation_id() -> u64 {
    CORRELATION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Per-query logger carrying a correlation ID.
#[derive(Debug, Clone)]
pub struct QueryLogger {
    correlation_id: u64,
    query: String,
}

impl QueryLogger {
    /// Start a logger for one query with a fresh correlation ID.
    pub fn start(query: &str) -> Self {
        let logger = Self {
            correlation_id: new_correlation_id(),
            query: query.to_string(),
        };
        debug!(cid = logger.correlation_id, query = %logger.query, "QUERY_STARTED");
        logger
    }

    /// Get the current correlation ID.
    pub fn correlation_id(&self) -> u64 {
        self.correlation_id
    }

    /// Log a successful query.
    pub fn log_executed(&self, elapsed_us: u128) {
        info!(
            cid = self.correlation_id,
            query = %self.query,
            elapsed_us,
            "QUERY_EXECUTED"
        );
    }

    /// Log a failed query. `cause` is the full internal error text.
    pub fn log_failed(&self, kind: &str, cause: &str) {
        if kind == "internal" {
            error!(cid = self.correlation_id, query = %self.query, kind, cause, "QUERY_FAILED");
        } else {
            warn!(cid = self.correlation_id, query = %self.query, kind, cause, "QUERY_FAILED");
        }
    }
}

/// Log a dataset load.
pub fn log_dataset_loaded(dataset: &str, source: &str, report: &LoadReport) {
    info!(
        dataset,
        source,
        total = report.total_rows,
        loaded = report.loaded_rows,
        dropped = report.dropped_rows,
        "DATASET_LOADED"
    );
}

/// Log a dataset that could not be loaded and fell back to empty.
pub fn log_dataset_load_failed(dataset: &str, source: &str, cause: &str) {
    error!(dataset, source, cause, "DATASET_LOAD_FAILED");
}

/// Log rows whose Min <= Modal <= Max ordering does not hold.
pub fn log_price_order_violations(source: &str, count: usize) {
    warn!(source, count, "PRICE_ORDER_VIOLATIONS");
}

/// Log a snapshot swap.
pub fn log_snapshot_swapped(historical_rows: usize, forecast_rows: usize) {
    info!(historical_rows, forecast_rows, "SNAPSHOT_SWAPPED");
}
