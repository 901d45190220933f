//! AgriMarket Core
//!
//! Analytic queries over agricultural market prices and model forecasts:
//! a shared filter pipeline, chart-ready aggregations and a temporal price
//! resolver that reconciles observed and predicted series.
//!
//! Data is loaded once into an immutable [`MarketSnapshot`] and every query
//! runs against a snapshot handed out by a [`SnapshotStore`].

pub mod aggregate;
pub mod app;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod filter;
pub mod logger;
pub mod precision;
pub mod query;
pub mod resolver;
pub mod scoped;
pub mod snapshot;
pub mod sqlite_store;
pub mod stats;
pub mod table;
pub mod types;

pub use config::ServiceConfig;
pub use data_loader::{DataLoader, DataLoaderError, LoadReport, LoadResult};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use query::{QueryKind, QueryParams, QueryService};
pub use resolver::{PriceResolution, PriceResolver, PriceStatus};
pub use snapshot::{load_snapshot, MarketSnapshot, SnapshotStore};
pub use table::{MarketRow, Table};
pub use types::*;
