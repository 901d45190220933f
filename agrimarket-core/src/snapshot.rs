//! Immutable dataset snapshots.
//!
//! Every query runs against one `MarketSnapshot`: the historical and the
//! forecast table as they were when the snapshot was built. A
//! `SnapshotStore` hands snapshots out behind `Arc` and can swap in a new
//! one while queries holding the old one finish undisturbed.

use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::config::ServiceConfig;
use crate::data_loader::{DataLoader, DataLoaderError, LoadResult};
use crate::logger;
use crate::table::Table;
use crate::types::{ForecastObservation, HistoricalObservation};

/// Both datasets at one point in time.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    historical: Table<HistoricalObservation>,
    forecast: Table<ForecastObservation>,
    loaded_at: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    /// Build a snapshot from already loaded tables.
    pub fn new(
        historical: impl Into<Table<HistoricalObservation>>,
        forecast: impl Into<Table<ForecastObservation>>,
    ) -> Self {
        Self {
            historical: historical.into(),
            forecast: forecast.into(),
            loaded_at: Some(Utc::now()),
        }
    }

    /// Snapshot with no rows in either dataset.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn historical(&self) -> &Table<HistoricalObservation> {
        &self.historical
    }

    pub fn forecast(&self) -> &Table<ForecastObservation> {
        &self.forecast
    }

    /// When the snapshot was built; `None` for the empty default.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn has_historical(&self) -> bool {
        !self.historical.is_empty()
    }

    pub fn has_forecast(&self) -> bool {
        !self.forecast.is_empty()
    }
}

/// Holder of the current snapshot.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<MarketSnapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(MarketSnapshot::empty())
    }
}

impl SnapshotStore {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot queries should run against.
    pub fn current(&self) -> Arc<MarketSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            // A writer only ever stores a whole Arc, so the value is intact
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in `snapshot`, returning the one it replaces.
    pub fn replace(&self, snapshot: MarketSnapshot) -> Arc<MarketSnapshot> {
        let next = Arc::new(snapshot);
        logger::log_snapshot_swapped(next.historical().len(), next.forecast().len());
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Load a fresh snapshot from `config` and swap it in.
    pub fn reload(&self, config: &ServiceConfig) -> Arc<MarketSnapshot> {
        self.replace(load_snapshot(config));
        self.current()
    }
}

/// Load both datasets named by `config`.
///
/// Each dataset loads independently. A dataset that fails to load is logged
/// and replaced by an empty table, so the service always starts.
pub fn load_snapshot(config: &ServiceConfig) -> MarketSnapshot {
    let loader = DataLoader::new();
    let historical = load_or_empty("historical", &config.historical_source, |p| {
        loader.load_historical(p)
    });
    let forecast = load_or_empty("forecast", &config.forecast_source, |p| {
        loader.load_forecast(p)
    });
    MarketSnapshot::new(historical, forecast)
}

fn load_or_empty<R, F>(dataset: &str, path: &Path, load: F) -> Vec<R>
where
    F: FnOnce(&Path) -> Result<LoadResult<R>, DataLoaderError>,
{
    let source = path.display().to_string();
    match load(path) {
        Ok(result) => {
            logger::log_dataset_loaded(dataset, &source, &result.report);
            result.rows
        }
        Err(err) => {
            logger::log_dataset_load_failed(dataset, &source, &err.to_string());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = MarketSnapshot::empty();
        assert!(!snap.has_historical());
        assert!(!snap.has_forecast());
        assert!(snap.loaded_at().is_none());
    }

    #[test]
    fn test_replace_keeps_old_snapshot_alive() {
        let store = SnapshotStore::default();
        let before = store.current();

        let next = MarketSnapshot::new(
            vec![HistoricalObservation::new("X", "Rice", d(2023, 1, 1), 100.0)],
            Vec::<ForecastObservation>::new(),
        );
        let old = store.replace(next);

        assert!(Arc::ptr_eq(&before, &old));
        assert!(!before.has_historical());
        assert_eq!(store.current().historical().len(), 1);
    }

    #[test]
    fn test_load_falls_back_to_empty() {
        let config = ServiceConfig::default()
            .with_historical_source("/nonexistent/data.db")
            .with_forecast_source("/nonexistent/predictions.csv");
        let snap = load_snapshot(&config);
        assert!(!snap.has_historical());
        assert!(!snap.has_forecast());
        assert!(snap.loaded_at().is_some());
    }

    #[test]
    fn test_reload_swaps() {
        let store = SnapshotStore::new(MarketSnapshot::new(
            vec![HistoricalObservation::new("X", "Rice", d(2023, 1, 1), 100.0)],
            Vec::<ForecastObservation>::new(),
        ));
        let config = ServiceConfig::default().with_historical_source("/nonexistent/data.db");
        let snap = store.reload(&config);
        assert!(!snap.has_historical());
    }
}
