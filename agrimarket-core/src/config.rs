//! Service configuration.
//!
//! Defaults match a local checkout (`DB/data.db`, `DB/predictions.db`).
//! `from_env` overlays values from the process environment and an optional
//! `.env` file.

use std::path::PathBuf;

use crate::aggregate::{COMPARISON_CAP, TOP_N};

/// Environment variable naming the historical dataset path.
pub const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
/// Environment variable naming the forecast dataset path.
pub const ENV_PREDICTIONS_DATABASE_PATH: &str = "PREDICTIONS_DATABASE_PATH";
/// Environment variable naming the fallback market of scoped queries.
pub const ENV_DEFAULT_MARKET: &str = "DEFAULT_MARKET";
/// Environment variable holding the log filter.
pub const ENV_LOG: &str = "AGRI_LOG";

/// Market used by scoped queries that do not name one.
pub const DEFAULT_MARKET: &str = "Udumalpet";

/// Configuration for loading data and answering queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Historical dataset (`.db`/`.sqlite`, `.csv` or `.parquet`)
    pub historical_source: PathBuf,
    /// Forecast dataset (`.db`/`.sqlite`, `.csv` or `.parquet`)
    pub forecast_source: PathBuf,
    /// Fallback market for scoped queries
    pub default_market: String,
    /// Log filter directive
    pub log_level: String,
    /// Row cap of the top-N commodity rankings
    pub top_n_cap: usize,
    /// Maximum number of series in a commodity comparison
    pub comparison_cap: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            historical_source: PathBuf::from("DB/data.db"),
            forecast_source: PathBuf::from("DB/predictions.db"),
            default_market: DEFAULT_MARKET.to_string(),
            log_level: "info".to_string(),
            top_n_cap: TOP_N,
            comparison_cap: COMPARISON_CAP,
        }
    }
}

impl ServiceConfig {
    /// Load from the environment, reading `.env` first if present.
    ///
    /// Unset or blank variables keep their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::default().overlay_env()
    }

    /// Apply environment overrides to this configuration.
    pub fn overlay_env(mut self) -> Self {
        if let Some(path) = env_value(ENV_DATABASE_PATH) {
            self.historical_source = PathBuf::from(path);
        }
        if let Some(path) = env_value(ENV_PREDICTIONS_DATABASE_PATH) {
            self.forecast_source = PathBuf::from(path);
        }
        if let Some(market) = env_value(ENV_DEFAULT_MARKET) {
            self.default_market = market;
        }
        if let Some(level) = env_value(ENV_LOG) {
            self.log_level = level;
        }
        self
    }

    pub fn with_historical_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.historical_source = path.into();
        self
    }

    pub fn with_forecast_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.forecast_source = path.into();
        self
    }

    pub fn with_default_market(mut self, market: impl Into<String>) -> Self {
        self.default_market = market.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_top_n_cap(mut self, cap: usize) -> Self {
        self.top_n_cap = cap.max(1);
        self
    }

    pub fn with_comparison_cap(mut self, cap: usize) -> Self {
        self.comparison_cap = cap.max(1);
        self
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
