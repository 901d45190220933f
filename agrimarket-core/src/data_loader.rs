//! Dataset loading and cleansing using Polars and SQLite.
//!
//! Reads the historical price table and the forecast table from CSV, Parquet
//! or SQLite, and turns them into typed observations with a load report.
//!
//! Features:
//! - Source format chosen by file extension
//! - Every column read as text and parsed here, so CSV, Parquet and SQLite
//!   share one cleansing path
//! - Missing numeric cells become `NaN`, never zero
//! - Rows with an unparseable date are dropped and counted
//! - Rows violating Min <= Modal <= Max are kept, counted and logged

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

use crate::logger;
use crate::sqlite_store::SqliteStore;
use crate::types::{ForecastObservation, HistoricalObservation};

/// Data loading error types.
#[derive(Debug, Error)]
pub enum DataLoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read file: {0}")]
    ReadError(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

// ============================================================================
// Source Formats
// ============================================================================

/// Physical format of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
    Sqlite,
}

impl SourceFormat {
    /// Pick the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, DataLoaderError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "parquet" => Ok(SourceFormat::Parquet),
            "db" | "sqlite" | "sqlite3" => Ok(SourceFormat::Sqlite),
            _ => Err(DataLoaderError::UnsupportedFormat(extension)),
        }
    }
}

// ============================================================================
// Raw Rows
// ============================================================================

/// Historical row as read from a source, before date parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHistoricalRow {
    pub state: String,
    pub district: String,
    pub market: String,
    pub commodity: String,
    pub variety: String,
    pub grade: String,
    pub arrival_date: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub modal_price: Option<f64>,
    pub commodity_code: String,
}

/// Forecast row as read from a source, before date parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawForecastRow {
    pub ds: String,
    pub market: String,
    pub commodity: String,
    pub predicted_price: Option<f64>,
    pub trend: Option<f64>,
    pub season_yearly: Option<f64>,
    pub season_weekly: Option<f64>,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

/// Outcome counts of one dataset load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows present in the source
    pub total_rows: usize,
    /// Rows that became observations
    pub loaded_rows: usize,
    /// Rows dropped because their date could not be parsed
    pub dropped_rows: usize,
    /// Loaded rows where Min <= Modal <= Max does not hold
    pub price_order_violations: usize,
}

/// Typed rows plus the report describing how they were produced.
#[derive(Debug, Clone)]
pub struct LoadResult<R> {
    pub rows: Vec<R>,
    pub report: LoadReport,
}

// ============================================================================
// Loader
// ============================================================================

const HISTORICAL_REQUIRED: [&str; 4] = ["Market", "Commodity", "Arrival_Date", "Modal_Price"];
const FORECAST_REQUIRED: [&str; 4] = ["ds", "Market", "Commodity", "Predicted_Price"];

/// Loader for the historical and forecast datasets.
#[derive(Debug, Clone, Default)]
pub struct DataLoader;

impl DataLoader {
    /// Create a new DataLoader.
    pub fn new() -> Self {
        Self
    }

    /// Load the historical price dataset.
    ///
    /// # Returns
    /// * `Ok(LoadResult)` - Parsed observations with a load report
    /// * `Err(DataLoaderError)` - Missing file, unknown format, missing column
    ///   or a read failure
    pub fn load_historical<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<LoadResult<HistoricalObservation>, DataLoaderError> {
        let path = path.as_ref();
        let raw = match Self::check_source(path)? {
            SourceFormat::Sqlite => SqliteStore::open_existing(path)?.read_historical()?,
            format => historical_rows_from_frame(&read_frame(path, format)?)?,
        };

        let result = cleanse_historical(raw);
        if result.report.price_order_violations > 0 {
            logger::log_price_order_violations(
                &path.display().to_string(),
                result.report.price_order_violations,
            );
        }
        Ok(result)
    }

    /// Load the forecast dataset.
    pub fn load_forecast<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<LoadResult<ForecastObservation>, DataLoaderError> {
        let path = path.as_ref();
        let raw = match Self::check_source(path)? {
            SourceFormat::Sqlite => SqliteStore::open_existing(path)?.read_forecast()?,
            format => forecast_rows_from_frame(&read_frame(path, format)?)?,
        };
        Ok(cleanse_forecast(raw))
    }

    fn check_source(path: &Path) -> Result<SourceFormat, DataLoaderError> {
        if !path.exists() {
            return Err(DataLoaderError::FileNotFound(path.display().to_string()));
        }
        SourceFormat::from_path(path)
    }
}

/// Read a CSV or Parquet file into a DataFrame.
fn read_frame(path: &Path, format: SourceFormat) -> Result<DataFrame, DataLoaderError> {
    match format {
        SourceFormat::Csv => load_csv(path),
        SourceFormat::Parquet => load_parquet(path),
        SourceFormat::Sqlite => Err(DataLoaderError::UnsupportedFormat(
            "sqlite is not a frame source".to_string(),
        )),
    }
}

/// Load CSV file using Polars. Schema inference is off so every column is text.
fn load_csv(path: &Path) -> Result<DataFrame, DataLoaderError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .map_err(|e| DataLoaderError::ReadError(e.to_string()))?
        .finish()
        .map_err(DataLoaderError::from)
}

/// Load Parquet file using Polars.
fn load_parquet(path: &Path) -> Result<DataFrame, DataLoaderError> {
    let file = std::fs::File::open(path).map_err(|e| DataLoaderError::ReadError(e.to_string()))?;

    ParquetReader::new(file)
        .finish()
        .map_err(DataLoaderError::from)
}

// ============================================================================
// Frame Extraction
// ============================================================================

fn validate_columns(df: &DataFrame, required: &[&str]) -> Result<(), DataLoaderError> {
    for col in required {
        if df.column(col).is_err() {
            return Err(DataLoaderError::MissingColumn(col.to_string()));
        }
    }
    Ok(())
}

/// Text values of a column; absent optional columns yield empty strings.
fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>, DataLoaderError> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![String::new(); df.height()]);
    };
    let cast = column.cast(&DataType::String)?;
    let chunked = cast.str()?;
    Ok(chunked
        .into_iter()
        .map(|opt| opt.map(|s| s.trim().to_string()).unwrap_or_default())
        .collect())
}

/// Numeric values of a column; blanks, junk and absent columns yield `None`.
fn number_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataLoaderError> {
    Ok(text_column(df, name)?
        .iter()
        .map(|s| parse_number(s))
        .collect())
}

/// Extract raw historical rows from a frame with the source column names.
pub fn historical_rows_from_frame(df: &DataFrame) -> Result<Vec<RawHistoricalRow>, DataLoaderError> {
    validate_columns(df, &HISTORICAL_REQUIRED)?;

    let states = text_column(df, "State")?;
    let districts = text_column(df, "District")?;
    let markets = text_column(df, "Market")?;
    let commodities = text_column(df, "Commodity")?;
    let varieties = text_column(df, "Variety")?;
    let grades = text_column(df, "Grade")?;
    let dates = text_column(df, "Arrival_Date")?;
    let mins = number_column(df, "Min_Price")?;
    let maxs = number_column(df, "Max_Price")?;
    let modals = number_column(df, "Modal_Price")?;
    let codes = text_column(df, "Commodity_Code")?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(RawHistoricalRow {
            state: states[i].clone(),
            district: districts[i].clone(),
            market: markets[i].clone(),
            commodity: commodities[i].clone(),
            variety: varieties[i].clone(),
            grade: grades[i].clone(),
            arrival_date: dates[i].clone(),
            min_price: mins[i],
            max_price: maxs[i],
            modal_price: modals[i],
            commodity_code: codes[i].clone(),
        });
    }
    Ok(rows)
}

/// Extract raw forecast rows from a frame with the source column names.
pub fn forecast_rows_from_frame(df: &DataFrame) -> Result<Vec<RawForecastRow>, DataLoaderError> {
    validate_columns(df, &FORECAST_REQUIRED)?;

    let dates = text_column(df, "ds")?;
    let markets = text_column(df, "Market")?;
    let commodities = text_column(df, "Commodity")?;
    let predicted = number_column(df, "Predicted_Price")?;
    let trends = number_column(df, "trend")?;
    let yearly = number_column(df, "season_yearly")?;
    let weekly = number_column(df, "season_weekly")?;
    let lowers = number_column(df, "yhat_lower")?;
    let uppers = number_column(df, "yhat_upper")?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(RawForecastRow {
            ds: dates[i].clone(),
            market: markets[i].clone(),
            commodity: commodities[i].clone(),
            predicted_price: predicted[i],
            trend: trends[i],
            season_yearly: yearly[i],
            season_weekly: weekly[i],
            yhat_lower: lowers[i],
            yhat_upper: uppers[i],
        });
    }
    Ok(rows)
}

// ============================================================================
// Cleansing
// ============================================================================

/// Turn raw historical rows into observations.
pub fn cleanse_historical(raw: Vec<RawHistoricalRow>) -> LoadResult<HistoricalObservation> {
    let total_rows = raw.len();
    let mut rows = Vec::with_capacity(total_rows);
    let mut violations = 0usize;

    for r in raw {
        let Some(date) = parse_date(&r.arrival_date) else {
            continue;
        };
        let modal = r.modal_price.unwrap_or(f64::NAN);
        let mut obs = HistoricalObservation::new(r.market, r.commodity, date, modal)
            .with_location(r.state, r.district)
            .with_grading(r.variety, r.grade)
            .with_range(
                r.min_price.unwrap_or(f64::NAN),
                r.max_price.unwrap_or(f64::NAN),
            );
        obs.commodity_code = r.commodity_code;

        if !obs.has_ordered_prices() {
            violations += 1;
        }
        rows.push(obs);
    }

    let loaded_rows = rows.len();
    LoadResult {
        rows,
        report: LoadReport {
            total_rows,
            loaded_rows,
            dropped_rows: total_rows - loaded_rows,
            price_order_violations: violations,
        },
    }
}

/// Turn raw forecast rows into observations.
pub fn cleanse_forecast(raw: Vec<RawForecastRow>) -> LoadResult<ForecastObservation> {
    let total_rows = raw.len();
    let mut rows = Vec::with_capacity(total_rows);

    for r in raw {
        let Some(date) = parse_date(&r.ds) else {
            continue;
        };
        let mut obs = ForecastObservation::new(
            r.market,
            r.commodity,
            date,
            r.predicted_price.unwrap_or(f64::NAN),
        )
        .with_components(
            r.trend.unwrap_or(f64::NAN),
            r.season_yearly,
            r.season_weekly,
        );
        if let (Some(lower), Some(upper)) = (r.yhat_lower, r.yhat_upper) {
            obs = obs.with_bounds(lower, upper);
        }
        rows.push(obs);
    }

    let loaded_rows = rows.len();
    LoadResult {
        rows,
        report: LoadReport {
            total_rows,
            loaded_rows,
            dropped_rows: total_rows - loaded_rows,
            price_order_violations: 0,
        },
    }
}

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD`, day-first `DD/MM/YYYY` and `DD-MM-YYYY`, and
/// datetimes whose first ten characters are an ISO date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Parse a numeric cell; blank and non-finite values are missing.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
