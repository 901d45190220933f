//! SQLite storage for the two datasets.
//!
//! Provides functionality to:
//! - Read the `market_data` and `predicted_prices` tables as raw rows
//! - Create both tables and insert observations (fixture seeding)
//!
//! Cells are read loosely: dates and labels may be stored as text or
//! numbers, prices as real, integer or text. Optional columns that a table
//! lacks are read as missing.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags, Row};

use crate::data_loader::{parse_number, DataLoaderError, RawForecastRow, RawHistoricalRow};
use crate::precision::iso_date;
use crate::types::{finite, ForecastObservation, HistoricalObservation};

/// Historical table name.
pub const HISTORICAL_TABLE: &str = "market_data";

/// Forecast table name.
pub const FORECAST_TABLE: &str = "predicted_prices";

const HISTORICAL_COLUMNS: [(&str, bool); 11] = [
    ("State", false),
    ("District", false),
    ("Market", true),
    ("Commodity", true),
    ("Variety", false),
    ("Grade", false),
    ("Arrival_Date", true),
    ("Min_Price", false),
    ("Max_Price", false),
    ("Modal_Price", true),
    ("Commodity_Code", false),
];

const FORECAST_COLUMNS: [(&str, bool); 9] = [
    ("ds", true),
    ("Market", true),
    ("Commodity", true),
    ("Predicted_Price", true),
    ("trend", false),
    ("season_yearly", false),
    ("season_weekly", false),
    ("yhat_lower", false),
    ("yhat_upper", false),
];

/// Handle on a market database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database and make sure both tables exist.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, DataLoaderError> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    /// Open an existing database read-only, without touching its schema.
    pub fn open_existing<P: AsRef<Path>>(db_path: P) -> Result<Self, DataLoaderError> {
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// Create a new in-memory store (for testing).
    pub fn in_memory() -> Result<Self, DataLoaderError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    /// Create both tables with the source column names.
    fn create_tables(&self) -> Result<(), DataLoaderError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS market_data (
                State TEXT,
                District TEXT,
                Market TEXT NOT NULL,
                Commodity TEXT NOT NULL,
                Variety TEXT,
                Grade TEXT,
                Arrival_Date TEXT NOT NULL,
                Min_Price REAL,
                Max_Price REAL,
                Modal_Price REAL,
                Commodity_Code TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS predicted_prices (
                ds TEXT NOT NULL,
                Market TEXT NOT NULL,
                Commodity TEXT NOT NULL,
                Predicted_Price REAL,
                trend REAL,
                season_yearly REAL,
                season_weekly REAL,
                yhat_lower REAL,
                yhat_upper REAL
            )",
            [],
        )?;

        // Lookups are always by (market, commodity)
        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_market_data_pair ON market_data(Market, Commodity)",
                [],
            )
            .ok();
        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_predicted_pair ON predicted_prices(Market, Commodity)",
                [],
            )
            .ok();

        Ok(())
    }

    /// Insert historical observations in one transaction.
    pub fn insert_historical(&mut self, rows: &[HistoricalObservation]) -> Result<usize, DataLoaderError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO market_data (State, District, Market, Commodity, Variety, Grade,
                    Arrival_Date, Min_Price, Max_Price, Modal_Price, Commodity_Code)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.state,
                    r.district,
                    r.market,
                    r.commodity,
                    r.variety,
                    r.grade,
                    iso_date(r.arrival_date),
                    finite(r.min_price),
                    finite(r.max_price),
                    finite(r.modal_price),
                    r.commodity_code,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Insert forecast observations in one transaction.
    pub fn insert_forecast(&mut self, rows: &[ForecastObservation]) -> Result<usize, DataLoaderError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO predicted_prices (ds, Market, Commodity, Predicted_Price, trend,
                    season_yearly, season_weekly, yhat_lower, yhat_upper)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for r in rows {
                stmt.execute(params![
                    iso_date(r.target_date),
                    r.market,
                    r.commodity,
                    finite(r.predicted_price),
                    finite(r.trend),
                    r.yearly_seasonal,
                    r.weekly_seasonal,
                    r.lower_bound,
                    r.upper_bound,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Read every row of `market_data`.
    pub fn read_historical(&self) -> Result<Vec<RawHistoricalRow>, DataLoaderError> {
        let sql = self.select_sql(HISTORICAL_TABLE, &HISTORICAL_COLUMNS)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawHistoricalRow {
                    state: text_cell(row, 0)?,
                    district: text_cell(row, 1)?,
                    market: text_cell(row, 2)?,
                    commodity: text_cell(row, 3)?,
                    variety: text_cell(row, 4)?,
                    grade: text_cell(row, 5)?,
                    arrival_date: text_cell(row, 6)?,
                    min_price: number_cell(row, 7)?,
                    max_price: number_cell(row, 8)?,
                    modal_price: number_cell(row, 9)?,
                    commodity_code: text_cell(row, 10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Read every row of `predicted_prices`.
    pub fn read_forecast(&self) -> Result<Vec<RawForecastRow>, DataLoaderError> {
        let sql = self.select_sql(FORECAST_TABLE, &FORECAST_COLUMNS)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawForecastRow {
                    ds: text_cell(row, 0)?,
                    market: text_cell(row, 1)?,
                    commodity: text_cell(row, 2)?,
                    predicted_price: number_cell(row, 3)?,
                    trend: number_cell(row, 4)?,
                    season_yearly: number_cell(row, 5)?,
                    season_weekly: number_cell(row, 6)?,
                    yhat_lower: number_cell(row, 7)?,
                    yhat_upper: number_cell(row, 8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Row count of a table.
    pub fn count(&self, table: &str) -> Result<i64, DataLoaderError> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Column names present in `table`.
    fn table_columns(&self, table: &str) -> Result<Vec<String>, DataLoaderError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// SELECT over `columns` in order; absent optional columns read as NULL.
    fn select_sql(&self, table: &str, columns: &[(&str, bool)]) -> Result<String, DataLoaderError> {
        let present = self.table_columns(table)?;
        let mut select = Vec::with_capacity(columns.len());
        for (name, required) in columns {
            if present.iter().any(|c| c == name) {
                select.push(format!("\"{}\"", name));
            } else if *required {
                return Err(DataLoaderError::MissingColumn(name.to_string()));
            } else {
                select.push("NULL".to_string());
            }
        }
        Ok(format!("SELECT {} FROM \"{}\"", select.join(", "), table))
    }
}

/// Any scalar cell as trimmed text; NULL becomes empty.
fn text_cell(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    let text = match row.get::<_, Value>(idx)? {
        Value::Null | Value::Blob(_) => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.trim().to_string(),
    };
    Ok(text)
}

/// Any scalar cell as a number; NULL and junk become missing.
fn number_cell(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    let number = match row.get::<_, Value>(idx)? {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(i as f64),
        Value::Real(f) => finite(f),
        Value::Text(s) => parse_number(&s),
    };
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_create_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.count(HISTORICAL_TABLE).unwrap(), 0);
        assert_eq!(store.count(FORECAST_TABLE).unwrap(), 0);
    }

    #[test]
    fn test_insert_and_read_historical() {
        let mut store = SqliteStore::in_memory().unwrap();
        let obs = HistoricalObservation::new("Udumalpet", "Tomato", d(2023, 1, 5), 100.0)
            .with_location("Tamil Nadu", "Tiruppur")
            .with_range(90.0, 110.0);
        store.insert_historical(&[obs]).unwrap();

        let rows = store.read_historical().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].market, "Udumalpet");
        assert_eq!(rows[0].state, "Tamil Nadu");
        assert_eq!(rows[0].arrival_date, "2023-01-05");
        assert_eq!(rows[0].modal_price, Some(100.0));
        assert_eq!(rows[0].min_price, Some(90.0));
    }

    #[test]
    fn test_missing_price_round_trips_as_null() {
        let mut store = SqliteStore::in_memory().unwrap();
        let obs = HistoricalObservation::new("Udumalpet", "Tomato", d(2023, 1, 5), f64::NAN);
        store.insert_historical(&[obs]).unwrap();
        let rows = store.read_historical().unwrap();
        assert_eq!(rows[0].modal_price, None);
    }

    #[test]
    fn test_insert_and_read_forecast() {
        let mut store = SqliteStore::in_memory().unwrap();
        let obs = ForecastObservation::new("Udumalpet", "Tomato", d(2024, 1, 1), 105.0)
            .with_components(100.0, Some(4.0), None)
            .with_bounds(95.0, 115.0);
        store.insert_forecast(&[obs]).unwrap();

        let rows = store.read_forecast().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ds, "2024-01-01");
        assert_eq!(rows[0].trend, Some(100.0));
        assert_eq!(rows[0].season_yearly, Some(4.0));
        assert_eq!(rows[0].season_weekly, None);
        assert_eq!(rows[0].yhat_upper, Some(115.0));
    }

    #[test]
    fn test_optional_columns_absent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE predicted_prices (ds TEXT, Market TEXT, Commodity TEXT, Predicted_Price TEXT)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO predicted_prices VALUES ('2024-01-01', 'Udumalpet', 'Tomato', '101.5')",
            [],
        )
        .unwrap();
        let store = SqliteStore { conn };

        let rows = store.read_forecast().unwrap();
        assert_eq!(rows[0].predicted_price, Some(101.5));
        assert_eq!(rows[0].trend, None);
        assert_eq!(rows[0].yhat_lower, None);
    }

    #[test]
    fn test_required_column_absent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE market_data (Market TEXT, Commodity TEXT)", [])
            .unwrap();
        let store = SqliteStore { conn };
        let err = store.read_historical().unwrap_err();
        assert!(matches!(err, DataLoaderError::MissingColumn(c) if c == "Arrival_Date"));
    }

    #[test]
    fn test_numeric_commodity_code_read_as_text() {
        let conn = Connection::open_in_memory().unwrap();
        let store = SqliteStore { conn };
        store.create_tables().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO market_data (Market, Commodity, Arrival_Date, Modal_Price, Commodity_Code)
                 VALUES ('Udumalpet', 'Tomato', '05/01/2023', 100, 78)",
                [],
            )
            .unwrap();
        let rows = store.read_historical().unwrap();
        assert_eq!(rows[0].commodity_code, "78");
        assert_eq!(rows[0].modal_price, Some(100.0));
    }
}
