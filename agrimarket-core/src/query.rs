//! Query surface.
//!
//! Operations are addressed by name (`kpis`, `price-for-date`, ...) and take
//! a flat set of request fields. `QueryService::execute` validates the
//! fields, runs the operation against the current snapshot and returns a
//! JSON value.
//!
//! # Design Principles
//! 1. Each execution sees exactly one snapshot
//! 2. Filtered-to-empty results are values, not errors
//! 3. Malformed input fails before any computation

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::aggregate::{self, HEATMAP_AXIS_CAP};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::filter;
use crate::logger::QueryLogger;
use crate::resolver::PriceResolver;
use crate::scoped;
use crate::snapshot::{MarketSnapshot, SnapshotStore};
use crate::types::FilterCriteria;

// ============================================================================
// Request
// ============================================================================

/// Date format of every date-valued request field.
pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw request fields shared by all operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub states: Vec<String>,
    pub markets: Vec<String>,
    pub commodities: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Scope commodity of scoped operations
    pub commodity: Option<String>,
    /// Scope market of scoped operations; falls back to the configured default
    pub market: Option<String>,
    /// Target date of `price-for-date`
    pub date: Option<String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states<I: IntoIterator<Item = S>, S: Into<String>>(mut self, states: I) -> Self {
        self.states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_markets<I: IntoIterator<Item = S>, S: Into<String>>(mut self, markets: I) -> Self {
        self.markets = markets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_commodities<I: IntoIterator<Item = S>, S: Into<String>>(mut self, commodities: I) -> Self {
        self.commodities = commodities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn with_end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn with_commodity(mut self, commodity: impl Into<String>) -> Self {
        self.commodity = Some(commodity.into());
        self
    }

    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Build filter criteria; blank list entries are ignored.
    pub fn criteria(&self) -> ServiceResult<FilterCriteria> {
        let start = optional_date("start_date", self.start_date.as_deref())?;
        let end = optional_date("end_date", self.end_date.as_deref())?;
        Ok(FilterCriteria::all()
            .with_states(non_blank(&self.states))
            .with_markets(non_blank(&self.markets))
            .with_commodities(non_blank(&self.commodities))
            .with_date_range(start, end))
    }

    /// Requested commodity list in request order, blanks removed.
    pub fn commodity_list(&self) -> Vec<String> {
        non_blank(&self.commodities)
    }
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_date(field: &str, value: Option<&str>) -> ServiceResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_request_date(raw)
            .map(Some)
            .ok_or_else(|| {
                ServiceError::validation(field, format!("invalid date '{}', expected YYYY-MM-DD", raw))
            }),
    }
}

/// Request dates are strictly `YYYY-MM-DD`; the lenient ingest formats do not apply.
fn parse_request_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, REQUEST_DATE_FORMAT).ok()
}

fn required<'a>(field: &str, value: Option<&'a str>) -> ServiceResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::validation(field, "parameter is required"))
}

// ============================================================================
// Operations
// ============================================================================

/// Named query operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Health,
    States,
    Commodities,
    Markets,
    ModelCommodities,
    PredictionMarkets,
    Kpis,
    CommoditiesByCount,
    CommoditiesByPrice,
    PriceByYear,
    YearOverYear,
    VolatilityHeatmap,
    SeasonalPattern,
    PriceDistribution,
    MarketPerformance,
    DataQuality,
    MultiCommodity,
    PriceDetails,
    ForecastData,
    PriceForDate,
    CandlestickData,
    HistoricalCalendar,
    SeasonalityDecomposition,
    ForecastUncertainty,
    ForecastCalendar,
    MarketCommodities,
}

impl QueryKind {
    pub const ALL: [QueryKind; 26] = [
        QueryKind::Health,
        QueryKind::States,
        QueryKind::Commodities,
        QueryKind::Markets,
        QueryKind::ModelCommodities,
        QueryKind::PredictionMarkets,
        QueryKind::Kpis,
        QueryKind::CommoditiesByCount,
        QueryKind::CommoditiesByPrice,
        QueryKind::PriceByYear,
        QueryKind::YearOverYear,
        QueryKind::VolatilityHeatmap,
        QueryKind::SeasonalPattern,
        QueryKind::PriceDistribution,
        QueryKind::MarketPerformance,
        QueryKind::DataQuality,
        QueryKind::MultiCommodity,
        QueryKind::PriceDetails,
        QueryKind::ForecastData,
        QueryKind::PriceForDate,
        QueryKind::CandlestickData,
        QueryKind::HistoricalCalendar,
        QueryKind::SeasonalityDecomposition,
        QueryKind::ForecastUncertainty,
        QueryKind::ForecastCalendar,
        QueryKind::MarketCommodities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Health => "health",
            QueryKind::States => "states",
            QueryKind::Commodities => "commodities",
            QueryKind::Markets => "markets",
            QueryKind::ModelCommodities => "model-commodities",
            QueryKind::PredictionMarkets => "prediction-markets",
            QueryKind::Kpis => "kpis",
            QueryKind::CommoditiesByCount => "commodities-by-count",
            QueryKind::CommoditiesByPrice => "commodities-by-price",
            QueryKind::PriceByYear => "price-by-year",
            QueryKind::YearOverYear => "year-over-year",
            QueryKind::VolatilityHeatmap => "volatility-heatmap",
            QueryKind::SeasonalPattern => "seasonal-pattern",
            QueryKind::PriceDistribution => "price-distribution",
            QueryKind::MarketPerformance => "market-performance",
            QueryKind::DataQuality => "data-quality",
            QueryKind::MultiCommodity => "multi-commodity",
            QueryKind::PriceDetails => "price-details",
            QueryKind::ForecastData => "forecast-data",
            QueryKind::PriceForDate => "price-for-date",
            QueryKind::CandlestickData => "candlestick-data",
            QueryKind::HistoricalCalendar => "historical-calendar",
            QueryKind::SeasonalityDecomposition => "seasonality-decomposition",
            QueryKind::ForecastUncertainty => "forecast-uncertainty",
            QueryKind::ForecastCalendar => "forecast-calendar",
            QueryKind::MarketCommodities => "market-commodities",
        }
    }

    /// True for operations scoped to one commodity.
    pub fn needs_commodity(&self) -> bool {
        matches!(
            self,
            QueryKind::ForecastData
                | QueryKind::PriceForDate
                | QueryKind::CandlestickData
                | QueryKind::HistoricalCalendar
                | QueryKind::SeasonalityDecomposition
                | QueryKind::ForecastUncertainty
                | QueryKind::ForecastCalendar
        )
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches("/api/").trim_matches('/');
        QueryKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| ServiceError::unknown_query(s))
    }
}

// ============================================================================
// Service
// ============================================================================

/// Executes named queries against the current snapshot.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<SnapshotStore>,
    config: ServiceConfig,
    today: Option<NaiveDate>,
}

impl QueryService {
    pub fn new(store: Arc<SnapshotStore>, config: ServiceConfig) -> Self {
        Self {
            store,
            config,
            today: None,
        }
    }

    /// Service over a fixed snapshot (tests and tooling).
    pub fn from_snapshot(snapshot: MarketSnapshot, config: ServiceConfig) -> Self {
        Self::new(Arc::new(SnapshotStore::new(snapshot)), config)
    }

    /// Pin "today", used by freshness in `market-performance`.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run operation `name` with `params`.
    pub fn execute(&self, name: &str, params: &QueryParams) -> ServiceResult<Value> {
        let logger = QueryLogger::start(name);
        let started = Instant::now();

        let result = name
            .parse::<QueryKind>()
            .and_then(|kind| self.run(kind, params));

        match &result {
            Ok(_) => logger.log_executed(started.elapsed().as_micros()),
            Err(err) => logger.log_failed(err.kind().as_str(), &err.to_string()),
        }
        result
    }

    /// Run a parsed operation.
    pub fn run(&self, kind: QueryKind, params: &QueryParams) -> ServiceResult<Value> {
        let snap = self.store.current();

        if kind.needs_commodity() {
            let commodity = required("commodity", params.commodity.as_deref())?;
            let market = self.scope_market(params);
            return self.run_scoped(kind, &snap, commodity, market, params);
        }

        let historical = snap.historical();
        let value = match kind {
            QueryKind::Health => json!({
                "status": "healthy",
                "dataLoaded": snap.has_historical(),
                "predictionsLoaded": snap.has_forecast(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
            QueryKind::States => to_json(historical.states())?,
            QueryKind::Commodities => to_json(historical.commodities())?,
            QueryKind::Markets => to_json(historical.markets())?,
            QueryKind::ModelCommodities => to_json(snap.forecast().commodities())?,
            QueryKind::PredictionMarkets => to_json(snap.forecast().markets())?,
            QueryKind::MultiCommodity => to_json(aggregate::multi_commodity_comparison(
                historical,
                &params.criteria()?,
                &params.commodity_list(),
                self.config.comparison_cap,
            ))?,
            QueryKind::MarketCommodities => {
                to_json(scoped::market_commodities(&snap, self.scope_market(params)))?
            }
            _ => {
                let criteria = params.criteria()?;
                let filtered = filter::apply(historical, &criteria);
                match kind {
                    QueryKind::Kpis => to_json(aggregate::kpi_summary(&filtered))?,
                    QueryKind::CommoditiesByCount => {
                        to_json(aggregate::top_by_frequency(&filtered, self.config.top_n_cap))?
                    }
                    QueryKind::CommoditiesByPrice => {
                        to_json(aggregate::top_by_price(&filtered, self.config.top_n_cap))?
                    }
                    QueryKind::PriceByYear => to_json(aggregate::yearly_average(&filtered))?,
                    QueryKind::YearOverYear => to_json(aggregate::year_over_year(&filtered))?,
                    QueryKind::VolatilityHeatmap => {
                        to_json(aggregate::volatility_heatmap(&filtered, HEATMAP_AXIS_CAP))?
                    }
                    QueryKind::SeasonalPattern => to_json(aggregate::seasonal_pattern(
                        &filtered,
                        &params.commodity_list(),
                    ))?,
                    QueryKind::PriceDistribution => to_json(aggregate::price_distribution(
                        &filtered,
                        &params.commodity_list(),
                    ))?,
                    QueryKind::MarketPerformance => {
                        to_json(aggregate::market_performance(&filtered, self.today()))?
                    }
                    QueryKind::DataQuality => to_json(aggregate::data_quality(&filtered))?,
                    QueryKind::PriceDetails => to_json(aggregate::price_details(&filtered))?,
                    other => {
                        return Err(ServiceError::internal(format!(
                            "operation {} has no handler",
                            other
                        )))
                    }
                }
            }
        };
        Ok(value)
    }

    fn run_scoped(
        &self,
        kind: QueryKind,
        snap: &MarketSnapshot,
        commodity: &str,
        market: &str,
        params: &QueryParams,
    ) -> ServiceResult<Value> {
        match kind {
            QueryKind::ForecastData => to_json(scoped::forecast_data(snap, commodity, market)?),
            QueryKind::PriceForDate => {
                let raw = required("date", params.date.as_deref())?;
                let target = optional_date("date", Some(raw))?
                    .ok_or_else(|| ServiceError::validation("date", "parameter is required"))?;
                let resolution =
                    PriceResolver::new(snap.historical(), snap.forecast()).resolve(commodity, market, target);
                to_json(resolution)
            }
            QueryKind::CandlestickData => to_json(scoped::candlestick(snap, commodity, market)?),
            QueryKind::HistoricalCalendar => {
                to_json(scoped::historical_calendar(snap, commodity, market)?)
            }
            QueryKind::SeasonalityDecomposition => {
                to_json(scoped::seasonality_decomposition(snap, commodity, market)?)
            }
            QueryKind::ForecastUncertainty => {
                to_json(scoped::forecast_uncertainty(snap, commodity, market)?)
            }
            QueryKind::ForecastCalendar => to_json(scoped::forecast_calendar(snap, commodity, market)?),
            other => Err(ServiceError::internal(format!(
                "operation {} is not scoped",
                other
            ))),
        }
    }

    fn scope_market<'a>(&'a self, params: &'a QueryParams) -> &'a str {
        params
            .market
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_market.as_str())
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

fn to_json<T: Serialize>(value: T) -> ServiceResult<Value> {
    Ok(serde_json::to_value(value)?)
}
