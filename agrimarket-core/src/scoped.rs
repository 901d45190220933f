//! Scoped queries over one (commodity, market) pair.
//!
//! Unlike the filter-driven aggregates, these name a specific scope, so a
//! scope with no rows in its required dataset is a not-found error rather
//! than an empty result.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};
use crate::precision::{month_year, round_opt};
use crate::snapshot::MarketSnapshot;
use crate::stats;
use crate::table::Table;
use crate::types::{finite, ForecastObservation, HistoricalObservation};

/// Lower edge of the fallback uncertainty band, as a fraction of the prediction.
///
/// This is a fixed heuristic band, not a statistically derived interval.
pub const HEURISTIC_LOWER_FACTOR: f64 = 0.9;

/// Upper edge of the fallback uncertainty band, as a fraction of the prediction.
pub const HEURISTIC_UPPER_FACTOR: f64 = 1.1;

// ============================================================================
// Result Shapes
// ============================================================================

/// Points of one (commodity, market) scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedSeries<T> {
    pub commodity: String,
    pub market: String,
    pub data: Vec<T>,
}

/// Price labelled with its month, e.g. `Jan 2023`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledPrice {
    pub date: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastData {
    pub commodity: String,
    pub market: String,
    pub historical_data: Vec<LabeledPrice>,
    pub forecast_data: Vec<LabeledPrice>,
}

/// Daily price band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub modal: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub price: Option<f64>,
}

/// Additive forecast components of one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decomposition {
    pub date: NaiveDate,
    pub trend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_seasonality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_seasonality: Option<f64>,
}

/// Prediction with lower and upper bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertaintyBand {
    pub date: NaiveDate,
    pub predicted: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// True when the bounds are the fixed heuristic band
    pub heuristic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketCommodities {
    pub market: String,
    pub commodities: Vec<String>,
}

// ============================================================================
// Queries
// ============================================================================

/// Historical and forecast series of one pair, labelled by month.
pub fn forecast_data(snapshot: &MarketSnapshot, commodity: &str, market: &str) -> ServiceResult<ForecastData> {
    let hist = snapshot.historical().series(market, commodity);
    let pred = snapshot.forecast().series(market, commodity);
    if hist.is_empty() && pred.is_empty() {
        return Err(scope_not_found(commodity, market));
    }

    Ok(ForecastData {
        commodity: commodity.to_string(),
        market: market.to_string(),
        historical_data: hist
            .iter()
            .map(|r| LabeledPrice {
                date: month_year(r.arrival_date),
                price: round_opt(r.modal_value()),
            })
            .collect(),
        forecast_data: pred
            .iter()
            .map(|r| LabeledPrice {
                date: month_year(r.target_date),
                price: round_opt(r.predicted_value()),
            })
            .collect(),
    })
}

/// Daily min of Min, max of Max and mean of Modal prices.
pub fn candlestick(snapshot: &MarketSnapshot, commodity: &str, market: &str) -> ServiceResult<ScopedSeries<Candle>> {
    let hist = historical_scope(snapshot, commodity, market)?;
    let data = by_day(&hist)
        .into_iter()
        .map(|(date, rows)| {
            let mins: Vec<f64> = rows.iter().map(|r| r.min_price).collect();
            let maxs: Vec<f64> = rows.iter().map(|r| r.max_price).collect();
            let modals: Vec<f64> = rows.iter().map(|r| r.modal_price).collect();
            Candle {
                date,
                min: round_opt(stats::min(&mins)),
                max: round_opt(stats::max(&maxs)),
                modal: round_opt(stats::mean(&modals)),
            }
        })
        .collect();
    Ok(scoped(commodity, market, data))
}

/// Daily mean modal price.
pub fn historical_calendar(
    snapshot: &MarketSnapshot,
    commodity: &str,
    market: &str,
) -> ServiceResult<ScopedSeries<DailyPrice>> {
    let hist = historical_scope(snapshot, commodity, market)?;
    let data = by_day(&hist)
        .into_iter()
        .map(|(date, rows)| {
            let modals: Vec<f64> = rows.iter().map(|r| r.modal_price).collect();
            DailyPrice {
                date,
                price: round_opt(stats::mean(&modals)),
            }
        })
        .collect();
    Ok(scoped(commodity, market, data))
}

/// Trend and seasonal components per forecast date.
pub fn seasonality_decomposition(
    snapshot: &MarketSnapshot,
    commodity: &str,
    market: &str,
) -> ServiceResult<ScopedSeries<Decomposition>> {
    let pred = forecast_scope(snapshot, commodity, market)?;
    let data = pred
        .iter()
        .map(|r| Decomposition {
            date: r.target_date,
            trend: round_opt(r.trend_value()),
            yearly_seasonality: round_opt(r.yearly_seasonal),
            weekly_seasonality: round_opt(r.weekly_seasonal),
        })
        .collect();
    Ok(scoped(commodity, market, data))
}

/// Predicted price with bounds.
///
/// Rows with explicit bounds report them; other rows get the heuristic
/// 0.9x / 1.1x band and are flagged `heuristic`.
pub fn forecast_uncertainty(
    snapshot: &MarketSnapshot,
    commodity: &str,
    market: &str,
) -> ServiceResult<ScopedSeries<UncertaintyBand>> {
    let pred = forecast_scope(snapshot, commodity, market)?;
    let data = pred.iter().map(uncertainty_band).collect();
    Ok(scoped(commodity, market, data))
}

/// Predicted price per forecast date.
pub fn forecast_calendar(
    snapshot: &MarketSnapshot,
    commodity: &str,
    market: &str,
) -> ServiceResult<ScopedSeries<DailyPrice>> {
    let pred = forecast_scope(snapshot, commodity, market)?;
    let data = pred
        .iter()
        .map(|r| DailyPrice {
            date: r.target_date,
            price: round_opt(r.predicted_value()),
        })
        .collect();
    Ok(scoped(commodity, market, data))
}

/// Sorted distinct commodities traded at `market`; empty when unknown.
pub fn market_commodities(snapshot: &MarketSnapshot, market: &str) -> MarketCommodities {
    let commodities = snapshot
        .historical()
        .filter(|r| r.market == market)
        .commodities();
    MarketCommodities {
        market: market.to_string(),
        commodities,
    }
}

/// Bounds for one forecast row.
pub fn uncertainty_band(row: &ForecastObservation) -> UncertaintyBand {
    let predicted = row.predicted_value();
    match (row.lower_bound, row.upper_bound) {
        (Some(lower), Some(upper)) => UncertaintyBand {
            date: row.target_date,
            predicted: round_opt(predicted),
            lower: round_opt(finite(lower)),
            upper: round_opt(finite(upper)),
            heuristic: false,
        },
        _ => UncertaintyBand {
            date: row.target_date,
            predicted: round_opt(predicted),
            lower: round_opt(predicted.map(|p| p * HEURISTIC_LOWER_FACTOR)),
            upper: round_opt(predicted.map(|p| p * HEURISTIC_UPPER_FACTOR)),
            heuristic: true,
        },
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn scope_not_found(commodity: &str, market: &str) -> ServiceError {
    ServiceError::not_found(format!("commodity: {} in market: {}", commodity, market))
}

fn historical_scope(
    snapshot: &MarketSnapshot,
    commodity: &str,
    market: &str,
) -> ServiceResult<Table<HistoricalObservation>> {
    let hist = snapshot.historical().series(market, commodity);
    if hist.is_empty() {
        return Err(scope_not_found(commodity, market));
    }
    Ok(hist)
}

fn forecast_scope(
    snapshot: &MarketSnapshot,
    commodity: &str,
    market: &str,
) -> ServiceResult<Table<ForecastObservation>> {
    let pred = snapshot.forecast().series(market, commodity);
    if pred.is_empty() {
        return Err(scope_not_found(commodity, market));
    }
    Ok(pred)
}

fn by_day(table: &Table<HistoricalObservation>) -> BTreeMap<NaiveDate, Vec<&HistoricalObservation>> {
    let mut days: BTreeMap<NaiveDate, Vec<&HistoricalObservation>> = BTreeMap::new();
    for row in table.iter() {
        days.entry(row.arrival_date).or_default().push(row);
    }
    days
}

fn scoped<T>(commodity: &str, market: &str, data: Vec<T>) -> ScopedSeries<T> {
    ScopedSeries {
        commodity: commodity.to_string(),
        market: market.to_string(),
        data,
    }
}
