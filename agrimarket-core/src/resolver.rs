//! Temporal price resolver.
//!
//! Answers "what price applies on date D for market M, commodity C" by
//! reconciling the historical and forecast series of that pair. Branches are
//! evaluated in a fixed order and the first match wins:
//!
//! 1. D inside the historical range: exact row, else nearest row
//! 2. D inside the forecast range: exact row, else nearest row
//! 3. D before the first historical date: not available
//! 4. D after the last forecast date: future
//! 5. otherwise: no data
//!
//! Historical data always wins where the two ranges overlap. When two rows
//! are equally close to D the earlier one in the date-sorted series wins.

use chrono::NaiveDate;
use serde::Serialize;

use crate::precision::{long_date, round_opt};
use crate::table::{MarketRow, Table};
use crate::types::{finite, ForecastObservation, HistoricalObservation};

/// Outcome of a point-in-time price lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    Historical,
    HistoricalNearest,
    Predicted,
    PredictedNearest,
    NotAvailable,
    Future,
    NoData,
}

impl PriceStatus {
    /// All seven outcomes.
    pub const ALL: [PriceStatus; 7] = [
        PriceStatus::Historical,
        PriceStatus::HistoricalNearest,
        PriceStatus::Predicted,
        PriceStatus::PredictedNearest,
        PriceStatus::NotAvailable,
        PriceStatus::Future,
        PriceStatus::NoData,
    ];

    /// True for the two outcomes backed by historical rows.
    pub fn is_historical(&self) -> bool {
        matches!(self, PriceStatus::Historical | PriceStatus::HistoricalNearest)
    }

    /// True for the two outcomes backed by forecast rows.
    pub fn is_predicted(&self) -> bool {
        matches!(self, PriceStatus::Predicted | PriceStatus::PredictedNearest)
    }
}

/// Result of [`PriceResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceResolution {
    pub status: PriceStatus,
    /// Date of the row the price came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub message: String,
}

/// Row picked from a series for a target date.
enum SeriesHit<'a, R> {
    Exact(&'a R),
    Nearest(&'a R),
}

/// Resolver over one historical and one forecast table.
#[derive(Debug, Clone, Copy)]
pub struct PriceResolver<'a> {
    historical: &'a Table<HistoricalObservation>,
    forecast: &'a Table<ForecastObservation>,
}

impl<'a> PriceResolver<'a> {
    pub fn new(
        historical: &'a Table<HistoricalObservation>,
        forecast: &'a Table<ForecastObservation>,
    ) -> Self {
        Self {
            historical,
            forecast,
        }
    }

    /// Resolve the price for `commodity` at `market` on `target`.
    ///
    /// Always returns exactly one of the seven outcomes.
    pub fn resolve(&self, commodity: &str, market: &str, target: NaiveDate) -> PriceResolution {
        let hist = self.historical.series(market, commodity);
        let pred = self.forecast.series(market, commodity);
        let hist_bounds = hist.date_bounds();
        let pred_bounds = pred.date_bounds();

        if let Some(hit) = pick(&hist, hist_bounds, target) {
            return match hit {
                SeriesHit::Exact(row) => PriceResolution {
                    status: PriceStatus::Historical,
                    date: Some(target),
                    price: round_opt(finite(row.modal_price)),
                    message: format!(
                        "Historical price for {} in {} on {}",
                        commodity,
                        market,
                        long_date(target)
                    ),
                },
                SeriesHit::Nearest(row) => PriceResolution {
                    status: PriceStatus::HistoricalNearest,
                    date: Some(row.arrival_date),
                    price: round_opt(finite(row.modal_price)),
                    message: format!(
                        "No exact data for this date. Showing nearest available: {}",
                        long_date(row.arrival_date)
                    ),
                },
            };
        }

        if let Some(hit) = pick(&pred, pred_bounds, target) {
            return match hit {
                SeriesHit::Exact(row) => PriceResolution {
                    status: PriceStatus::Predicted,
                    date: Some(target),
                    price: round_opt(finite(row.predicted_price)),
                    message: format!(
                        "Predicted price for {} in {} on {}",
                        commodity,
                        market,
                        long_date(target)
                    ),
                },
                SeriesHit::Nearest(row) => PriceResolution {
                    status: PriceStatus::PredictedNearest,
                    date: Some(row.target_date),
                    price: round_opt(finite(row.predicted_price)),
                    message: format!(
                        "Predicted price (nearest date: {})",
                        long_date(row.target_date)
                    ),
                },
            };
        }

        if let Some((hist_min, _)) = hist_bounds {
            if target < hist_min {
                return PriceResolution {
                    status: PriceStatus::NotAvailable,
                    date: None,
                    price: None,
                    message: format!(
                        "No data available for {}. Data starts from {}",
                        long_date(target),
                        long_date(hist_min)
                    ),
                };
            }
        }

        if let Some((_, pred_max)) = pred_bounds {
            if target > pred_max {
                return PriceResolution {
                    status: PriceStatus::Future,
                    date: None,
                    price: None,
                    message: format!(
                        "Prediction for {} will be available soon. Current predictions go up to {}",
                        long_date(target),
                        long_date(pred_max)
                    ),
                };
            }
        }

        PriceResolution {
            status: PriceStatus::NoData,
            date: None,
            price: None,
            message: format!(
                "No data or predictions available for {} in {}",
                commodity, market
            ),
        }
    }
}

/// Exact row for `target`, else the row closest to it.
///
/// `None` when `target` lies outside `bounds` (or the series is empty).
/// `series` is sorted by date and both searches return the earliest-indexed
/// candidate.
fn pick<R: MarketRow>(
    series: &Table<R>,
    bounds: Option<(NaiveDate, NaiveDate)>,
    target: NaiveDate,
) -> Option<SeriesHit<'_, R>> {
    let (lo, hi) = bounds?;
    if target < lo || target > hi {
        return None;
    }
    if let Some(row) = series.iter().find(|r| r.date() == target) {
        return Some(SeriesHit::Exact(row));
    }
    // min_by_key keeps the first of equal minima
    series
        .iter()
        .min_by_key(|r| (r.date() - target).num_days().abs())
        .map(SeriesHit::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn hist(rows: &[(NaiveDate, f64)]) -> Table<HistoricalObservation> {
        rows.iter()
            .map(|(date, p)| HistoricalObservation::new("X", "Rice", *date, *p))
            .collect()
    }

    fn pred(rows: &[(NaiveDate, f64)]) -> Table<ForecastObservation> {
        rows.iter()
            .map(|(date, p)| ForecastObservation::new("X", "Rice", *date, *p))
            .collect()
    }

    #[test]
    fn test_exact_historical() {
        let h = hist(&[(d(2023, 1, 1), 100.0), (d(2023, 1, 5), 120.0)]);
        let f = Table::empty();
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2023, 1, 5));
        assert_eq!(res.status, PriceStatus::Historical);
        assert_eq!(res.price, Some(120.0));
        assert_eq!(res.date, Some(d(2023, 1, 5)));
    }

    #[test]
    fn test_nearest_tie_picks_earlier_row() {
        let h = hist(&[(d(2023, 1, 5), 120.0), (d(2023, 1, 1), 100.0)]);
        let f = Table::empty();
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2023, 1, 3));
        assert_eq!(res.status, PriceStatus::HistoricalNearest);
        assert_eq!(res.price, Some(100.0));
        assert_eq!(res.date, Some(d(2023, 1, 1)));
    }

    #[test]
    fn test_overlap_prefers_historical() {
        let h = hist(&[(d(2023, 1, 1), 100.0), (d(2023, 3, 1), 120.0)]);
        let f = pred(&[(d(2023, 2, 1), 999.0), (d(2023, 6, 1), 130.0)]);
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2023, 2, 1));
        assert_eq!(res.status, PriceStatus::HistoricalNearest);
        assert_eq!(res.price, Some(100.0));
    }

    #[test]
    fn test_predicted_exact_and_nearest() {
        let h = hist(&[(d(2023, 1, 1), 100.0)]);
        let f = pred(&[(d(2023, 2, 1), 110.0), (d(2023, 2, 10), 115.0)]);
        let resolver = PriceResolver::new(&h, &f);

        let exact = resolver.resolve("Rice", "X", d(2023, 2, 10));
        assert_eq!(exact.status, PriceStatus::Predicted);
        assert_eq!(exact.price, Some(115.0));

        let nearest = resolver.resolve("Rice", "X", d(2023, 2, 8));
        assert_eq!(nearest.status, PriceStatus::PredictedNearest);
        assert_eq!(nearest.date, Some(d(2023, 2, 10)));
    }

    #[test]
    fn test_before_history_not_available() {
        let h = hist(&[(d(2023, 1, 1), 100.0)]);
        let f = Table::empty();
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2022, 12, 31));
        assert_eq!(res.status, PriceStatus::NotAvailable);
        assert!(res.price.is_none());
        assert!(res.message.contains("Jan 01, 2023"));
    }

    #[test]
    fn test_beyond_horizon_future() {
        let h = Table::empty();
        let f = pred(&[(d(2024, 1, 1), 100.0)]);
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2024, 2, 1));
        assert_eq!(res.status, PriceStatus::Future);
    }

    #[test]
    fn test_gap_between_history_and_forecast() {
        let h = hist(&[(d(2023, 1, 1), 100.0)]);
        let f = pred(&[(d(2023, 6, 1), 100.0)]);
        // after history ends, before forecast starts
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2023, 3, 1));
        assert_eq!(res.status, PriceStatus::NoData);
    }

    #[test]
    fn test_unknown_pair_no_data() {
        let h = hist(&[(d(2023, 1, 1), 100.0)]);
        let f = Table::empty();
        let res = PriceResolver::new(&h, &f).resolve("Wheat", "X", d(2023, 1, 1));
        assert_eq!(res.status, PriceStatus::NoData);
        assert!(res.message.contains("Wheat"));
    }

    #[test]
    fn test_pick_outside_bounds_or_empty() {
        let h = hist(&[(d(2023, 1, 1), 100.0), (d(2023, 1, 5), 120.0)]);
        let bounds = h.date_bounds();
        assert!(pick(&h, bounds, d(2022, 12, 31)).is_none());
        assert!(pick(&h, bounds, d(2023, 1, 6)).is_none());
        assert!(matches!(pick(&h, bounds, d(2023, 1, 5)), Some(SeriesHit::Exact(r)) if r.modal_price == 120.0));
        assert!(matches!(pick(&h, bounds, d(2023, 1, 2)), Some(SeriesHit::Nearest(r)) if r.modal_price == 100.0));

        let empty: Table<HistoricalObservation> = Table::empty();
        assert!(pick(&empty, empty.date_bounds(), d(2023, 1, 1)).is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&PriceStatus::HistoricalNearest).unwrap();
        assert_eq!(json, "\"historical_nearest\"");
    }
}
