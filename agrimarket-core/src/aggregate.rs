//! Aggregation engine.
//!
//! Stateless reducers turning a filtered historical table into chart-ready
//! summaries. Every reducer is total: an empty table yields zeros, empty
//! lists or a null date range, never an error.
//!
//! Grouping is stable (first-seen order in the table) and every ranking uses
//! a stable sort, so ties keep first-seen order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;

use crate::filter;
use crate::precision::{month_name, round_opt, round_price};
use crate::stats::{self, EMPTY_MEAN_PRICE, UNDEFINED_VOLATILITY};
use crate::table::{MarketRow, Table};
use crate::types::{DataQualityReport, FilterCriteria, HistoricalObservation};

/// Cap for the ranked commodity lists.
pub const TOP_N: usize = 10;

/// Cap for each axis of the volatility heatmap.
pub const HEATMAP_AXIS_CAP: usize = 10;

/// Cap for the multi-commodity comparison.
pub const COMPARISON_CAP: usize = 4;

type Historical = Table<HistoricalObservation>;

// ============================================================================
// Result Shapes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_markets: usize,
    pub avg_modal_price: f64,
    pub selected_commodities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityCount {
    pub name: String,
    pub value: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityPrice {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyPrice {
    pub year: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPrice {
    pub month: u32,
    pub month_name: String,
    /// `None` when the month has no observations
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSeries {
    pub year: i32,
    /// Always twelve entries, January first
    pub months: Vec<MonthlyPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolatilityHeatmap {
    /// Row axis, highest mean volatility first
    pub commodities: Vec<String>,
    /// Column axis, highest mean volatility first
    pub markets: Vec<String>,
    /// `values[i][j]` is the volatility of `commodities[i]` at `markets[j]`
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalSeries {
    pub commodity: String,
    pub points: Vec<MonthlyPrice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDistribution {
    pub commodity: String,
    pub prices: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPerformance {
    pub market: String,
    pub avg_price: f64,
    pub volatility: f64,
    pub commodity_count: usize,
    pub record_count: usize,
    pub latest_date: NaiveDate,
    /// Whole days between `today` and `latest_date`
    pub freshness_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPrice {
    /// `YYYY-MM`
    pub period: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommoditySeries {
    pub commodity: String,
    pub points: Vec<PeriodPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommodityComparison {
    pub commodities: Vec<String>,
    pub series: Vec<CommoditySeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDetail {
    pub commodity: String,
    pub market: String,
    pub avg_price: f64,
}

// ============================================================================
// Reducers
// ============================================================================

/// Distinct markets, mean modal price and distinct commodities.
pub fn kpi_summary(table: &Historical) -> KpiSummary {
    let prices: Vec<f64> = table.iter().map(|r| r.modal_price).collect();
    KpiSummary {
        total_markets: table.distinct(|r| r.market.clone()).len(),
        avg_modal_price: round_price(stats::mean(&prices).unwrap_or(EMPTY_MEAN_PRICE)),
        selected_commodities: table.distinct(|r| r.commodity.clone()).len(),
    }
}

/// Commodities ranked by row count, capped at `n`.
pub fn top_by_frequency(table: &Historical, n: usize) -> Vec<CommodityCount> {
    let mut counts: Vec<(String, usize)> = table
        .group_by(|r| r.commodity.clone())
        .into_iter()
        .map(|g| (g.key, g.rows.len()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(n)
        .map(|(name, count)| CommodityCount {
            name,
            value: count,
            count,
        })
        .collect()
}

/// Commodities ranked by mean modal price, capped at `n`.
///
/// Commodities with no present price are left out.
pub fn top_by_price(table: &Historical, n: usize) -> Vec<CommodityPrice> {
    let mut means: Vec<(String, f64)> = table
        .group_by(|r| r.commodity.clone())
        .into_iter()
        .filter_map(|g| stats::mean(&g.prices()).map(|m| (g.key, m)))
        .collect();
    sort_desc(&mut means, |e| e.1);
    means
        .into_iter()
        .take(n)
        .map(|(name, price)| CommodityPrice {
            name,
            price: round_price(price),
        })
        .collect()
}

/// Mean modal price per calendar year, oldest first.
pub fn yearly_average(table: &Historical) -> Vec<YearlyPrice> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for row in table.iter() {
        by_year.entry(row.arrival_date.year()).or_default().push(row.modal_price);
    }
    by_year
        .into_iter()
        .map(|(year, prices)| YearlyPrice {
            year: year.to_string(),
            price: round_opt(stats::mean(&prices)),
        })
        .collect()
}

/// Twelve monthly means for every year present, oldest year first.
///
/// Months without data carry an explicit `None` price.
pub fn year_over_year(table: &Historical) -> Vec<YearSeries> {
    let mut cells: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for row in table.iter() {
        let date = row.arrival_date;
        cells
            .entry((date.year(), date.month()))
            .or_default()
            .push(row.modal_price);
    }

    let years: BTreeSet<i32> = cells.keys().map(|(y, _)| *y).collect();
    years
        .into_iter()
        .map(|year| YearSeries {
            year,
            months: (1..=12)
                .map(|month| MonthlyPrice {
                    month,
                    month_name: month_name(month).to_string(),
                    price: cells
                        .get(&(year, month))
                        .and_then(|prices| round_opt(stats::mean(prices))),
                })
                .collect(),
        })
        .collect()
}

/// Sample standard deviation of modal price per (commodity, market).
///
/// Both axes are restricted to the `cap` entries with the highest mean
/// volatility; the matrix is dense over that restricted axis set and pairs
/// absent from the data are 0.
pub fn volatility_heatmap(table: &Historical, cap: usize) -> VolatilityHeatmap {
    let groups = table.group_by(|r| (r.commodity.clone(), r.market.clone()));
    if groups.is_empty() {
        return VolatilityHeatmap::default();
    }

    let volatilities: Vec<f64> = groups
        .par_iter()
        .map(|g| stats::sample_std_dev(&g.prices()).unwrap_or(UNDEFINED_VOLATILITY))
        .collect();

    let pairs: Vec<(&(String, String), f64)> = groups
        .iter()
        .map(|g| &g.key)
        .zip(volatilities.iter().copied())
        .collect();

    let commodities = rank_axis(pairs.iter().map(|((c, _), v)| (c.as_str(), *v)), cap);
    let markets = rank_axis(pairs.iter().map(|((_, m), v)| (m.as_str(), *v)), cap);

    let lookup: HashMap<(&str, &str), f64> = pairs
        .iter()
        .map(|((c, m), v)| ((c.as_str(), m.as_str()), *v))
        .collect();

    let values = commodities
        .iter()
        .map(|c| {
            markets
                .iter()
                .map(|m| round_price(lookup.get(&(c.as_str(), m.as_str())).copied().unwrap_or(0.0)))
                .collect()
        })
        .collect();

    VolatilityHeatmap {
        commodities,
        markets,
        values,
    }
}

/// Mean modal price per month-of-year across all years, one series per commodity.
///
/// An empty `commodities` list selects the most frequent commodity.
pub fn seasonal_pattern(table: &Historical, commodities: &[String]) -> Vec<SeasonalSeries> {
    resolve_commodities(table, commodities, 1, usize::MAX)
        .into_iter()
        .map(|commodity| {
            let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
            for row in table.iter().filter(|r| r.commodity == commodity) {
                by_month
                    .entry(row.arrival_date.month())
                    .or_default()
                    .push(row.modal_price);
            }
            let points = by_month
                .into_iter()
                .map(|(month, prices)| MonthlyPrice {
                    month,
                    month_name: month_name(month).to_string(),
                    price: round_opt(stats::mean(&prices)),
                })
                .collect();
            SeasonalSeries { commodity, points }
        })
        .collect()
}

/// Raw present modal prices per commodity, in table order.
///
/// An empty `commodities` list selects the most frequent commodity.
pub fn price_distribution(table: &Historical, commodities: &[String]) -> Vec<PriceDistribution> {
    resolve_commodities(table, commodities, 1, usize::MAX)
        .into_iter()
        .map(|commodity| {
            let prices = table
                .iter()
                .filter(|r| r.commodity == commodity)
                .filter_map(|r| r.modal_value())
                .collect();
            PriceDistribution { commodity, prices }
        })
        .collect()
}

/// Per-market price level, volatility, breadth and freshness.
///
/// Sorted by commodity count descending, then mean price descending, then
/// volatility ascending.
pub fn market_performance(table: &Historical, today: NaiveDate) -> Vec<MarketPerformance> {
    let groups = table.group_by(|r| r.market.clone());

    let mut rows: Vec<MarketPerformance> = groups
        .par_iter()
        .filter_map(|g| {
            let latest_date = g.rows.iter().map(|r| r.arrival_date).max()?;
            let prices = g.prices();
            let commodity_count = g
                .rows
                .iter()
                .map(|r| r.commodity.as_str())
                .collect::<HashSet<_>>()
                .len();
            Some(MarketPerformance {
                market: g.key.clone(),
                avg_price: stats::mean(&prices).unwrap_or(EMPTY_MEAN_PRICE),
                volatility: stats::sample_std_dev(&prices).unwrap_or(UNDEFINED_VOLATILITY),
                commodity_count,
                record_count: g.rows.len(),
                latest_date,
                freshness_days: (today - latest_date).num_days(),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.commodity_count
            .cmp(&a.commodity_count)
            .then_with(|| b.avg_price.total_cmp(&a.avg_price))
            .then_with(|| a.volatility.total_cmp(&b.volatility))
    });

    for row in rows.iter_mut() {
        row.avg_price = round_price(row.avg_price);
        row.volatility = round_price(row.volatility);
    }
    rows
}

/// Row count and arrival-date coverage.
pub fn data_quality(table: &Historical) -> DataQualityReport {
    let Some((first, last)) = table.date_bounds() else {
        return DataQualityReport::default();
    };

    let unique_days = table
        .iter()
        .map(|r| r.arrival_date)
        .collect::<BTreeSet<_>>()
        .len() as i64;
    let date_span_days = (last - first).num_days() + 1;
    let completeness_pct = if date_span_days > 0 {
        round_price(unique_days as f64 / date_span_days as f64 * 100.0)
    } else {
        0.0
    };

    DataQualityReport {
        total_records: table.len(),
        first_date: Some(first),
        last_date: Some(last),
        date_span_days,
        unique_days,
        completeness_pct,
        missing_days: date_span_days - unique_days,
    }
}

/// Monthly-averaged series for up to `cap` commodities.
///
/// Only the date range of `criteria` is applied; state, market and
/// commodity constraints are ignored. Without a requested list the most
/// frequent commodities of the date-filtered table are used.
pub fn multi_commodity_comparison(
    historical: &Historical,
    criteria: &FilterCriteria,
    requested: &[String],
    cap: usize,
) -> CommodityComparison {
    let base = filter::apply(historical, &criteria.date_only());
    let commodities = resolve_commodities(&base, requested, cap, cap);

    let series = commodities
        .iter()
        .map(|commodity| {
            let mut by_period: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
            for row in base.iter().filter(|r| &r.commodity == commodity) {
                let date = row.arrival_date;
                by_period
                    .entry((date.year(), date.month()))
                    .or_default()
                    .push(row.modal_price);
            }
            let points = by_period
                .into_iter()
                .filter_map(|((year, month), prices)| {
                    stats::mean(&prices).map(|m| PeriodPrice {
                        period: format!("{:04}-{:02}", year, month),
                        price: round_price(m),
                    })
                })
                .collect();
            CommoditySeries {
                commodity: commodity.clone(),
                points,
            }
        })
        .collect();

    CommodityComparison {
        commodities,
        series,
    }
}

/// Mean modal price per (commodity, market), highest first.
pub fn price_details(table: &Historical) -> Vec<PriceDetail> {
    let mut details: Vec<PriceDetail> = table
        .group_by(|r| (r.commodity.clone(), r.market.clone()))
        .into_iter()
        .filter_map(|g| {
            stats::mean(&g.prices()).map(|avg| PriceDetail {
                commodity: g.key.0,
                market: g.key.1,
                avg_price: avg,
            })
        })
        .collect();
    sort_desc(&mut details, |d| d.avg_price);
    for detail in details.iter_mut() {
        detail.avg_price = round_price(detail.avg_price);
    }
    details
}

// ============================================================================
// Helpers
// ============================================================================

/// Stable descending sort on an f64 key.
fn sort_desc<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Requested commodities (deduplicated, at most `cap`), or the `fallback`
/// most frequent ones when nothing was requested.
fn resolve_commodities<R: MarketRow>(
    table: &Table<R>,
    requested: &[String],
    fallback: usize,
    cap: usize,
) -> Vec<String> {
    if requested.is_empty() {
        let mut counts: Vec<(String, usize)> = table
            .group_by(|r| r.commodity().to_string())
            .into_iter()
            .map(|g| (g.key, g.rows.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        return counts
            .into_iter()
            .take(fallback.min(cap))
            .map(|(c, _)| c)
            .collect();
    }

    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .take(cap)
        .cloned()
        .collect()
}

/// Mean volatility per axis label, top `cap` labels, first-seen on ties.
fn rank_axis<'a>(pairs: impl Iterator<Item = (&'a str, f64)>, cap: usize) -> Vec<String> {
    let mut order: Vec<&'a str> = Vec::new();
    let mut acc: HashMap<&'a str, (f64, usize)> = HashMap::new();
    for (label, v) in pairs {
        let entry = acc.entry(label).or_insert_with(|| {
            order.push(label);
            (0.0, 0)
        });
        entry.0 += v;
        entry.1 += 1;
    }

    let mut ranked: Vec<(&str, f64)> = order
        .into_iter()
        .map(|label| {
            let (sum, n) = acc[label];
            (label, sum / n as f64)
        })
        .collect();
    sort_desc(&mut ranked, |e| e.1);
    ranked
        .into_iter()
        .take(cap)
        .map(|(label, _)| label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obs(market: &str, commodity: &str, date: NaiveDate, price: f64) -> HistoricalObservation {
        HistoricalObservation::new(market, commodity, date, price)
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = kpi_summary(&Table::empty());
        assert_eq!(
            kpi,
            KpiSummary {
                total_markets: 0,
                avg_modal_price: 0.0,
                selected_commodities: 0
            }
        );
    }

    #[test]
    fn test_kpi_values() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2023, 1, 1), 100.0),
            obs("A", "Wheat", d(2023, 1, 1), 50.0),
            obs("B", "Rice", d(2023, 1, 2), 101.0),
        ]);
        let kpi = kpi_summary(&table);
        assert_eq!(kpi.total_markets, 2);
        assert_eq!(kpi.selected_commodities, 2);
        assert_eq!(kpi.avg_modal_price, 83.67);
    }

    #[test]
    fn test_top_by_frequency_ties_keep_first_seen() {
        let table = Table::from(vec![
            obs("A", "Onion", d(2023, 1, 1), 1.0),
            obs("A", "Rice", d(2023, 1, 1), 1.0),
            obs("A", "Wheat", d(2023, 1, 1), 1.0),
            obs("A", "Wheat", d(2023, 1, 2), 1.0),
            obs("A", "Rice", d(2023, 1, 2), 1.0),
        ]);
        let top = top_by_frequency(&table, TOP_N);
        let names: Vec<&str> = top.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Rice", "Wheat", "Onion"]);
        assert_eq!(top[0].value, 2);
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn test_top_by_frequency_capped() {
        let rows: Vec<HistoricalObservation> = (0..15)
            .map(|i| obs("A", &format!("C{}", i), d(2023, 1, 1), 1.0))
            .collect();
        assert_eq!(top_by_frequency(&Table::from(rows), TOP_N).len(), 10);
    }

    #[test]
    fn test_top_by_price() {
        let table = Table::from(vec![
            obs("A", "Onion", d(2023, 1, 1), 20.0),
            obs("A", "Saffron", d(2023, 1, 1), 900.0),
            obs("A", "Rice", d(2023, 1, 1), 40.0),
            obs("A", "Rice", d(2023, 1, 2), 41.0),
            obs("A", "Ghost", d(2023, 1, 2), f64::NAN),
        ]);
        let top = top_by_price(&table, TOP_N);
        let names: Vec<&str> = top.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Saffron", "Rice", "Onion"]);
        assert_eq!(top[1].price, 40.5);
    }

    #[test]
    fn test_yearly_average() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2024, 3, 1), 30.0),
            obs("A", "Rice", d(2023, 1, 1), 10.0),
            obs("A", "Rice", d(2023, 6, 1), 20.0),
        ]);
        let years = yearly_average(&table);
        assert_eq!(
            years,
            vec![
                YearlyPrice { year: "2023".into(), price: Some(15.0) },
                YearlyPrice { year: "2024".into(), price: Some(30.0) },
            ]
        );
    }

    #[test]
    fn test_year_over_year_fills_missing_months_with_none() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2023, 1, 10), 10.0),
            obs("A", "Rice", d(2023, 1, 20), 20.0),
            obs("A", "Rice", d(2023, 3, 1), 30.0),
            obs("A", "Rice", d(2024, 12, 1), 40.0),
        ]);
        let grid = year_over_year(&table);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].year, 2023);
        assert_eq!(grid[0].months.len(), 12);
        assert_eq!(grid[0].months[0].price, Some(15.0));
        assert_eq!(grid[0].months[1].price, None);
        assert_eq!(grid[0].months[2].price, Some(30.0));
        assert_eq!(grid[1].months[11].price, Some(40.0));
        assert_eq!(grid[1].months[0].month_name, "Jan");
        assert!(grid[1].months[..11].iter().all(|m| m.price.is_none()));
    }

    #[test]
    fn test_volatility_heatmap_dense_with_zero_fill() {
        let table = Table::from(vec![
            obs("M1", "Rice", d(2023, 1, 1), 10.0),
            obs("M1", "Rice", d(2023, 1, 2), 20.0),
            obs("M2", "Onion", d(2023, 1, 1), 5.0),
            obs("M2", "Onion", d(2023, 1, 2), 7.0),
            obs("M2", "Rice", d(2023, 1, 3), 99.0),
        ]);
        let heatmap = volatility_heatmap(&table, HEATMAP_AXIS_CAP);
        assert_eq!(heatmap.commodities, vec!["Rice", "Onion"]);
        assert_eq!(heatmap.markets, vec!["M1", "M2"]);
        // Rice@M1 sd of {10,20}
        assert_eq!(heatmap.values[0][0], round_price((50.0f64).sqrt()));
        // Rice@M2 single observation
        assert_eq!(heatmap.values[0][1], 0.0);
        // Onion@M1 absent
        assert_eq!(heatmap.values[1][0], 0.0);
        assert_eq!(heatmap.values[1][1], round_price((2.0f64).sqrt()));
    }

    #[test]
    fn test_volatility_heatmap_empty() {
        assert_eq!(volatility_heatmap(&Table::empty(), HEATMAP_AXIS_CAP), VolatilityHeatmap::default());
    }

    #[test]
    fn test_seasonal_pattern_multiple_commodities() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2022, 1, 1), 10.0),
            obs("A", "Rice", d(2023, 1, 1), 30.0),
            obs("A", "Rice", d(2023, 7, 1), 50.0),
            obs("A", "Onion", d(2023, 7, 1), 5.0),
        ]);
        let series = seasonal_pattern(&table, &["Rice".to_string(), "Onion".to_string()]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].commodity, "Rice");
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[0].points[0].price, Some(20.0));
        assert_eq!(series[0].points[1].month, 7);
        assert_eq!(series[1].points[0].price, Some(5.0));

        let default = seasonal_pattern(&table, &[]);
        assert_eq!(default.len(), 1);
        assert_eq!(default[0].commodity, "Rice");
    }

    #[test]
    fn test_price_distribution_drops_missing() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2023, 1, 1), 10.0),
            obs("A", "Rice", d(2023, 1, 2), f64::NAN),
            obs("A", "Rice", d(2023, 1, 3), 12.0),
        ]);
        let dist = price_distribution(&table, &["Rice".to_string(), "Wheat".to_string()]);
        assert_eq!(dist[0].prices, vec![10.0, 12.0]);
        assert!(dist[1].prices.is_empty());
    }

    #[test]
    fn test_market_performance_sort_order() {
        let table = Table::from(vec![
            // M1: 1 commodity, mean 100
            obs("M1", "Rice", d(2023, 1, 1), 100.0),
            // M2: 2 commodities, mean 10
            obs("M2", "Rice", d(2023, 1, 1), 10.0),
            obs("M2", "Onion", d(2023, 1, 5), 10.0),
            // M3: 2 commodities, mean 10, higher volatility
            obs("M3", "Rice", d(2023, 1, 1), 5.0),
            obs("M3", "Onion", d(2023, 1, 2), 15.0),
            // M4: 2 commodities, mean 50
            obs("M4", "Rice", d(2023, 1, 1), 50.0),
            obs("M4", "Wheat", d(2023, 1, 1), 50.0),
        ]);
        let perf = market_performance(&table, d(2023, 1, 10));
        let markets: Vec<&str> = perf.iter().map(|p| p.market.as_str()).collect();
        assert_eq!(markets, vec!["M4", "M2", "M3", "M1"]);
        assert_eq!(perf[1].freshness_days, 5);
        assert_eq!(perf[1].latest_date, d(2023, 1, 5));
        assert_eq!(perf[3].volatility, 0.0);
        assert_eq!(perf[3].record_count, 1);
    }

    #[test]
    fn test_data_quality() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2023, 1, 1), 1.0),
            obs("B", "Rice", d(2023, 1, 1), 1.0),
            obs("A", "Rice", d(2023, 1, 4), 1.0),
        ]);
        let report = data_quality(&table);
        assert_eq!(report.total_records, 3);
        assert_eq!(report.date_span_days, 4);
        assert_eq!(report.unique_days, 2);
        assert_eq!(report.missing_days, 2);
        assert_eq!(report.completeness_pct, 50.0);
        assert_eq!(report.first_date, Some(d(2023, 1, 1)));
    }

    #[test]
    fn test_data_quality_empty() {
        let report = data_quality(&Table::empty());
        assert_eq!(report, DataQualityReport::default());
        assert_eq!(report.first_date, None);
        assert_eq!(report.completeness_pct, 0.0);
    }

    #[test]
    fn test_comparison_ignores_commodity_and_market_filters() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2023, 1, 1), 10.0),
            obs("A", "Rice", d(2023, 1, 15), 20.0),
            obs("B", "Rice", d(2023, 2, 1), 30.0),
            obs("B", "Onion", d(2023, 2, 1), 5.0),
            obs("B", "Onion", d(2022, 2, 1), 5.0),
        ]);
        let criteria = FilterCriteria::all()
            .with_markets(["A"])
            .with_commodities(["Wheat"])
            .with_date_range(Some(d(2023, 1, 1)), None);
        let cmp = multi_commodity_comparison(&table, &criteria, &[], COMPARISON_CAP);
        assert_eq!(cmp.commodities, vec!["Rice", "Onion"]);
        assert_eq!(cmp.series[0].points.len(), 2);
        assert_eq!(cmp.series[0].points[0].period, "2023-01");
        assert_eq!(cmp.series[0].points[0].price, 15.0);
        assert_eq!(cmp.series[1].points.len(), 1);
    }

    #[test]
    fn test_comparison_caps_requested() {
        let requested: Vec<String> = ["A", "B", "C", "D", "E", "A"].iter().map(|s| s.to_string()).collect();
        let cmp = multi_commodity_comparison(&Table::empty(), &FilterCriteria::all(), &requested, COMPARISON_CAP);
        assert_eq!(cmp.commodities, vec!["A", "B", "C", "D"]);
        assert!(cmp.series.iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn test_price_details_sorted_desc() {
        let table = Table::from(vec![
            obs("A", "Rice", d(2023, 1, 1), 10.0),
            obs("B", "Rice", d(2023, 1, 1), 30.0),
            obs("A", "Rice", d(2023, 1, 2), 20.0),
        ]);
        let details = price_details(&table);
        assert_eq!(details[0].market, "B");
        assert_eq!(details[1].avg_price, 15.0);
    }
}
