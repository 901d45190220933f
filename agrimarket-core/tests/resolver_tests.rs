//! Scenario tests for `price-for-date` resolution through the query service.

use chrono::NaiveDate;

use agrimarket_core::query::{QueryParams, QueryService};
use agrimarket_core::resolver::{PriceResolver, PriceStatus};
use agrimarket_core::snapshot::MarketSnapshot;
use agrimarket_core::table::Table;
use agrimarket_core::types::{ForecastObservation, HistoricalObservation};
use agrimarket_core::ServiceConfig;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn rice_history() -> Vec<HistoricalObservation> {
    vec![
        HistoricalObservation::new("X", "Rice", d(2023, 1, 1), 100.0),
        HistoricalObservation::new("X", "Rice", d(2023, 1, 5), 120.0),
    ]
}

#[test]
fn test_equidistant_dates_resolve_to_earlier_row() {
    let h = Table::from(rice_history());
    let f = Table::empty();
    let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2023, 1, 3));

    assert_eq!(res.status, PriceStatus::HistoricalNearest);
    assert_eq!(res.date, Some(d(2023, 1, 1)));
    assert_eq!(res.price, Some(100.0));
    assert_eq!(
        res.message,
        "No exact data for this date. Showing nearest available: Jan 01, 2023"
    );
}

#[test]
fn test_before_history_without_forecast_is_not_available() {
    let h = Table::from(rice_history());
    let f = Table::empty();
    let res = PriceResolver::new(&h, &f).resolve("Rice", "X", d(2022, 6, 1));

    assert_eq!(res.status, PriceStatus::NotAvailable);
    assert_eq!(res.price, None);
    assert_eq!(
        res.message,
        "No data available for Jun 01, 2022. Data starts from Jan 01, 2023"
    );
}

#[test]
fn test_json_shape_through_service() {
    let snapshot = MarketSnapshot::new(
        rice_history(),
        vec![ForecastObservation::new("X", "Rice", d(2023, 3, 1), 130.456)],
    );
    let service = QueryService::from_snapshot(snapshot, ServiceConfig::default());

    let params = QueryParams::new()
        .with_commodity("Rice")
        .with_market("X")
        .with_date("2023-03-01");
    let out = service.execute("price-for-date", &params).unwrap();
    assert_eq!(out["status"], "predicted");
    assert_eq!(out["date"], "2023-03-01");
    assert_eq!(out["price"], 130.46);

    let params = QueryParams::new()
        .with_commodity("Rice")
        .with_market("X")
        .with_date("2023-04-01");
    let out = service.execute("price-for-date", &params).unwrap();
    assert_eq!(out["status"], "future");
    assert!(out.get("price").is_none());
}

#[test]
fn test_unknown_pair_is_no_data_not_error() {
    let snapshot = MarketSnapshot::new(rice_history(), Vec::<ForecastObservation>::new());
    let service = QueryService::from_snapshot(snapshot, ServiceConfig::default());
    let params = QueryParams::new()
        .with_commodity("Wheat")
        .with_market("X")
        .with_date("2023-01-01");

    let out = service.execute("price-for-date", &params).unwrap();
    assert_eq!(out["status"], "no_data");
}
