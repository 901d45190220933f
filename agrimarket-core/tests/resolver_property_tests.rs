//! Property-based tests for the temporal price resolver.
//!
//! Verifies that:
//! 1. Every (date, market, commodity) gets exactly one outcome, with a price
//!    exactly when the outcome is backed by a row
//! 2. Dates inside the historical range always resolve to historical rows
//! 3. Exact historical matches return the row's price
//! 4. Nearest matches are never farther than any other row

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use agrimarket_core::resolver::{PriceResolver, PriceStatus};
use agrimarket_core::table::Table;
use agrimarket_core::types::{ForecastObservation, HistoricalObservation};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(offset)
}

fn historical(points: &[(i64, u32)]) -> Table<HistoricalObservation> {
    points
        .iter()
        .map(|&(d, p)| HistoricalObservation::new("X", "Rice", day(d), p as f64))
        .collect()
}

fn forecast(points: &[(i64, u32)]) -> Table<ForecastObservation> {
    points
        .iter()
        .map(|&(d, p)| ForecastObservation::new("X", "Rice", day(d), p as f64))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Exactly one outcome; price and date present iff a row backs it
    #[test]
    fn resolver_is_total(
        hist in prop::collection::vec((0i64..100, 1u32..1000), 0..20),
        pred in prop::collection::vec((50i64..200, 1u32..1000), 0..20),
        target in -20i64..240,
    ) {
        let h = historical(&hist);
        let f = forecast(&pred);
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", day(target));

        prop_assert!(PriceStatus::ALL.contains(&res.status));
        let backed = res.status.is_historical() || res.status.is_predicted();
        prop_assert_eq!(res.price.is_some(), backed);
        prop_assert_eq!(res.date.is_some(), backed);
        prop_assert!(!res.message.is_empty());
    }

    /// Inside the historical range the outcome is always historical
    #[test]
    fn historical_range_takes_precedence(
        hist in prop::collection::vec((0i64..100, 1u32..1000), 1..20),
        pred in prop::collection::vec((0i64..150, 1u32..1000), 0..20),
        pick in 0usize..1000,
    ) {
        let h = historical(&hist);
        let f = forecast(&pred);
        let lo = hist.iter().map(|p| p.0).min().unwrap();
        let hi = hist.iter().map(|p| p.0).max().unwrap();
        let target = lo + (pick as i64 % (hi - lo + 1));

        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", day(target));
        prop_assert!(res.status.is_historical(), "got {:?}", res.status);
    }

    /// An exact historical date returns that row's price
    #[test]
    fn exact_match_returns_row_price(
        offsets in prop::collection::btree_set(0i64..100, 1..20),
        price in 1u32..1000,
        pick in 0usize..20,
    ) {
        let offsets: Vec<i64> = offsets.into_iter().collect();
        let chosen = offsets[pick % offsets.len()];
        let points: Vec<(i64, u32)> = offsets
            .iter()
            .map(|&d| (d, if d == chosen { price } else { price + 1 }))
            .collect();
        let h = historical(&points);
        let f = Table::empty();

        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", day(chosen));
        prop_assert_eq!(res.status, PriceStatus::Historical);
        prop_assert_eq!(res.price, Some(price as f64));
    }

    /// The nearest row is at minimal distance, and the earlier one on a tie
    #[test]
    fn nearest_is_minimal_and_earliest(
        offsets in prop::collection::btree_set(0i64..100, 2..20),
        target in 0i64..100,
    ) {
        let points: Vec<(i64, u32)> = offsets.iter().map(|&d| (d, 100)).collect();
        let h = historical(&points);
        let f = Table::empty();
        let res = PriceResolver::new(&h, &f).resolve("Rice", "X", day(target));

        if res.status == PriceStatus::HistoricalNearest {
            let chosen = res.date.unwrap();
            let dist = (chosen - day(target)).num_days().abs();
            for &d in &offsets {
                let other = (day(d) - day(target)).num_days().abs();
                prop_assert!(dist <= other);
                if other == dist {
                    prop_assert!(chosen <= day(d));
                }
            }
        }
    }
}
