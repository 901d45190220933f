//! Output precision and rendering helpers.
//!
//! This module provides:
//! - `round_price()` for 2-decimal rounding of reported prices via `rust_decimal`
//! - `PRICE_EPSILON`, `price_eq()` and `price_le()` for floating-point comparisons
//! - date renderers used in query results

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Price comparison epsilon (1e-9)
pub const PRICE_EPSILON: f64 = 1e-9;

/// Number of decimal places in reported prices.
pub const PRICE_DECIMALS: u32 = 2;

/// Price-specific equality comparison using PRICE_EPSILON.
#[inline]
pub fn price_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < PRICE_EPSILON
}

/// `a <= b`, treating values within PRICE_EPSILON as equal.
#[inline]
pub fn price_le(a: f64, b: f64) -> bool {
    a < b || price_eq(a, b)
}

/// Round a price to 2 decimals, half to even.
///
/// Rounding goes through `Decimal` so values are rounded on their shortest
/// decimal representation. Non-finite input is returned unchanged.
pub fn round_price(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    match Decimal::from_f64(value) {
        Some(dec) => dec
            .round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointNearestEven)
            .to_f64()
            .unwrap_or(value),
        None => value,
    }
}

/// Round an optional price.
#[inline]
pub fn round_opt(value: Option<f64>) -> Option<f64> {
    value.map(round_price)
}

/// `2023-01-05`
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `Jan 2023`
pub fn month_year(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// `Jan 05, 2023`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Three-letter month name for 1..=12.
pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    month
        .checked_sub(1)
        .and_then(|i| NAMES.get(i as usize))
        .copied()
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(110.0), 110.0);
        assert_eq!(round_price(3.14159), 3.14);
        assert_eq!(round_price(99.999), 100.0);
        assert_eq!(round_price(0.125), 0.12);
        assert!(round_price(f64::NAN).is_nan());
    }

    #[test]
    fn test_price_eq() {
        assert!(price_eq(100.0, 100.0 + 1e-12));
        assert!(!price_eq(100.0, 100.01));
    }

    #[test]
    fn test_price_le() {
        assert!(price_le(99.0, 100.0));
        assert!(price_le(100.0 + 1e-12, 100.0));
        assert!(!price_le(100.01, 100.0));
    }

    #[test]
    fn test_date_renderers() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();
        assert_eq!(iso_date(date), "2023-01-05");
        assert_eq!(month_year(date), "Jan 2023");
        assert_eq!(long_date(date), "Jan 05, 2023");
    }

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), "Jan");
        assert_eq!(month_name(12), "Dec");
        assert_eq!(month_name(0), "");
        assert_eq!(month_name(13), "");
    }
}
