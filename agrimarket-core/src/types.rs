//! Core data model for the market price service.
//!
//! Observations are immutable once loaded. Missing numeric cells are stored
//! as `NaN` and skipped by every statistic; use the `*_value()` accessors to
//! get them as `Option<f64>`.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::precision::price_le;

/// One observed price record for a commodity lot at a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalObservation {
    pub state: String,
    pub district: String,
    pub market: String,
    pub commodity: String,
    pub variety: String,
    pub grade: String,
    /// Calendar date the lot was recorded at the market
    pub arrival_date: NaiveDate,
    pub min_price: f64,
    pub max_price: f64,
    /// Most frequently quoted price; the canonical price signal
    pub modal_price: f64,
    pub commodity_code: String,
}

impl HistoricalObservation {
    /// Create an observation with a single quoted price.
    ///
    /// Min and max are set to the modal price; location and grading
    /// fields are empty until set with the `with_*` builders.
    pub fn new(
        market: impl Into<String>,
        commodity: impl Into<String>,
        arrival_date: NaiveDate,
        modal_price: f64,
    ) -> Self {
        Self {
            state: String::new(),
            district: String::new(),
            market: market.into(),
            commodity: commodity.into(),
            variety: String::new(),
            grade: String::new(),
            arrival_date,
            min_price: modal_price,
            max_price: modal_price,
            modal_price,
            commodity_code: String::new(),
        }
    }

    /// Set state and district.
    pub fn with_location(mut self, state: impl Into<String>, district: impl Into<String>) -> Self {
        self.state = state.into();
        self.district = district.into();
        self
    }

    /// Set the min/max price band.
    pub fn with_range(mut self, min_price: f64, max_price: f64) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    /// Set variety and grade.
    pub fn with_grading(mut self, variety: impl Into<String>, grade: impl Into<String>) -> Self {
        self.variety = variety.into();
        self.grade = grade.into();
        self
    }

    /// Modal price, `None` when missing.
    pub fn modal_value(&self) -> Option<f64> {
        finite(self.modal_price)
    }

    /// True when all three prices are present and Min <= Modal <= Max.
    ///
    /// Rows failing this check are still loaded; see `LoadReport`.
    pub fn has_ordered_prices(&self) -> bool {
        match (
            finite(self.min_price),
            finite(self.modal_price),
            finite(self.max_price),
        ) {
            (Some(min), Some(modal), Some(max)) => price_le(min, modal) && price_le(modal, max),
            _ => true,
        }
    }
}

/// One model-generated price forecast for a (market, commodity) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastObservation {
    pub target_date: NaiveDate,
    pub market: String,
    pub commodity: String,
    pub predicted_price: f64,
    pub trend: f64,
    pub yearly_seasonal: Option<f64>,
    pub weekly_seasonal: Option<f64>,
    /// Explicit lower confidence bound, when the upstream model exported one
    pub lower_bound: Option<f64>,
    /// Explicit upper confidence bound, when the upstream model exported one
    pub upper_bound: Option<f64>,
}

impl ForecastObservation {
    /// Create a forecast row with no decomposition or bounds.
    pub fn new(
        market: impl Into<String>,
        commodity: impl Into<String>,
        target_date: NaiveDate,
        predicted_price: f64,
    ) -> Self {
        Self {
            target_date,
            market: market.into(),
            commodity: commodity.into(),
            predicted_price,
            trend: f64::NAN,
            yearly_seasonal: None,
            weekly_seasonal: None,
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// Attach the additive decomposition terms.
    pub fn with_components(mut self, trend: f64, yearly: Option<f64>, weekly: Option<f64>) -> Self {
        self.trend = trend;
        self.yearly_seasonal = yearly.and_then(finite);
        self.weekly_seasonal = weekly.and_then(finite);
        self
    }

    /// Attach explicit confidence bounds.
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = finite(lower);
        self.upper_bound = finite(upper);
        self
    }

    /// Predicted price, `None` when missing.
    pub fn predicted_value(&self) -> Option<f64> {
        finite(self.predicted_price)
    }

    /// Trend component, `None` when missing.
    pub fn trend_value(&self) -> Option<f64> {
        finite(self.trend)
    }
}

/// Inclusive date bounds; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// A range with neither bound set.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Inclusive containment test.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Optional, conjunctive row criteria shared by the analytic queries.
///
/// An empty set means "no constraint", never "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub states: BTreeSet<String>,
    pub markets: BTreeSet<String>,
    pub commodities: BTreeSet<String>,
    pub date_range: DateRange,
}

impl FilterCriteria {
    /// Criteria that match every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_markets<I, S>(mut self, markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markets = markets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_commodities<I, S>(mut self, commodities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commodities = commodities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.date_range = DateRange::new(start, end);
        self
    }

    /// The same criteria with only the date range kept.
    pub fn date_only(&self) -> Self {
        Self {
            date_range: self.date_range,
            ..Self::default()
        }
    }

    /// True when no constraint is set.
    pub fn is_unconstrained(&self) -> bool {
        self.states.is_empty()
            && self.markets.is_empty()
            && self.commodities.is_empty()
            && self.date_range.is_unbounded()
    }
}

/// Coverage report over the arrival dates of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    pub total_records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// max - min in days, plus one; zero for an empty dataset
    pub date_span_days: i64,
    pub unique_days: i64,
    /// unique_days / date_span_days * 100, zero when the span is zero
    pub completeness_pct: f64,
    /// date_span_days - unique_days
    pub missing_days: i64,
}

/// `Some(v)` for finite values, `None` for NaN and infinities.
#[inline]
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}
