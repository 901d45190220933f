//! Filter pipeline shared by the analytic queries.
//!
//! Features:
//! - Set-membership filters on state, market and commodity
//! - Inclusive, optionally open-ended date range filter
//! - Steps are independent and conjunctive, so any order gives the same rows
//!
//! The pipeline never mutates its input table.

use std::collections::BTreeSet;

use crate::table::{MarketRow, Table};
use crate::types::{DateRange, FilterCriteria};

/// One constituent filter of a [`FilterCriteria`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStep {
    States(BTreeSet<String>),
    Markets(BTreeSet<String>),
    Commodities(BTreeSet<String>),
    Dates(DateRange),
}

impl FilterStep {
    /// True when this step does not constrain anything.
    pub fn is_noop(&self) -> bool {
        match self {
            FilterStep::States(set) | FilterStep::Markets(set) | FilterStep::Commodities(set) => {
                set.is_empty()
            }
            FilterStep::Dates(range) => range.is_unbounded(),
        }
    }

    /// Row predicate for this step.
    ///
    /// A non-empty state set excludes rows that carry no state (forecasts).
    pub fn matches<R: MarketRow>(&self, row: &R) -> bool {
        match self {
            FilterStep::States(set) => {
                set.is_empty() || row.state().is_some_and(|s| set.contains(s))
            }
            FilterStep::Markets(set) => set.is_empty() || set.contains(row.market()),
            FilterStep::Commodities(set) => set.is_empty() || set.contains(row.commodity()),
            FilterStep::Dates(range) => range.contains(row.date()),
        }
    }

    /// Apply this single step.
    pub fn apply<R: MarketRow>(&self, table: &Table<R>) -> Table<R> {
        if self.is_noop() {
            return table.clone();
        }
        table.filter(|row| self.matches(row))
    }
}

impl FilterCriteria {
    /// Split the criteria into its constituent steps.
    pub fn steps(&self) -> Vec<FilterStep> {
        vec![
            FilterStep::States(self.states.clone()),
            FilterStep::Markets(self.markets.clone()),
            FilterStep::Commodities(self.commodities.clone()),
            FilterStep::Dates(self.date_range),
        ]
    }

    /// Single-row predicate equivalent to applying every step.
    ///
    /// A non-empty state set excludes rows that carry no state (forecasts).
    pub fn matches<R: MarketRow>(&self, row: &R) -> bool {
        (self.states.is_empty() || row.state().is_some_and(|s| self.states.contains(s)))
            && (self.markets.is_empty() || self.markets.contains(row.market()))
            && (self.commodities.is_empty() || self.commodities.contains(row.commodity()))
            && self.date_range.contains(row.date())
    }
}

/// Apply `criteria` to `table`, returning the matching rows as a new table.
///
/// Unconstrained criteria return a table value-equal to the input.
pub fn apply<R: MarketRow>(table: &Table<R>, criteria: &FilterCriteria) -> Table<R> {
    if criteria.is_unconstrained() {
        return table.clone();
    }
    table.filter(|row| criteria.matches(row))
}

/// Apply the given steps in order.
pub fn apply_steps<R: MarketRow>(table: &Table<R>, steps: &[FilterStep]) -> Table<R> {
    let active: Vec<&FilterStep> = steps.iter().filter(|s| !s.is_noop()).collect();
    if active.is_empty() {
        return table.clone();
    }
    table.filter(|row| active.iter().all(|step| step.matches(row)))
}
