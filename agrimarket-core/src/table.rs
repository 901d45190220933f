//! Typed, immutable row table.
//!
//! `Table<R>` holds its rows behind an `Arc` so snapshots and query results
//! can share storage. Every primitive returns a new value; nothing is
//! written back into the rows a table was built from.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::types::{ForecastObservation, HistoricalObservation};

/// Uniform view over the two observation types.
pub trait MarketRow: Clone + Send + Sync {
    fn market(&self) -> &str;
    fn commodity(&self) -> &str;
    /// State is only recorded for historical observations.
    fn state(&self) -> Option<&str>;
    /// Arrival date or forecast target date.
    fn date(&self) -> NaiveDate;
    /// Modal or predicted price; may be NaN when missing.
    fn price(&self) -> f64;
}

impl MarketRow for HistoricalObservation {
    fn market(&self) -> &str {
        &self.market
    }

    fn commodity(&self) -> &str {
        &self.commodity
    }

    fn state(&self) -> Option<&str> {
        Some(&self.state)
    }

    fn date(&self) -> NaiveDate {
        self.arrival_date
    }

    fn price(&self) -> f64 {
        self.modal_price
    }
}

impl MarketRow for ForecastObservation {
    fn market(&self) -> &str {
        &self.market
    }

    fn commodity(&self) -> &str {
        &self.commodity
    }

    fn state(&self) -> Option<&str> {
        None
    }

    fn date(&self) -> NaiveDate {
        self.target_date
    }

    fn price(&self) -> f64 {
        self.predicted_price
    }
}

/// Rows sharing one group key, in dataset order.
#[derive(Debug)]
pub struct Group<'a, K, R> {
    pub key: K,
    pub rows: Vec<&'a R>,
}

impl<K, R: MarketRow> Group<'_, K, R> {
    /// Prices of the group's rows, including missing ones.
    pub fn prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price()).collect()
    }
}

/// Immutable collection of typed rows.
#[derive(Debug)]
pub struct Table<R> {
    rows: Arc<[R]>,
}

impl<R> Clone for Table<R> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: Arc::from(Vec::new()),
        }
    }
}

impl<R: PartialEq> PartialEq for Table<R> {
    fn eq(&self, other: &Self) -> bool {
        self.rows[..] == other.rows[..]
    }
}

impl<R> From<Vec<R>> for Table<R> {
    fn from(rows: Vec<R>) -> Self {
        Self {
            rows: Arc::from(rows),
        }
    }
}

impl<R> FromIterator<R> for Table<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<R>>())
    }
}

impl<R> Table<R> {
    /// A table with no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// True when both tables share the same row storage.
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }

    /// Group rows by key; groups and their rows keep first-seen order.
    pub fn group_by<K, F>(&self, key: F) -> Vec<Group<'_, K, R>>
    where
        K: Eq + Hash + Clone,
        F: Fn(&R) -> K,
    {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut groups: Vec<Group<'_, K, R>> = Vec::new();

        for row in self.rows.iter() {
            let k = key(row);
            match index.get(&k) {
                Some(&i) => groups[i].rows.push(row),
                None => {
                    index.insert(k.clone(), groups.len());
                    groups.push(Group {
                        key: k,
                        rows: vec![row],
                    });
                }
            }
        }

        groups
    }

    /// Distinct keys in first-seen order.
    pub fn distinct<K, F>(&self, key: F) -> Vec<K>
    where
        K: Eq + Hash + Clone,
        F: Fn(&R) -> K,
    {
        self.group_by(key).into_iter().map(|g| g.key).collect()
    }
}

impl<R: Clone> Table<R> {
    /// Rows matching the predicate, as a new table.
    pub fn filter<F>(&self, predicate: F) -> Table<R>
    where
        F: Fn(&R) -> bool,
    {
        self.rows.iter().filter(|r| predicate(*r)).cloned().collect()
    }

    /// Stable sort by key, as a new table.
    pub fn sorted_by_key<K, F>(&self, key: F) -> Table<R>
    where
        K: Ord,
        F: Fn(&R) -> K,
    {
        let mut rows = self.rows.to_vec();
        rows.sort_by_key(key);
        Table::from(rows)
    }
}

impl<R: MarketRow> Table<R> {
    /// Rows for one (market, commodity) pair, sorted by date.
    ///
    /// Rows on the same date keep dataset order.
    pub fn series(&self, market: &str, commodity: &str) -> Table<R> {
        self.filter(|r| r.market() == market && r.commodity() == commodity)
            .sorted_by_key(|r| r.date())
    }

    /// Earliest and latest date, `None` for an empty table.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.rows.iter().map(|r| r.date());
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Sorted distinct non-empty markets.
    pub fn markets(&self) -> Vec<String> {
        sorted_distinct(self.rows.iter().map(|r| r.market()))
    }

    /// Sorted distinct non-empty commodities.
    pub fn commodities(&self) -> Vec<String> {
        sorted_distinct(self.rows.iter().map(|r| r.commodity()))
    }

    /// Sorted distinct non-empty states.
    pub fn states(&self) -> Vec<String> {
        sorted_distinct(self.rows.iter().filter_map(|r| r.state()))
    }
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> Table<HistoricalObservation> {
        Table::from(vec![
            HistoricalObservation::new("B", "Onion", d(2023, 1, 3), 30.0),
            HistoricalObservation::new("A", "Rice", d(2023, 1, 1), 100.0),
            HistoricalObservation::new("B", "Rice", d(2023, 1, 2), 110.0),
            HistoricalObservation::new("A", "Onion", d(2023, 1, 1), 25.0),
        ])
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let table = sample();
        let groups = table.group_by(|r| r.commodity.clone());
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Onion", "Rice"]);
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[0].rows[0].market, "B");
        assert_eq!(groups[0].rows[1].market, "A");
    }

    #[test]
    fn test_filter_returns_new_table() {
        let table = sample();
        let rice = table.filter(|r| r.commodity == "Rice");
        assert_eq!(rice.len(), 2);
        assert_eq!(table.len(), 4);
        assert!(!rice.shares_storage(&table));
    }

    #[test]
    fn test_clone_shares_storage() {
        let table = sample();
        let copy = table.clone();
        assert!(copy.shares_storage(&table));
        assert_eq!(copy, table);
    }

    #[test]
    fn test_series_sorted_by_date() {
        let table = Table::from(vec![
            HistoricalObservation::new("X", "Rice", d(2023, 1, 5), 120.0),
            HistoricalObservation::new("Y", "Rice", d(2023, 1, 2), 1.0),
            HistoricalObservation::new("X", "Rice", d(2023, 1, 1), 100.0),
        ]);
        let series = table.series("X", "Rice");
        let dates: Vec<NaiveDate> = series.iter().map(|r| r.arrival_date).collect();
        assert_eq!(dates, vec![d(2023, 1, 1), d(2023, 1, 5)]);
        assert_eq!(series.date_bounds(), Some((d(2023, 1, 1), d(2023, 1, 5))));
    }

    #[test]
    fn test_date_bounds_empty() {
        let table: Table<HistoricalObservation> = Table::empty();
        assert_eq!(table.date_bounds(), None);
    }

    #[test]
    fn test_sorted_distinct_listings() {
        let table = Table::from(vec![
            HistoricalObservation::new("B", "Rice", d(2023, 1, 1), 1.0).with_location("Kerala", ""),
            HistoricalObservation::new("A", "Rice", d(2023, 1, 1), 1.0).with_location("", ""),
            HistoricalObservation::new("A", "Wheat", d(2023, 1, 1), 1.0).with_location("Assam", ""),
        ]);
        assert_eq!(table.markets(), vec!["A", "B"]);
        assert_eq!(table.commodities(), vec!["Rice", "Wheat"]);
        assert_eq!(table.states(), vec!["Assam", "Kerala"]);
    }
}
