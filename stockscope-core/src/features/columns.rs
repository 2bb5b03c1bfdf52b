//! Derived per-row columns produced by the feature engine.
//!
//! Every column has exactly one value per bar of the series it was built
//! from; row `i` always refers to `series.bars()[i]`.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::historical_hits::HistoricalHit;
use super::streak::StreakState;

/// Named numeric columns that remember their insertion order.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column. Re-inserting a name replaces its values in place.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&idx) => self.values[idx] = values,
            None => {
                self.index.insert(name.clone(), self.names.len());
                self.names.push(name);
                self.values.push(values);
            }
        }
    }

    pub fn get(&self, name: &str, row: usize) -> Option<f64> {
        self.get_series(name).and_then(|v| v.get(row).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&idx| self.values[idx].as_slice())
    }

    pub fn last(&self, name: &str) -> Option<f64> {
        self.get_series(name).and_then(|v| v.last().copied())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(name, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Candle classification for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleRow {
    pub is_green: bool,
    pub streak: StreakState,
}

/// Everything the engine derives per row, aligned with the series dates.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub dates: Vec<NaiveDate>,
    pub candles: Vec<CandleRow>,
    /// Above/below streak against the tracked moving average.
    pub ma_streak: Vec<StreakState>,
    pub hits: Vec<HistoricalHit>,
    pub columns: ColumnSet,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut cols = ColumnSet::new();
        cols.insert("ma_50", vec![1.0, 2.0]);
        cols.insert("ath", vec![3.0, 4.0]);
        cols.insert("range", vec![5.0, 6.0]);
        assert_eq!(cols.names(), &["ma_50", "ath", "range"]);
        assert_eq!(cols.get("ath", 1), Some(4.0));
        assert_eq!(cols.last("range"), Some(6.0));
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut cols = ColumnSet::new();
        cols.insert("a", vec![1.0]);
        cols.insert("b", vec![2.0]);
        cols.insert("a", vec![9.0]);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols.names()[0], "a");
        assert_eq!(cols.get("a", 0), Some(9.0));
    }

    #[test]
    fn missing_name_or_row() {
        let mut cols = ColumnSet::new();
        cols.insert("a", vec![1.0]);
        assert_eq!(cols.get("a", 1), None);
        assert_eq!(cols.get("zzz", 0), None);
    }
}
