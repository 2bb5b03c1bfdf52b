//! Multi-symbol time alignment for closing prices.
//!
//! The common axis is the union of every symbol's dates. Missing closes stay
//! absent (`None`); nothing is forward-filled.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

/// Closing prices for several symbols on a common date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCloses {
    /// Sorted ascending.
    pub dates: Vec<NaiveDate>,
    /// Symbols in ascending order.
    pub symbols: Vec<String>,
    /// `closes[s][row]`, same order as `symbols`; each inner Vec has
    /// `dates.len()` entries.
    pub closes: Vec<Vec<Option<f64>>>,
}

impl AlignedCloses {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Keep only the most recent `max_rows` rows.
    pub fn tail(mut self, max_rows: usize) -> Self {
        let skip = self.dates.len().saturating_sub(max_rows);
        if skip > 0 {
            self.dates.drain(..skip);
            for column in &mut self.closes {
                column.drain(..skip);
            }
        }
        self
    }
}

/// Outer-join `(date, close)` series on date.
///
/// If a symbol repeats a date, the last value wins.
pub fn align_closes(series: &BTreeMap<String, Vec<(NaiveDate, f64)>>) -> AlignedCloses {
    let dates: Vec<NaiveDate> = series
        .values()
        .flat_map(|points| points.iter().map(|(d, _)| *d))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let row_of: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut symbols = Vec::with_capacity(series.len());
    let mut closes = Vec::with_capacity(series.len());
    for (symbol, points) in series {
        let mut column = vec![None; dates.len()];
        for (date, close) in points {
            column[row_of[date]] = Some(*close);
        }
        symbols.push(symbol.clone());
        closes.push(column);
    }

    AlignedCloses {
        dates,
        symbols,
        closes,
    }
}
