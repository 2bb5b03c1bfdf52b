//! StockSeries — the canonical, date-ordered bar sequence for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bar::DailyBar;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("no records loaded for '{symbol}'")]
    EmptySeries { symbol: String },

    #[error("dates for '{symbol}' are not strictly increasing at {date}")]
    Unordered { symbol: String, date: NaiveDate },
}

/// Ordered daily bars for a single symbol.
///
/// Construction guarantees at least one bar and strictly increasing dates,
/// so every downstream stage may index `bars[0]` and `bars[len - 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSeries {
    symbol: String,
    bars: Vec<DailyBar>,
    has_pe: bool,
}

impl StockSeries {
    pub fn new(
        symbol: impl Into<String>,
        bars: Vec<DailyBar>,
        has_pe: bool,
    ) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(SeriesError::EmptySeries { symbol });
        }
        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::Unordered {
                symbol,
                date: pair[1].date,
            });
        }
        Ok(Self {
            symbol,
            bars,
            has_pe,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false: the constructor rejects empty input.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn has_pe(&self) -> bool {
        self.has_pe
    }

    pub fn first(&self) -> &DailyBar {
        &self.bars[0]
    }

    pub fn last(&self) -> &DailyBar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// `(date, close)` pairs, the input shape of the cross-symbol correlator.
    pub fn close_points(&self) -> Vec<(NaiveDate, f64)> {
        self.bars.iter().map(|b| (b.date, b.close)).collect()
    }

    /// Indices where `prev_close` disagrees with the previous bar's close by
    /// more than `tolerance` (relative). Used as a data-quality diagnostic.
    pub fn prev_close_mismatches(&self, tolerance: f64) -> Vec<usize> {
        self.bars
            .windows(2)
            .enumerate()
            .filter(|(_, w)| {
                let expected = w[0].close;
                expected > 0.0 && ((w[1].prev_close - expected) / expected).abs() > tolerance
            })
            .map(|(i, _)| i + 1)
            .collect()
    }

    pub fn summary(&self) -> StockSummary {
        let last = self.last();
        StockSummary {
            symbol: self.symbol.clone(),
            num_records: self.len(),
            start_date: self.first().date,
            end_date: last.date,
            last_close: last.close,
            last_change: last.change(),
            has_pe: self.has_pe,
            last_pe: if self.has_pe { last.pe } else { None },
        }
    }
}

/// Headline facts about a series, shown on the index page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSummary {
    pub symbol: String,
    pub num_records: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub last_close: f64,
    /// Last session's change versus its previous close, as a ratio.
    pub last_change: f64,
    pub has_pe: bool,
    pub last_pe: Option<f64>,
}
