//! DailyBar — one trading session for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily bar as published by the exchange, after consolidation.
///
/// Price columns are split-adjusted at load time; `adjustment` records the
/// cumulative multiplier that was divided out (1.0 when no split applies).
/// `pe` is present only when an earnings file exists for the symbol and a
/// report precedes the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub prev_close: f64,
    pub ltp: f64,
    pub vwap: f64,
    pub week52_high: f64,
    pub week52_low: f64,
    pub volume: u64,
    pub turnover_value: f64,
    pub num_trades: u64,
    pub pe: Option<f64>,
    pub adjustment: f64,
}

impl DailyBar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.prev_close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
            && self.prev_close > 0.0
    }

    /// Green candle: the session closed at or above the previous close.
    pub fn is_green(&self) -> bool {
        self.close >= self.prev_close
    }

    /// Intraday range (high - low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Change versus the previous close as a ratio.
    pub fn change(&self) -> f64 {
        self.close / self.prev_close - 1.0
    }

    /// Divide every price column by `multiplier` and scale volume up by it.
    pub(crate) fn apply_split(&mut self, multiplier: f64) {
        self.open /= multiplier;
        self.high /= multiplier;
        self.low /= multiplier;
        self.close /= multiplier;
        self.prev_close /= multiplier;
        self.ltp /= multiplier;
        self.vwap /= multiplier;
        self.week52_high /= multiplier;
        self.week52_low /= multiplier;
        self.volume = (self.volume as f64 * multiplier).round() as u64;
        self.adjustment *= multiplier;
    }
}
