//! All-time-high tracking and drawdown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::DailyBar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthSummary {
    pub ath: f64,
    /// Current drawdown in percent (<= 0).
    pub pct_down: f64,
    /// Deepest drawdown over the whole history, in percent.
    pub max_drawdown_pct: f64,
    /// New-high days within the trailing `lookback` rows.
    pub new_high_days: usize,
    pub lookback: usize,
    pub last_new_high: NaiveDate,
}

/// Running maximum of closes.
pub fn ath_series(bars: &[DailyBar]) -> Vec<f64> {
    let mut running = f64::NEG_INFINITY;
    bars.iter()
        .map(|b| {
            if b.close > running {
                running = b.close;
            }
            running
        })
        .collect()
}

/// `(close - ath) / ath * 100` per row; exactly 0 on new-high days.
pub fn pct_down_from_ath(bars: &[DailyBar], ath: &[f64]) -> Vec<f64> {
    bars.iter()
        .zip(ath)
        .map(|(b, &a)| (b.close - a) / a * 100.0)
        .collect()
}

pub fn ath_summary(bars: &[DailyBar], ath: &[f64], pct_down: &[f64], lookback: usize) -> AthSummary {
    let n = bars.len();
    let is_new_high = |i: usize| bars[i].close == ath[i];
    let window_start = n.saturating_sub(lookback);
    let new_high_days = (window_start..n).filter(|&i| is_new_high(i)).count();
    // Row 0 is always a new high, so the search cannot fail.
    let last_high = (0..n).rev().find(|&i| is_new_high(i)).unwrap_or(0);

    AthSummary {
        ath: ath[n - 1],
        pct_down: pct_down[n - 1],
        max_drawdown_pct: pct_down.iter().copied().fold(0.0, f64::min),
        new_high_days,
        lookback,
        last_new_high: bars[last_high].date,
    }
}
