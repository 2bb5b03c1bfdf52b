//! Moving-average columns and the above/below-MA streak.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::columns::ColumnSet;
use super::streak::{streak_states, StreakState};
use crate::domain::DailyBar;
use crate::indicators::{Indicator, Sma};

/// Current position relative to the tracked moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaStreakSummary {
    pub period: usize,
    pub above: bool,
    pub length: usize,
    pub start_date: NaiveDate,
    /// `close[last] / prev_close[streak start] - 1`.
    pub net_return: f64,
}

pub fn pct_column_name(period: usize) -> String {
    format!("ma_{period}_pct")
}

/// `(close - ma) / ma * 100` per row.
pub fn pct_from_ma(bars: &[DailyBar], ma: &[f64]) -> Vec<f64> {
    bars.iter()
        .zip(ma)
        .map(|(bar, &m)| (bar.close - m) / m * 100.0)
        .collect()
}

/// Insert `ma_{p}` and `ma_{p}_pct` for each indicator.
pub fn insert_ma_columns(bars: &[DailyBar], smas: &[Sma], columns: &mut ColumnSet) {
    for sma in smas {
        let ma = sma.compute(bars);
        let pct = pct_from_ma(bars, &ma);
        columns.insert(sma.name(), ma);
        columns.insert(pct_column_name(sma.period()), pct);
    }
}

/// Per-row streak of `close >= ma`, plus a summary of the current run.
pub fn ma_streak(bars: &[DailyBar], sma: &Sma) -> (Vec<StreakState>, MaStreakSummary) {
    let ma = sma.compute(bars);
    let flags: Vec<bool> = bars.iter().zip(&ma).map(|(b, &m)| b.close >= m).collect();
    let states = streak_states(&flags);

    let last = states.len() - 1;
    let current = states[last];
    let start = last + 1 - current.length;
    let summary = MaStreakSummary {
        period: sma.period(),
        above: current.flag,
        length: current.length,
        start_date: bars[start].date,
        net_return: bars[last].close / bars[start].prev_close - 1.0,
    };
    (states, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn columns_are_named_and_aligned() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let mut columns = ColumnSet::new();
        insert_ma_columns(&bars, &[Sma::new(2)], &mut columns);

        assert_eq!(columns.names(), &["ma_2", "ma_2_pct"]);
        assert_eq!(columns.get_series("ma_2").unwrap(), &[10.0, 15.0, 25.0]);
        assert_approx(columns.get("ma_2_pct", 2).unwrap(), 20.0, DEFAULT_EPSILON);
        assert_eq!(columns.get("ma_2_pct", 0), Some(0.0));
    }

    #[test]
    fn streak_above_rising_average() {
        let bars = make_bars(&[10.0, 9.0, 11.0, 12.0, 13.0]);
        let (states, summary) = ma_streak(&bars, &Sma::new(3));
        // ma3: 10, 9.5, 10, 10.667, 12 -> above: T, F, T, T, T
        let flags: Vec<bool> = states.iter().map(|s| s.flag).collect();
        assert_eq!(flags, vec![true, false, true, true, true]);
        assert!(summary.above);
        assert_eq!(summary.length, 3);
        assert_eq!(summary.start_date, bars[2].date);
        // 13 / prev_close of row 2 (9.0) - 1
        assert_approx(summary.net_return, 13.0 / 9.0 - 1.0, DEFAULT_EPSILON);
    }
}
