//! Trailing-window performance summaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::StockSeries;
use crate::indicators::{mean, median};

/// Performance over the most recent `period_size` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub requested_window: usize,
    /// Rows actually used: `min(requested_window, len)`.
    pub period_size: usize,
    pub start_date: NaiveDate,
    /// `close[last] / prev_close[first] - 1`.
    pub net_return: f64,
    /// Geometric mean daily return.
    pub avg_daily_return: f64,
    pub median_close: f64,
    pub lowest_close: f64,
    pub highest_close: f64,
    pub mean_turnover_value: f64,
    /// Median of the available PE values; 0 when there are none.
    pub median_pe: f64,
}

impl PerformanceReport {
    /// True when the series was long enough for the requested window.
    pub fn is_full_window(&self) -> bool {
        self.period_size == self.requested_window
    }
}

pub fn performance_report(series: &StockSeries, window: usize) -> PerformanceReport {
    let bars = series.bars();
    let period_size = window.min(bars.len()).max(1);
    if period_size < window {
        debug!(
            symbol = series.symbol(),
            window,
            period_size,
            "insufficient history, using all available rows"
        );
    }
    let slice = &bars[bars.len() - period_size..];
    let first = &slice[0];
    let last = &slice[slice.len() - 1];

    let closes: Vec<f64> = slice.iter().map(|b| b.close).collect();
    let turnover: Vec<f64> = slice.iter().map(|b| b.turnover_value).collect();
    let pes: Vec<f64> = if series.has_pe() {
        slice.iter().filter_map(|b| b.pe).collect()
    } else {
        Vec::new()
    };

    let net_return = last.close / first.prev_close - 1.0;
    PerformanceReport {
        requested_window: window,
        period_size,
        start_date: first.date,
        net_return,
        avg_daily_return: (1.0 + net_return).powf(1.0 / period_size as f64) - 1.0,
        median_close: median(&closes).unwrap_or(f64::NAN),
        lowest_close: closes.iter().copied().fold(f64::INFINITY, f64::min),
        highest_close: closes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean_turnover_value: mean(&turnover).unwrap_or(0.0),
        median_pe: median(&pes).unwrap_or(0.0),
    }
}

pub fn performance_reports(series: &StockSeries, windows: &[usize]) -> Vec<PerformanceReport> {
    windows
        .iter()
        .map(|&w| performance_report(series, w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_approx, make_bars, make_series, DEFAULT_EPSILON};

    #[test]
    fn short_series_uses_all_rows() {
        let series = make_series(&[100.0, 110.0, 121.0]);
        let report = performance_report(&series, 200);
        assert_eq!(report.period_size, 3);
        assert!(!report.is_full_window());
        assert_eq!(report.start_date, series.first().date);
        // First bar's prev_close equals its own close.
        assert_approx(report.net_return, 0.21, DEFAULT_EPSILON);
        assert_approx(
            report.avg_daily_return,
            1.21f64.powf(1.0 / 3.0) - 1.0,
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn trailing_window_uses_prev_close_of_first_row() {
        let series = make_series(&[50.0, 100.0, 110.0, 99.0]);
        let report = performance_report(&series, 2);
        assert_eq!(report.period_size, 2);
        // 99 / prev_close(110.0 row) = 99 / 100
        assert_approx(report.net_return, -0.01, DEFAULT_EPSILON);
        assert_eq!(report.lowest_close, 99.0);
        assert_eq!(report.highest_close, 110.0);
        assert_eq!(report.median_close, 104.5);
    }

    #[test]
    fn median_pe_zero_without_pe() {
        let series = make_series(&[1.0, 2.0, 3.0]);
        assert_eq!(performance_report(&series, 5).median_pe, 0.0);

        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[1].pe = Some(10.0);
        bars[2].pe = Some(14.0);
        let series = StockSeries::new("PE", bars, true).unwrap();
        assert_eq!(performance_report(&series, 5).median_pe, 12.0);
    }

    #[test]
    fn one_report_per_window() {
        let series = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let reports = performance_reports(&series, &[1, 2, 1000]);
        let sizes: Vec<usize> = reports.iter().map(|r| r.period_size).collect();
        assert_eq!(sizes, vec![1, 2, 4]);
    }
}
