//! Shared helpers for unit tests.

use chrono::NaiveDate;

use crate::domain::{DailyBar, StockSeries};

/// Create synthetic bars from close prices.
///
/// prev_close = previous close (the first bar uses its own close),
/// open = prev_close, high/low = max/min(open, close) ± 1.0, volume = 1000,
/// one calendar day apart starting 2024-01-01.
pub fn make_bars(closes: &[f64]) -> Vec<DailyBar> {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let prev_close = if i == 0 { close } else { closes[i - 1] };
            let open = prev_close;
            DailyBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                prev_close,
                ltp: close,
                vwap: (open + close) / 2.0,
                week52_high: close,
                week52_low: close,
                volume: 1000,
                turnover_value: close * 1000.0,
                num_trades: 100,
                pe: None,
                adjustment: 1.0,
            }
        })
        .collect()
}

pub fn make_series(closes: &[f64]) -> StockSeries {
    StockSeries::new("TEST", make_bars(closes), false).unwrap()
}

/// Assert two f64 values are approximately equal (within epsilon).
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for numeric tests.
pub const DEFAULT_EPSILON: f64 = 1e-10;
