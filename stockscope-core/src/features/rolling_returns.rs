//! Rolling geometric daily returns.

use crate::domain::DailyBar;

fn round5(x: f64) -> f64 {
    (x * 1e5).round() / 1e5
}

/// Column name for a rolling-return window.
pub fn column_name(window: usize) -> String {
    format!("rolling_return_{window}")
}

/// Per row `i`: `start = max(0, i - window + 1)`,
/// `ratio = close[i] / prev_close[start]`, value in percent
/// `round5(ratio^(1/count) - 1) * 100` where `count = i - start + 1`.
pub fn rolling_returns(bars: &[DailyBar], window: usize) -> Vec<f64> {
    let window = window.max(1);
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let start = (i + 1).saturating_sub(window);
            let count = (i - start + 1) as f64;
            let ratio = bar.close / bars[start].prev_close;
            round5(ratio.powf(1.0 / count) - 1.0) * 100.0
        })
        .collect()
}
