//! Simple Moving Average with a shrinking warmup window.
//!
//! `ma[i]` is the mean of the trailing `min(period, i + 1)` closes, so the
//! first value equals the first close and no NaN warmup is produced.

use super::Indicator;
use crate::domain::DailyBar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("ma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[DailyBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rolling_mean(&closes, self.period)
    }
}

/// Trailing mean over `min(period, i + 1)` values.
///
/// Uses a running sum, except when every value in the window is equal: the
/// value itself is emitted so flat windows never pick up summation error.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut equal_run = 0usize;

    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        equal_run = if i > 0 && values[i - 1] == v {
            equal_run + 1
        } else {
            1
        };
        let count = (i + 1).min(period);
        if equal_run >= count {
            result.push(v);
        } else {
            result.push(sum / count as f64);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = Sma::new(5).compute(&bars);

        assert_eq!(result.len(), 7);
        // Shrinking window during warmup
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 10.5, DEFAULT_EPSILON);
        assert_approx(result[3], 11.5, DEFAULT_EPSILON);
        // mean(10,11,12,13,14)
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        let result = Sma::new(1).compute(&bars);
        assert_eq!(result, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn period_longer_than_history_is_expanding_mean() {
        let result = rolling_mean(&[2.0, 4.0, 6.0], 200);
        assert_approx(result[2], 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_has_no_lookahead() {
        let closes = [5.0, 7.0, 3.0, 9.0, 11.0, 4.0, 6.0];
        let full = rolling_mean(&closes, 3);
        let truncated = rolling_mean(&closes[..4], 3);
        assert_eq!(&full[..4], truncated.as_slice());
    }

    #[test]
    fn flat_decimal_window_is_exact() {
        let mut closes = vec![0.3, 0.7];
        closes.extend([101.35; 40]);
        let result = rolling_mean(&closes, 15);
        // Once the window holds only 101.35, the mean is exactly 101.35.
        for &v in &result[16..] {
            assert_eq!(v, 101.35);
        }
        assert!(rolling_mean(&[0.1; 30], 7).iter().all(|&v| v == 0.1));
    }

    #[test]
    fn sma_name() {
        assert_eq!(Sma::new(200).name(), "ma_200");
    }
}
