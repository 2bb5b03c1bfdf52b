//! Rank-trend: Spearman correlation over a stack of moving averages.
//!
//! At every bar the moving averages for an ascending list of windows are
//! ranked against the window order. The result is negated so that a
//! positive value means short averages sit above long ones (a rising,
//! accelerating trend) and a negative value means the reverse.

use serde::{Deserialize, Serialize};

use super::rank::spearman;
use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::DailyBar;

/// Bucket boundaries used by consumers: `[-1, -0.3, 0.3, 1]`.
pub const TREND_STRENGTH_THRESHOLDS: [f64; 4] = [-1.0, -0.3, 0.3, 1.0];

/// Rank-trend over closing prices for one window stack.
#[derive(Debug, Clone)]
pub struct RankTrend {
    windows: Vec<usize>,
    default: f64,
    name: String,
}

impl RankTrend {
    pub fn new(windows: Vec<usize>, default: f64) -> Self {
        assert!(!windows.is_empty(), "rank-trend needs at least one window");
        assert!(
            windows.windows(2).all(|w| w[0] < w[1]) && windows[0] >= 1,
            "rank-trend windows must be strictly ascending and >= 1"
        );
        let name = column_name(&windows);
        Self {
            windows,
            default,
            name,
        }
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    /// Compute the series and the number of bars that fell back to the default.
    pub fn compute_counted(&self, bars: &[DailyBar]) -> (Vec<f64>, usize) {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rank_trend_counted(&closes, &self.windows, self.default)
    }
}

impl Indicator for RankTrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[DailyBar]) -> Vec<f64> {
        self.compute_counted(bars).0
    }
}

/// Column name for a window stack: `rank_trend_{first}_{last}`.
pub fn column_name(windows: &[usize]) -> String {
    match (windows.first(), windows.last()) {
        (Some(first), Some(last)) => format!("rank_trend_{first}_{last}"),
        _ => "rank_trend".to_string(),
    }
}

/// Negated Spearman correlation between the moving-average stack and the
/// window order, per bar. Bars whose MA stack is constant (correlation
/// undefined) receive `default`.
pub fn spearman_over_ma(values: &[f64], windows: &[usize], default: f64) -> Vec<f64> {
    rank_trend_counted(values, windows, default).0
}

fn rank_trend_counted(values: &[f64], windows: &[usize], default: f64) -> (Vec<f64>, usize) {
    let order: Vec<f64> = windows.iter().map(|&w| w as f64).collect();
    let averages: Vec<Vec<f64>> = windows.iter().map(|&w| rolling_mean(values, w)).collect();

    let mut result = Vec::with_capacity(values.len());
    let mut degenerate = 0;
    let mut stack = vec![0.0; windows.len()];

    for i in 0..values.len() {
        for (slot, ma) in stack.iter_mut().zip(&averages) {
            *slot = ma[i];
        }
        match spearman(&stack, &order) {
            Some(rho) => result.push(-rho),
            None => {
                degenerate += 1;
                result.push(default);
            }
        }
    }

    (result, degenerate)
}

/// Qualitative bucket for a rank-trend value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStrength {
    Weak,
    Neutral,
    Strong,
}

impl TrendStrength {
    pub fn from_rho(rho: f64) -> Self {
        if rho < TREND_STRENGTH_THRESHOLDS[1] {
            TrendStrength::Weak
        } else if rho > TREND_STRENGTH_THRESHOLDS[2] {
            TrendStrength::Strong
        } else {
            TrendStrength::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendStrength::Weak => "Weak",
            TrendStrength::Neutral => "Neutral",
            TrendStrength::Strong => "Strong",
        }
    }
}
