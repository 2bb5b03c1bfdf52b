//! Run-time parameters of the feature engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FeatureConfigError {
    #[error("{field} must list at least one window")]
    Empty { field: &'static str },

    #[error("{field} contains a zero-length window")]
    ZeroWindow { field: &'static str },

    #[error("rank-trend stack #{index} must be strictly ascending")]
    UnsortedStack { index: usize },

    #[error("{field} must be a finite, non-negative percentage")]
    InvalidPercent { field: &'static str },
}

/// Windows, periods and thresholds used by every feature stage.
///
/// Every field has a default so partial TOML tables work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub performance_windows: Vec<usize>,
    pub ma_periods: Vec<usize>,
    pub rank_trend_stacks: Vec<Vec<usize>>,
    pub rolling_return_windows: Vec<usize>,
    /// Period of the moving average whose above/below streak is tracked.
    pub ma_streak_period: usize,
    /// Minimum MA streak length that produces a highlight.
    pub ma_streak_highlight_len: usize,
    /// Trailing rows in which new-high days are counted.
    pub ath_lookback: usize,
    pub ath_near_pct: f64,
    pub ath_deep_pct: f64,
    /// Rank-trend value used when the MA stack is flat.
    pub rank_trend_default: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            performance_windows: vec![5, 15, 50, 200, 1000],
            ma_periods: vec![15, 50, 200],
            rank_trend_stacks: vec![(1..=15).collect(), (1..=20).map(|i| i * 5).collect()],
            rolling_return_windows: vec![200, 1000],
            ma_streak_period: 200,
            ma_streak_highlight_len: 200,
            ath_lookback: 1000,
            ath_near_pct: 2.0,
            ath_deep_pct: 50.0,
            rank_trend_default: 0.0,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), FeatureConfigError> {
        let lists: [(&'static str, &[usize]); 3] = [
            ("performance_windows", &self.performance_windows),
            ("ma_periods", &self.ma_periods),
            ("rolling_return_windows", &self.rolling_return_windows),
        ];
        for (field, windows) in lists {
            if windows.contains(&0) {
                return Err(FeatureConfigError::ZeroWindow { field });
            }
        }
        if self.performance_windows.is_empty() {
            return Err(FeatureConfigError::Empty {
                field: "performance_windows",
            });
        }
        for (index, stack) in self.rank_trend_stacks.iter().enumerate() {
            if stack.is_empty() {
                return Err(FeatureConfigError::Empty {
                    field: "rank_trend_stacks",
                });
            }
            if stack.contains(&0) {
                return Err(FeatureConfigError::ZeroWindow {
                    field: "rank_trend_stacks",
                });
            }
            if stack.windows(2).any(|w| w[0] >= w[1]) {
                return Err(FeatureConfigError::UnsortedStack { index });
            }
        }
        if self.ma_streak_period == 0 {
            return Err(FeatureConfigError::ZeroWindow {
                field: "ma_streak_period",
            });
        }
        if self.ath_lookback == 0 {
            return Err(FeatureConfigError::ZeroWindow {
                field: "ath_lookback",
            });
        }
        for (field, pct) in [
            ("ath_near_pct", self.ath_near_pct),
            ("ath_deep_pct", self.ath_deep_pct),
        ] {
            if !pct.is_finite() || pct < 0.0 {
                return Err(FeatureConfigError::InvalidPercent { field });
            }
        }
        Ok(())
    }
}
