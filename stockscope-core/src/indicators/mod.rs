//! Indicator implementations over a daily bar series.
//!
//! Indicators are pure functions: bar history in, numeric series of the same
//! length out. Unlike a warmup-style indicator, every value here is defined
//! from the first bar onward: rolling windows shrink to the available history
//! (`min_periods = 1`).

pub mod rank;
pub mod rank_trend;
pub mod sma;
pub mod stats;

pub use rank::{average_ranks, spearman};
pub use rank_trend::{spearman_over_ma, RankTrend, TrendStrength};
pub use sma::{rolling_mean, Sma};
pub use stats::{mean, median, pearson};

use crate::domain::DailyBar;

/// Trait for indicators.
///
/// # Look-ahead guard
/// No value at bar t may depend on bars after t. Every implementation is
/// tested by comparing a truncated series against the full series.
pub trait Indicator: Send + Sync {
    /// Column name (e.g. "ma_200", "rank_trend_1_15").
    fn name(&self) -> &str;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[DailyBar]) -> Vec<f64>;
}
