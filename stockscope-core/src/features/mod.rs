//! Feature engine — derives every per-symbol statistic from a `StockSeries`.
//!
//! Stages run in a fixed order:
//!
//! 1. Performance windows
//! 2. Moving averages and the above/below-MA streak
//! 3. Rolling returns
//! 4. Historical hit lookup
//! 5. Daily candles and candle streaks
//! 6. Rank-trend columns
//! 7. All-time-high tracking

pub mod ath;
pub mod candles;
pub mod columns;
pub mod config;
pub mod historical_hits;
pub mod moving_average;
pub mod performance;
pub mod rolling_returns;
pub mod streak;

pub use ath::AthSummary;
pub use candles::{CandleMix, CandleSummary, LongestStreak};
pub use columns::{CandleRow, ColumnSet, FeatureTable};
pub use config::{FeatureConfig, FeatureConfigError};
pub use historical_hits::HistoricalHit;
pub use moving_average::MaStreakSummary;
pub use performance::PerformanceReport;
pub use streak::StreakState;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{StockSeries, StockSummary};
use crate::indicators::{Indicator, RankTrend, Sma, TrendStrength};

/// Last value of one rank-trend column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTrendReading {
    pub name: String,
    pub first_window: usize,
    pub last_window: usize,
    pub value: f64,
    pub strength: TrendStrength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightKind {
    MaStreak,
    NearAllTimeHigh,
    DeepDrawdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub kind: HighlightKind,
    pub message: String,
}

/// Scalars read off the last row of the derived table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMetrics {
    pub candles: CandleSummary,
    pub last_hit: HistoricalHit,
    /// `(period, value)` for each configured MA period.
    pub ma_values: Vec<(usize, f64)>,
    pub ma_streak: MaStreakSummary,
    pub rank_trends: Vec<RankTrendReading>,
    pub ath: AthSummary,
}

/// Complete output of one engine run for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub summary: StockSummary,
    pub performance: Vec<PerformanceReport>,
    #[serde(skip)]
    pub table: FeatureTable,
    pub metrics: StockMetrics,
    pub highlights: Vec<Highlight>,
}

impl StockAnalysis {
    pub fn symbol(&self) -> &str {
        &self.summary.symbol
    }

    /// Report for a requested window, if configured.
    pub fn performance_for(&self, window: usize) -> Option<&PerformanceReport> {
        self.performance
            .iter()
            .find(|r| r.requested_window == window)
    }
}

/// Runs the feature stages with a fixed configuration.
pub struct FeatureEngine {
    config: FeatureConfig,
    ma_indicators: Vec<Sma>,
    streak_ma: Sma,
    rank_trends: Vec<RankTrend>,
}

impl FeatureEngine {
    pub fn new(config: FeatureConfig) -> Result<Self, FeatureConfigError> {
        config.validate()?;
        let ma_indicators = config.ma_periods.iter().map(|&p| Sma::new(p)).collect();
        let streak_ma = Sma::new(config.ma_streak_period);
        let rank_trends = config
            .rank_trend_stacks
            .iter()
            .map(|stack| RankTrend::new(stack.clone(), config.rank_trend_default))
            .collect();
        Ok(Self {
            config,
            ma_indicators,
            streak_ma,
            rank_trends,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn analyze(&self, series: &StockSeries) -> StockAnalysis {
        let symbol = series.symbol();
        let bars = series.bars();
        let last = bars.len() - 1;
        let mut columns = ColumnSet::new();
        let mut highlights = Vec::new();

        let performance =
            performance::performance_reports(series, &self.config.performance_windows);

        moving_average::insert_ma_columns(bars, &self.ma_indicators, &mut columns);
        let ma_values = self
            .ma_indicators
            .iter()
            .filter_map(|sma| columns.last(sma.name()).map(|v| (sma.period(), v)))
            .collect();
        let (ma_streak_rows, ma_streak) = moving_average::ma_streak(bars, &self.streak_ma);
        if ma_streak.length >= self.config.ma_streak_highlight_len {
            highlights.push(ma_streak_highlight(symbol, &ma_streak));
        }

        for &window in &self.config.rolling_return_windows {
            columns.insert(
                rolling_returns::column_name(window),
                rolling_returns::rolling_returns(bars, window),
            );
        }

        let hits = historical_hits::historical_hits(bars);

        columns.insert("range", candles::ranges(bars));
        let (candle_rows, candle_summary) = candles::candles(bars);

        let mut rank_trends = Vec::with_capacity(self.rank_trends.len());
        for rt in &self.rank_trends {
            let (values, degenerate) = rt.compute_counted(bars);
            if degenerate > 0 {
                debug!(
                    symbol,
                    column = rt.name(),
                    rows = degenerate,
                    "flat moving-average stack, default substituted"
                );
            }
            let value = values[last];
            let windows = rt.windows();
            rank_trends.push(RankTrendReading {
                name: rt.name().to_string(),
                first_window: windows[0],
                last_window: windows[windows.len() - 1],
                value,
                strength: TrendStrength::from_rho(value),
            });
            columns.insert(rt.name(), values);
        }

        let ath = ath::ath_series(bars);
        let pct_down = ath::pct_down_from_ath(bars, &ath);
        let ath_summary = ath::ath_summary(bars, &ath, &pct_down, self.config.ath_lookback);
        columns.insert("ath", ath);
        columns.insert("pct_down_from_ath", pct_down);
        if let Some(h) = ath_highlight(symbol, &ath_summary, &self.config) {
            highlights.push(h);
        }

        let metrics = StockMetrics {
            candles: candle_summary,
            last_hit: hits[last],
            ma_values,
            ma_streak,
            rank_trends,
            ath: ath_summary,
        };

        StockAnalysis {
            summary: series.summary(),
            performance,
            table: FeatureTable {
                dates: series.dates(),
                candles: candle_rows,
                ma_streak: ma_streak_rows,
                hits,
                columns,
            },
            metrics,
            highlights,
        }
    }
}

fn ma_streak_highlight(symbol: &str, streak: &MaStreakSummary) -> Highlight {
    let side = if streak.above { "above" } else { "below" };
    Highlight {
        kind: HighlightKind::MaStreak,
        message: format!(
            "{symbol} has closed {side} its {}-day moving average for {} sessions since {}, \
             a return of {:.2}%.",
            streak.period,
            streak.length,
            streak.start_date.format("%B %d, %Y"),
            streak.net_return * 100.0
        ),
    }
}

fn ath_highlight(symbol: &str, ath: &AthSummary, config: &FeatureConfig) -> Option<Highlight> {
    let down = 0.0 - ath.pct_down;
    if down <= config.ath_near_pct {
        Some(Highlight {
            kind: HighlightKind::NearAllTimeHigh,
            message: format!(
                "{symbol} is within {:.2}% of its all-time high of {:.2}.",
                down, ath.ath
            ),
        })
    } else if down > config.ath_deep_pct {
        Some(Highlight {
            kind: HighlightKind::DeepDrawdown,
            message: format!(
                "{symbol} is {:.2}% below its all-time high of {:.2}.",
                down, ath.ath
            ),
        })
    } else {
        None
    }
}
