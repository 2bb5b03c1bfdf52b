//! Daily candle classification and candle-streak statistics.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::columns::CandleRow;
use super::streak::{
    continuation_probability, length_distribution, longest_run, runs, streak_states,
};
use crate::domain::DailyBar;

/// Longest streak of one candle color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongestStreak {
    pub length: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Green/red counts for one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleMix {
    /// `"2024"` or `"2024-Q1"`.
    pub period: String,
    pub green: usize,
    pub red: usize,
}

impl CandleMix {
    pub fn green_share(&self) -> f64 {
        let total = self.green + self.red;
        if total == 0 {
            0.0
        } else {
            self.green as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSummary {
    pub last_green: bool,
    pub streak_length: usize,
    /// `close[last] / prev_close[streak start] - 1`.
    pub streak_return: f64,
    pub continuation_probability: f64,
    /// Share of all rows with the last candle's color.
    pub overall_share: f64,
    /// Longest streak of the last candle's color.
    pub longest: LongestStreak,
    pub green_distribution: BTreeMap<usize, usize>,
    pub red_distribution: BTreeMap<usize, usize>,
    pub by_year: Vec<CandleMix>,
    pub by_quarter: Vec<CandleMix>,
}

impl CandleSummary {
    pub fn color(&self) -> &'static str {
        if self.last_green {
            "Green"
        } else {
            "Red"
        }
    }
}

/// `high - low` per row.
pub fn ranges(bars: &[DailyBar]) -> Vec<f64> {
    bars.iter().map(DailyBar::range).collect()
}

fn mix_by<K: Ord>(
    bars: &[DailyBar],
    key: impl Fn(NaiveDate) -> K,
    label: impl Fn(&K) -> String,
) -> Vec<CandleMix> {
    let mut buckets: BTreeMap<K, (usize, usize)> = BTreeMap::new();
    for bar in bars {
        let entry = buckets.entry(key(bar.date)).or_insert((0, 0));
        if bar.is_green() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(k, (green, red))| CandleMix {
            period: label(&k),
            green,
            red,
        })
        .collect()
}

pub fn candles(bars: &[DailyBar]) -> (Vec<CandleRow>, CandleSummary) {
    let flags: Vec<bool> = bars.iter().map(DailyBar::is_green).collect();
    let rows: Vec<CandleRow> = flags
        .iter()
        .zip(streak_states(&flags))
        .map(|(&is_green, streak)| CandleRow { is_green, streak })
        .collect();

    let all_runs = runs(&flags);
    let last = bars.len() - 1;
    let last_green = flags[last];
    let current = all_runs[all_runs.len() - 1];
    let longest = longest_run(&all_runs, last_green).unwrap_or(current);
    let same_color = flags.iter().filter(|&&f| f == last_green).count();

    let summary = CandleSummary {
        last_green,
        streak_length: current.len(),
        streak_return: bars[last].close / bars[current.start].prev_close - 1.0,
        continuation_probability: continuation_probability(&all_runs),
        overall_share: same_color as f64 / bars.len() as f64,
        longest: LongestStreak {
            length: longest.len(),
            start: bars[longest.start].date,
            end: bars[longest.end].date,
        },
        green_distribution: length_distribution(&all_runs, true),
        red_distribution: length_distribution(&all_runs, false),
        by_year: mix_by(bars, |d| d.year(), |y| y.to_string()),
        by_quarter: mix_by(
            bars,
            |d| (d.year(), d.month0() / 3 + 1),
            |(y, q)| format!("{y}-Q{q}"),
        ),
    };
    (rows, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_approx, make_bars, DEFAULT_EPSILON};

    // Colors (close >= prev_close; first bar is green):
    // G G R G G G R R
    const CLOSES: [f64; 8] = [10.0, 11.0, 10.0, 10.5, 11.0, 12.0, 11.0, 10.0];

    #[test]
    fn red_streak_at_the_end() {
        let bars = make_bars(&CLOSES);
        let (rows, summary) = candles(&bars);

        assert_eq!(rows[7].streak.length, 2);
        assert_eq!(rows[7].streak.index, 4);
        assert!(!summary.last_green);
        assert_eq!(summary.color(), "Red");
        assert_eq!(summary.streak_length, 2);
        // 10 / prev_close of row 6 (12.0)
        assert_approx(summary.streak_return, 10.0 / 12.0 - 1.0, DEFAULT_EPSILON);
        // Current red streak is the longest red streak.
        assert_eq!(summary.continuation_probability, 0.0);
        assert_eq!(summary.overall_share, 3.0 / 8.0);
        assert_eq!(summary.longest.length, 2);
        assert_eq!(summary.longest.start, bars[6].date);
    }

    #[test]
    fn distributions_and_calendar_mix() {
        let bars = make_bars(&CLOSES);
        let (_, summary) = candles(&bars);
        assert_eq!(summary.green_distribution.get(&2), Some(&1));
        assert_eq!(summary.green_distribution.get(&3), Some(&1));
        assert_eq!(summary.red_distribution.get(&1), Some(&1));
        assert_eq!(summary.red_distribution.get(&2), Some(&1));

        assert_eq!(summary.by_year.len(), 1);
        assert_eq!(summary.by_year[0].period, "2024");
        assert_eq!(summary.by_year[0].green, 5);
        assert_eq!(summary.by_quarter[0].period, "2024-Q1");
        assert_approx(summary.by_quarter[0].green_share(), 5.0 / 8.0, DEFAULT_EPSILON);
    }

    #[test]
    fn single_bar() {
        let bars = make_bars(&[42.0]);
        let (rows, summary) = candles(&bars);
        assert_eq!(rows.len(), 1);
        assert!(summary.last_green);
        assert_eq!(summary.streak_length, 1);
        assert_eq!(summary.overall_share, 1.0);
        assert_eq!(summary.continuation_probability, 0.0);
    }

    #[test]
    fn ranges_are_high_minus_low() {
        let bars = make_bars(&[10.0, 12.0]);
        // make_bars: high = max(open, close) + 1, low = min(open, close) - 1
        assert_eq!(ranges(&bars), vec![2.0, 4.0]);
    }
}
