//! "When did the stock last close this high?" lookups for every row.
//!
//! For row `i` with target `x = close[i]`, over rows `j <= i`:
//! - `total_hits`: rows with `close[j] >= x` (row `i` included)
//! - `first_hit`: earliest such row
//! - `last_hit`: most recent such row before `i`, or `first_hit` when `i` is
//!   the only one
//! - `pct_hit`: `total_hits / (i - first + 1)`
//!
//! Closes are coordinate-compressed in descending order so "close >= x" is
//! a prefix of ranks. Two Fenwick trees over that prefix answer the count
//! and the latest index seen so far; a running maximum answers the earliest
//! index by binary search. O(n log n) overall.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::DailyBar;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalHit {
    pub total_hits: usize,
    pub first_hit: NaiveDate,
    pub last_hit: NaiveDate,
    pub pct_hit: f64,
}

/// Fenwick tree over prefix sums of counts.
struct CountTree {
    tree: Vec<usize>,
}

impl CountTree {
    fn new(n: usize) -> Self {
        Self { tree: vec![0; n + 1] }
    }

    fn add(&mut self, rank: usize) {
        let mut i = rank + 1;
        while i < self.tree.len() {
            self.tree[i] += 1;
            i += i & i.wrapping_neg();
        }
    }

    /// Count over ranks `0..=rank`.
    fn prefix(&self, rank: usize) -> usize {
        let mut i = rank + 1;
        let mut total = 0;
        while i > 0 {
            total += self.tree[i];
            i -= i & i.wrapping_neg();
        }
        total
    }
}

/// Fenwick tree over prefix maxima. Values only grow, which is all a
/// max-Fenwick supports.
struct MaxTree {
    tree: Vec<Option<usize>>,
}

impl MaxTree {
    fn new(n: usize) -> Self {
        Self {
            tree: vec![None; n + 1],
        }
    }

    fn update(&mut self, rank: usize, value: usize) {
        let mut i = rank + 1;
        while i < self.tree.len() {
            self.tree[i] = self.tree[i].max(Some(value));
            i += i & i.wrapping_neg();
        }
    }

    fn prefix(&self, rank: usize) -> Option<usize> {
        let mut i = rank + 1;
        let mut best = None;
        while i > 0 {
            best = best.max(self.tree[i]);
            i -= i & i.wrapping_neg();
        }
        best
    }
}

/// Dense ranks with the largest close at rank 0; equal closes share a rank.
fn descending_ranks(closes: &[f64]) -> (Vec<usize>, usize) {
    let mut distinct: Vec<f64> = closes.to_vec();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());
    let ranks = closes
        .iter()
        .map(|c| {
            distinct
                .binary_search_by(|probe| c.total_cmp(probe))
                .unwrap_or_else(|pos| pos)
        })
        .collect();
    (ranks, distinct.len())
}

pub fn historical_hits(bars: &[DailyBar]) -> Vec<HistoricalHit> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let (ranks, distinct) = descending_ranks(&closes);

    let mut running_max = Vec::with_capacity(closes.len());
    let mut counts = CountTree::new(distinct);
    let mut latest = MaxTree::new(distinct);
    let mut hits = Vec::with_capacity(closes.len());

    for (i, &x) in closes.iter().enumerate() {
        let prev_max = running_max.last().copied().unwrap_or(f64::NEG_INFINITY);
        running_max.push(if x > prev_max { x } else { prev_max });

        let earlier = counts.prefix(ranks[i]);
        let last_before = latest.prefix(ranks[i]);
        // running_max[i] >= x, so the search never passes i.
        let first = running_max[..=i].partition_point(|&m| m < x).min(i);

        let total = earlier + 1;
        let last = last_before.unwrap_or(first);
        hits.push(HistoricalHit {
            total_hits: total,
            first_hit: bars[first].date,
            last_hit: bars[last].date,
            pct_hit: total as f64 / (i - first + 1) as f64,
        });

        counts.add(ranks[i]);
        latest.update(ranks[i], i);
    }

    hits
}

/// Quadratic reference scan, used to cross-check the indexed version.
#[cfg(test)]
pub(crate) fn historical_hits_naive(bars: &[DailyBar]) -> Vec<HistoricalHit> {
    (0..bars.len())
        .map(|i| {
            let x = bars[i].close;
            let matches: Vec<usize> = (0..=i).filter(|&j| bars[j].close >= x).collect();
            let first = matches[0];
            let last = if matches.len() > 1 {
                matches[matches.len() - 2]
            } else {
                first
            };
            HistoricalHit {
                total_hits: matches.len(),
                first_hit: bars[first].date,
                last_hit: bars[last].date,
                pct_hit: matches.len() as f64 / (i - first + 1) as f64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::make_bars;

    #[test]
    fn increasing_series_hits_itself() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for (bar, hit) in bars.iter().zip(historical_hits(&bars)) {
            assert_eq!(hit.total_hits, 1);
            assert_eq!(hit.first_hit, bar.date);
            assert_eq!(hit.last_hit, bar.date);
            assert_eq!(hit.pct_hit, 1.0);
        }
    }

    #[test]
    fn ties_count_as_hits() {
        let bars = make_bars(&[10.0, 8.0, 10.0, 9.0]);
        let hits = historical_hits(&bars);

        // Row 2 (10.0): rows 0 and 2 qualify.
        assert_eq!(hits[2].total_hits, 2);
        assert_eq!(hits[2].first_hit, bars[0].date);
        assert_eq!(hits[2].last_hit, bars[0].date);
        assert!((hits[2].pct_hit - 2.0 / 3.0).abs() < 1e-12);

        // Row 3 (9.0): rows 0, 2, 3; last earlier hit is row 2.
        assert_eq!(hits[3].total_hits, 3);
        assert_eq!(hits[3].first_hit, bars[0].date);
        assert_eq!(hits[3].last_hit, bars[2].date);
        assert_eq!(hits[3].pct_hit, 0.75);
    }

    #[test]
    fn matches_naive_scan() {
        let closes = [
            5.0, 3.0, 7.0, 7.0, 2.0, 9.0, 4.0, 7.0, 1.0, 8.0, 9.0, 3.0, 6.0, 6.0, 10.0, 2.0,
        ];
        let bars = make_bars(&closes);
        assert_eq!(historical_hits(&bars), historical_hits_naive(&bars));
    }
}
