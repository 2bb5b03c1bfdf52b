//! Run-length bookkeeping over boolean classifications.
//!
//! A streak is a maximal run of consecutive rows with the same flag. Streak
//! indices start at 1 and increase on every flip; lengths are 1-based.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-row streak position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub flag: bool,
    pub index: usize,
    pub length: usize,
}

/// One maximal run, as row positions (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub flag: bool,
    pub start: usize,
    pub end: usize,
}

impl Run {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Runs are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }
}

pub fn streak_states(flags: &[bool]) -> Vec<StreakState> {
    let mut states: Vec<StreakState> = Vec::with_capacity(flags.len());
    for &flag in flags {
        let next = match states.last() {
            Some(prev) if prev.flag == flag => StreakState {
                flag,
                index: prev.index,
                length: prev.length + 1,
            },
            Some(prev) => StreakState {
                flag,
                index: prev.index + 1,
                length: 1,
            },
            None => StreakState {
                flag,
                index: 1,
                length: 1,
            },
        };
        states.push(next);
    }
    states
}

pub fn runs(flags: &[bool]) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::new();
    for (i, &flag) in flags.iter().enumerate() {
        match out.last_mut() {
            Some(run) if run.flag == flag => run.end = i,
            _ => out.push(Run {
                flag,
                start: i,
                end: i,
            }),
        }
    }
    out
}

/// Share of streaks of the current run's flag that outlasted it, among
/// those that reached its length. The current run is included in both
/// counts, so the denominator is never zero.
pub fn continuation_probability(runs: &[Run]) -> f64 {
    let Some(current) = runs.last() else {
        return 0.0;
    };
    let target = current.len();
    let same: Vec<usize> = runs
        .iter()
        .filter(|r| r.flag == current.flag)
        .map(Run::len)
        .collect();
    let reached = same.iter().filter(|&&len| len >= target).count();
    let exceeded = same.iter().filter(|&&len| len > target).count();
    if reached == 0 {
        0.0
    } else {
        exceeded as f64 / reached as f64
    }
}

/// Longest run with the given flag; the earliest wins ties.
pub fn longest_run(runs: &[Run], flag: bool) -> Option<Run> {
    runs.iter()
        .filter(|r| r.flag == flag)
        .fold(None, |best: Option<Run>, r| match best {
            Some(b) if b.len() >= r.len() => Some(b),
            _ => Some(*r),
        })
}

/// Streak length -> number of runs, for one flag.
pub fn length_distribution(runs: &[Run], flag: bool) -> BTreeMap<usize, usize> {
    let mut dist = BTreeMap::new();
    for r in runs.iter().filter(|r| r.flag == flag) {
        *dist.entry(r.len()).or_insert(0) += 1;
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAGS: [bool; 8] = [true, true, false, true, true, true, false, false];

    #[test]
    fn states_reset_on_flip() {
        let states = streak_states(&FLAGS);
        let lengths: Vec<usize> = states.iter().map(|s| s.length).collect();
        let indices: Vec<usize> = states.iter().map(|s| s.index).collect();
        assert_eq!(lengths, vec![1, 2, 1, 1, 2, 3, 1, 2]);
        assert_eq!(indices, vec![1, 1, 2, 3, 3, 3, 4, 4]);
    }

    #[test]
    fn runs_cover_every_row() {
        let r = runs(&FLAGS);
        assert_eq!(r.len(), 4);
        assert_eq!(r.iter().map(Run::len).sum::<usize>(), FLAGS.len());
        assert_eq!(r[1], Run { flag: false, start: 2, end: 2 });
    }

    #[test]
    fn continuation_counts_current_run() {
        // Red runs: [1, 2]; current red run has length 2 and is the longest.
        let r = runs(&FLAGS);
        assert_eq!(continuation_probability(&r), 0.0);

        // Green runs: [2, 3, 1]; current length 1 -> 2 of 3 went further.
        let flags = [true, true, false, true, true, true, false, true];
        let r = runs(&flags);
        assert!((continuation_probability(&r) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn longest_prefers_first_occurrence() {
        let flags = [true, true, false, true, true];
        let r = runs(&flags);
        let longest = longest_run(&r, true).unwrap();
        assert_eq!((longest.start, longest.end), (0, 1));
        assert!(longest_run(&runs(&[true]), false).is_none());
    }

    #[test]
    fn distribution_by_length() {
        let dist = length_distribution(&runs(&FLAGS), true);
        assert_eq!(dist.get(&2), Some(&1));
        assert_eq!(dist.get(&3), Some(&1));
        assert_eq!(dist.get(&1), None);
    }
}
