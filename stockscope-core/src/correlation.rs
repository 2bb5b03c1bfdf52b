//! Cross-symbol correlation of closing prices.
//!
//! Closes are outer-joined on date, trimmed to the most recent
//! `max_records` rows, and correlated pair by pair over the rows where both
//! symbols have a value. Each symbol's least and most correlated peers are
//! extracted with the symbol itself excluded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::align::align_closes;
use crate::indicators::{pearson, spearman};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
}

impl CorrelationMethod {
    fn correlate(self, x: &[f64], y: &[f64]) -> Option<f64> {
        match self {
            CorrelationMethod::Pearson => pearson(x, y),
            CorrelationMethod::Spearman => spearman(x, y),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationMethod::Pearson => write!(f, "pearson"),
            CorrelationMethod::Spearman => write!(f, "spearman"),
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            other => Err(format!("unknown correlation method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub max_records: usize,
    pub method: CorrelationMethod,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            max_records: 1000,
            method: CorrelationMethod::Pearson,
        }
    }
}

/// Least and most correlated peers of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerExtremes {
    pub min_peer: String,
    pub min_value: f64,
    pub max_peer: String,
    pub max_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub method: CorrelationMethod,
    /// Ascending; row/column order of `matrix`.
    pub symbols: Vec<String>,
    /// Aligned rows after trimming to `max_records`.
    pub dates_used: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Symmetric; `None` where fewer than two shared rows or zero variance.
    pub matrix: Vec<Vec<Option<f64>>>,
    /// Symbols without any valid peer are absent.
    pub peers: BTreeMap<String, PeerExtremes>,
}

impl CorrelationReport {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        self.matrix[i][j]
    }
}

fn pairwise_complete(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip()
}

pub fn correlation_report(
    series: &BTreeMap<String, Vec<(NaiveDate, f64)>>,
    config: &CorrelationConfig,
) -> CorrelationReport {
    let aligned = align_closes(series).tail(config.max_records);
    let n = aligned.symbols.len();
    debug!(
        symbols = n,
        rows = aligned.len(),
        method = %config.method,
        "computing correlation matrix"
    );

    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let (x, y) = pairwise_complete(&aligned.closes[i], &aligned.closes[j]);
            let value = config.method.correlate(&x, &y);
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }

    let mut peers = BTreeMap::new();
    for (i, symbol) in aligned.symbols.iter().enumerate() {
        let mut min: Option<(usize, f64)> = None;
        let mut max: Option<(usize, f64)> = None;
        for (j, value) in matrix[i].iter().enumerate() {
            let Some(v) = *value else { continue };
            if j == i {
                continue;
            }
            if min.map_or(true, |(_, m)| v < m) {
                min = Some((j, v));
            }
            if max.map_or(true, |(_, m)| v > m) {
                max = Some((j, v));
            }
        }
        if let (Some((lo, lo_v)), Some((hi, hi_v))) = (min, max) {
            peers.insert(
                symbol.clone(),
                PeerExtremes {
                    min_peer: aligned.symbols[lo].clone(),
                    min_value: lo_v,
                    max_peer: aligned.symbols[hi].clone(),
                    max_value: hi_v,
                },
            );
        }
    }

    CorrelationReport {
        method: config.method,
        dates_used: aligned.len(),
        first_date: aligned.dates.first().copied(),
        last_date: aligned.dates.last().copied(),
        symbols: aligned.symbols,
        matrix,
        peers,
    }
}
