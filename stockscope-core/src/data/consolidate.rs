//! Consolidation of per-year exchange files into one canonical series.
//!
//! Pipeline per symbol:
//! 1. parse every `*{SYMBOL}*.csv` under `{nse_dir}/{SYMBOL}/`
//! 2. drop bars with missing or inconsistent prices, then merge, sort by
//!    date and drop duplicate dates (first file wins)
//! 3. attach PE from `{company_dir}/{SYMBOL}.csv` (unadjusted close / EPS)
//! 4. forward-adjust prices for splits in `{company_dir}/{SYMBOL}_splits.csv`

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::nse_csv::read_exchange_csv;
use super::provider::DataError;
use crate::domain::{DailyBar, StockSeries};

/// Date format used by the company data files.
pub const COMPANY_DATE_FORMAT: &str = "%d-%m-%Y";

/// Relative tolerance for the prev-close continuity diagnostic.
pub const PREV_CLOSE_TOLERANCE: f64 = 0.005;

/// Trailing earnings figure effective from a given date.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsReport {
    pub effective_from: NaiveDate,
    pub eps: f64,
}

/// Stock split: bars before `ex_date` are divided by `multiplier`.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitEvent {
    pub ex_date: NaiveDate,
    pub multiplier: f64,
}

#[derive(Debug, Deserialize)]
struct EpsRow {
    #[serde(rename = "FirstDateAfterFYReport")]
    first_date: String,
    #[serde(rename = "EPS")]
    eps: f64,
}

#[derive(Debug, Deserialize)]
struct SplitRow {
    #[serde(rename = "ExDate")]
    ex_date: String,
    #[serde(rename = "Multiplier")]
    multiplier: f64,
}

/// Exchange CSV files for a symbol, sorted by path.
pub fn source_files(symbol: &str, nse_dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let dir = nse_dir.join(symbol);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        let is_csv = path.extension().and_then(|e| e.to_str()) == Some("csv");
        let matches_symbol = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.contains(symbol));
        if is_csv && matches_symbol {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Build the canonical series for `symbol` from raw exchange and company files.
pub fn consolidate(
    symbol: &str,
    nse_dir: &Path,
    company_dir: &Path,
) -> Result<StockSeries, DataError> {
    info!(symbol, "consolidating exchange files");
    let files = source_files(symbol, nse_dir)?;
    if files.is_empty() {
        return Err(DataError::NoSourceFiles {
            symbol: symbol.to_string(),
            dir: nse_dir.join(symbol).display().to_string(),
        });
    }

    let mut bars = Vec::new();
    for file in &files {
        let parsed = read_exchange_csv(file)?;
        debug!(file = %file.display(), rows = parsed.len(), "parsed exchange file");
        bars.extend(parsed);
    }
    let mut bars = merge_bars(drop_invalid_bars(symbol, bars));

    let eps_path = company_dir.join(format!("{symbol}.csv"));
    let has_pe = eps_path.is_file();
    if has_pe {
        let reports = read_eps_reports(&eps_path)?;
        attach_pe(&mut bars, &reports);
    }

    let splits_path = company_dir.join(format!("{symbol}_splits.csv"));
    if splits_path.is_file() {
        let splits = read_splits(&splits_path)?;
        apply_splits(&mut bars, &splits);
    }

    let series = StockSeries::new(symbol, bars, has_pe)?;
    let mismatches = series.prev_close_mismatches(PREV_CLOSE_TOLERANCE);
    if !mismatches.is_empty() {
        warn!(
            symbol,
            count = mismatches.len(),
            first = %series.bars()[mismatches[0]].date,
            "prev close does not match the previous session's close"
        );
    }

    info!(
        symbol,
        records = series.len(),
        files = files.len(),
        start = %series.first().date,
        end = %series.last().date,
        "loaded records"
    );
    Ok(series)
}

/// Remove bars with a missing price (`-` or blank cells) or an impossible
/// OHLC shape.
pub fn drop_invalid_bars(symbol: &str, bars: Vec<DailyBar>) -> Vec<DailyBar> {
    let total = bars.len();
    let mut first_dropped = None;
    let kept: Vec<DailyBar> = bars
        .into_iter()
        .filter(|bar| {
            let ok = bar.is_sane();
            if !ok && first_dropped.is_none() {
                first_dropped = Some((bar.date, bar.is_void()));
            }
            ok
        })
        .collect();

    if let Some((date, void)) = first_dropped {
        warn!(
            symbol,
            dropped = total - kept.len(),
            first = %date,
            missing_prices = void,
            "dropping bars with missing or inconsistent prices"
        );
    }
    kept
}

/// Sort by date and keep the first bar seen for each date.
pub fn merge_bars(mut bars: Vec<DailyBar>) -> Vec<DailyBar> {
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    bars
}

fn parse_company_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), COMPANY_DATE_FORMAT)
        .map_err(|e| format!("invalid date '{raw}': {e}"))
}

pub fn read_eps_reports(path: &Path) -> Result<Vec<EpsReport>, DataError> {
    let source_name = path.display().to_string();
    let csv_err = |message: String| DataError::Csv {
        source_name: source_name.clone(),
        message,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_err(e.to_string()))?;

    let mut reports = Vec::new();
    for row in rdr.deserialize::<EpsRow>() {
        let row = row.map_err(|e| csv_err(e.to_string()))?;
        reports.push(EpsReport {
            effective_from: parse_company_date(&row.first_date).map_err(&csv_err)?,
            eps: row.eps,
        });
    }
    reports.sort_by_key(|r| r.effective_from);
    Ok(reports)
}

pub fn read_splits(path: &Path) -> Result<Vec<SplitEvent>, DataError> {
    let source_name = path.display().to_string();
    let csv_err = |message: String| DataError::Csv {
        source_name: source_name.clone(),
        message,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_err(e.to_string()))?;

    let mut splits = Vec::new();
    for row in rdr.deserialize::<SplitRow>() {
        let row = row.map_err(|e| csv_err(e.to_string()))?;
        if !(row.multiplier.is_finite() && row.multiplier > 0.0) {
            return Err(csv_err(format!("invalid split multiplier {}", row.multiplier)));
        }
        splits.push(SplitEvent {
            ex_date: parse_company_date(&row.ex_date).map_err(&csv_err)?,
            multiplier: row.multiplier,
        });
    }
    splits.sort_by_key(|s| s.ex_date);
    Ok(splits)
}

fn year_month(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Attach `pe = round3(close / eps)` using the latest report whose
/// year-month is not after the bar's year-month.
///
/// Reports are matched by calendar month, so every bar in the month a report
/// becomes effective carries the new figure. Bars older than every report
/// keep `pe = None`.
pub fn attach_pe(bars: &mut [DailyBar], reports: &[EpsReport]) {
    let mut next = 0;
    let mut current: Option<f64> = None;
    for bar in bars.iter_mut() {
        while next < reports.len()
            && year_month(reports[next].effective_from) <= year_month(bar.date)
        {
            current = Some(reports[next].eps);
            next += 1;
        }
        bar.pe = current
            .filter(|eps| *eps != 0.0 && eps.is_finite())
            .map(|eps| (bar.close / eps * 1000.0).round() / 1000.0);
    }
}

/// Divide prices of every bar dated before an ex-date by the cumulative
/// multiplier of all later splits.
pub fn apply_splits(bars: &mut [DailyBar], splits: &[SplitEvent]) {
    for bar in bars.iter_mut() {
        let multiplier: f64 = splits
            .iter()
            .filter(|s| bar.date < s.ex_date)
            .map(|s| s.multiplier)
            .product();
        if multiplier != 1.0 {
            bar.apply_split(multiplier);
        }
    }
}
