//! Per-symbol derived-table export.
//!
//! - **CSV** (`data/{SYMBOL}.csv`): every bar field, then the typed per-row
//!   features, then every derived column in engine order
//! - **JSON** (`data/{SYMBOL}.json`): the analysis without the per-row table

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stockscope_core::{StockAnalysis, StockSeries};

const BAR_COLUMNS: [&str; 15] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "prev_close",
    "ltp",
    "vwap",
    "week52_high",
    "week52_low",
    "volume",
    "turnover_value",
    "num_trades",
    "pe",
    "adjustment",
];

const FEATURE_COLUMNS: [&str; 9] = [
    "is_green",
    "candle_streak_index",
    "candle_streak_length",
    "above_ma",
    "ma_streak_length",
    "total_hits",
    "first_hit",
    "last_hit",
    "pct_hit",
];

/// Paths written for one symbol.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Header of the derived-table CSV for an analysis.
pub fn csv_header(analysis: &StockAnalysis) -> Vec<String> {
    BAR_COLUMNS
        .iter()
        .chain(FEATURE_COLUMNS.iter())
        .map(|s| s.to_string())
        .chain(analysis.table.columns.names().iter().cloned())
        .collect()
}

pub fn export_table_csv(series: &StockSeries, analysis: &StockAnalysis) -> Result<String> {
    let table = &analysis.table;
    if table.len() != series.len() {
        bail!(
            "{}: derived table has {} rows but the series has {}",
            series.symbol(),
            table.len(),
            series.len()
        );
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(csv_header(analysis))?;

    for (i, bar) in series.bars().iter().enumerate() {
        let candle = &table.candles[i];
        let ma = &table.ma_streak[i];
        let hit = &table.hits[i];

        let mut record: Vec<String> = vec![
            bar.date.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.prev_close.to_string(),
            bar.ltp.to_string(),
            bar.vwap.to_string(),
            bar.week52_high.to_string(),
            bar.week52_low.to_string(),
            bar.volume.to_string(),
            bar.turnover_value.to_string(),
            bar.num_trades.to_string(),
            bar.pe.map(|pe| pe.to_string()).unwrap_or_default(),
            bar.adjustment.to_string(),
            candle.is_green.to_string(),
            candle.streak.index.to_string(),
            candle.streak.length.to_string(),
            ma.flag.to_string(),
            ma.length.to_string(),
            hit.total_hits.to_string(),
            hit.first_hit.to_string(),
            hit.last_hit.to_string(),
            hit.pct_hit.to_string(),
        ];
        record.extend(table.columns.iter().map(|(_, values)| values[i].to_string()));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_analysis_json(analysis: &StockAnalysis) -> Result<String> {
    serde_json::to_string_pretty(analysis).context("failed to serialize analysis to JSON")
}

/// Write both files for one symbol under `dir`, creating it if needed.
pub fn write_symbol_exports(
    dir: &Path,
    series: &StockSeries,
    analysis: &StockAnalysis,
) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let symbol = series.symbol();

    let csv_path = dir.join(format!("{symbol}.csv"));
    std::fs::write(&csv_path, export_table_csv(series, analysis)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    let json_path = dir.join(format!("{symbol}.json"));
    std::fs::write(&json_path, export_analysis_json(analysis)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    Ok(ExportPaths {
        csv: csv_path,
        json: json_path,
    })
}
