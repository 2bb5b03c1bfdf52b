//! Consolidated-series cache.
//!
//! Layout: `{nse_dir}/{SYMBOL}/consolidated.parquet` plus a `meta.json`
//! sidecar in the same directory.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema check, row count > 0, blake3 hash
//!   of the decoded bars against the sidecar)
//! - Quarantine for corrupt files (`consolidated.parquet.quarantined`)

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::DataError;
use crate::domain::{DailyBar, StockSeries};

const TABLE_FILE: &str = "consolidated.parquet";
const META_FILE: &str = "meta.json";

const COLUMNS: [&str; 15] = [
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

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub has_pe: bool,
    pub data_hash: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
    pub has_pe: Option<bool>,
}

/// Per-symbol consolidated tables stored next to the raw exchange files.
pub struct ConsolidatedCache {
    root: PathBuf,
}

impl ConsolidatedCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(symbol)
    }

    pub fn table_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(TABLE_FILE)
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(META_FILE)
    }

    /// Whether a table exists for the symbol (validity is checked on load).
    pub fn contains(&self, symbol: &str) -> bool {
        self.table_path(symbol).is_file()
    }

    /// Write a consolidated series. The table is written to a `.tmp` file and
    /// renamed into place; the sidecar follows.
    pub fn write(&self, series: &StockSeries) -> Result<CacheMeta, DataError> {
        let symbol = series.symbol();
        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut df = bars_to_dataframe(series.bars())?;
        let path = self.table_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&mut df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: series.first().date,
            end_date: series.last().date,
            bar_count: series.len(),
            has_pe: series.has_pe(),
            data_hash: data_hash(series.bars())?,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(symbol, rows = meta.bar_count, path = %path.display(), "wrote consolidated table");
        Ok(meta)
    }

    /// Load a cached series. A table that fails validation is quarantined and
    /// reported as `NoCachedData` so the caller can rebuild it.
    pub fn load(&self, symbol: &str) -> Result<StockSeries, DataError> {
        let path = self.table_path(symbol);
        if !path.is_file() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        let meta = self.get_meta(symbol);
        let bars = match load_and_validate_parquet(&path)
            .and_then(|bars| verify_hash(bars, meta.as_ref()))
        {
            Ok(bars) => bars,
            Err(e) => {
                self.quarantine(symbol, &e);
                return Err(DataError::NoCachedData {
                    symbol: symbol.to_string(),
                });
            }
        };

        let has_pe = match meta {
            Some(meta) => meta.has_pe,
            None => bars.iter().any(|b| b.pe.is_some()),
        };
        Ok(StockSeries::new(symbol, bars, has_pe)?)
    }

    /// Move a bad table aside and drop its sidecar.
    fn quarantine(&self, symbol: &str, reason: &DataError) {
        let path = self.table_path(symbol);
        let quarantine = path.with_extension("parquet.quarantined");
        warn!(
            path = %path.display(),
            error = %reason,
            "quarantining corrupt cache file"
        );
        let _ = fs::rename(&path, &quarantine);
        let _ = fs::remove_file(self.meta_path(symbol));
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Metadata-based status for the given symbols.
    pub fn status(&self, symbols: &[String]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym).filter(|_| self.contains(sym));
                CacheStatus {
                    symbol: sym.clone(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                    has_pe: meta.as_ref().map(|m| m.has_pe),
                }
            })
            .collect()
    }
}

fn data_hash(bars: &[DailyBar]) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Compare decoded bars with the hash recorded at write time. Tables without
/// a readable sidecar are accepted as-is.
fn verify_hash(bars: Vec<DailyBar>, meta: Option<&CacheMeta>) -> Result<Vec<DailyBar>, DataError> {
    if let Some(meta) = meta {
        let actual = data_hash(&bars)?;
        if actual != meta.data_hash {
            return Err(DataError::ValidationError(format!(
                "data hash mismatch: expected {}, found {actual}",
                meta.data_hash
            )));
        }
    }
    Ok(bars)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(bars: &[DailyBar]) -> Result<DataFrame, DataError> {
    let f64_col = |name: &str, get: fn(&DailyBar) -> f64| {
        Column::new(name.into(), bars.iter().map(get).collect::<Vec<f64>>())
    };
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        f64_col("open", |b| b.open),
        f64_col("high", |b| b.high),
        f64_col("low", |b| b.low),
        f64_col("close", |b| b.close),
        f64_col("prev_close", |b| b.prev_close),
        f64_col("ltp", |b| b.ltp),
        f64_col("vwap", |b| b.vwap),
        f64_col("week52_high", |b| b.week52_high),
        f64_col("week52_low", |b| b.week52_low),
        Column::new(
            "volume".into(),
            bars.iter().map(|b| b.volume).collect::<Vec<u64>>(),
        ),
        f64_col("turnover_value", |b| b.turnover_value),
        Column::new(
            "num_trades".into(),
            bars.iter().map(|b| b.num_trades).collect::<Vec<u64>>(),
        ),
        Column::new(
            "pe".into(),
            bars.iter().map(|b| b.pe).collect::<Vec<Option<f64>>>(),
        ),
        f64_col("adjustment", |b| b.adjustment),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<DailyBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<DailyBar>, DataError> {
    let column = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::ParquetError(format!("column read: {e}")))
    };
    let floats = |name: &str| -> Result<Vec<f64>, DataError> {
        let ca = column(name)?
            .f64()
            .map_err(|e| DataError::ParquetError(format!("{name} column type: {e}")))?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    };
    let counts = |name: &str| -> Result<Vec<u64>, DataError> {
        let ca = column(name)?
            .u64()
            .map_err(|e| DataError::ParquetError(format!("{name} column type: {e}")))?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(0)).collect())
    };

    let days = column("date")?
        .cast(&DataType::Int32)
        .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?;
    let days = days
        .i32()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let pe = column("pe")?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("pe column type: {e}")))?;
    let pe: Vec<Option<f64>> = pe.into_iter().collect();

    let open = floats("open")?;
    let high = floats("high")?;
    let low = floats("low")?;
    let close = floats("close")?;
    let prev_close = floats("prev_close")?;
    let ltp = floats("ltp")?;
    let vwap = floats("vwap")?;
    let week52_high = floats("week52_high")?;
    let week52_low = floats("week52_low")?;
    let turnover_value = floats("turnover_value")?;
    let adjustment = floats("adjustment")?;
    let volume = counts("volume")?;
    let num_trades = counts("num_trades")?;

    let mut bars = Vec::with_capacity(df.height());
    for (i, day) in days.into_iter().enumerate() {
        let day = day.ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        bars.push(DailyBar {
            date: epoch() + chrono::Duration::days(i64::from(day)),
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            prev_close: prev_close[i],
            ltp: ltp[i],
            vwap: vwap[i],
            week52_high: week52_high[i],
            week52_low: week52_low[i],
            volume: volume[i],
            turnover_value: turnover_value[i],
            num_trades: num_trades[i],
            pe: pe[i],
            adjustment: adjustment[i],
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::make_bars;

    fn sample_series() -> StockSeries {
        let mut bars = make_bars(&[100.0, 101.5, 99.25]);
        bars[1].pe = Some(21.5);
        bars[2].adjustment = 2.0;
        StockSeries::new("INFY", bars, true).unwrap()
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConsolidatedCache::new(dir.path());
        let series = sample_series();

        cache.write(&series).unwrap();
        let loaded = cache.load("INFY").unwrap();

        assert_eq!(loaded.bars(), series.bars());
        assert!(loaded.has_pe());
    }

    #[test]
    fn load_missing_is_no_cached_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConsolidatedCache::new(dir.path());
        assert!(matches!(
            cache.load("TCS"),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn corrupt_table_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConsolidatedCache::new(dir.path());
        fs::create_dir_all(dir.path().join("TCS")).unwrap();
        fs::write(cache.table_path("TCS"), b"not parquet").unwrap();

        assert!(matches!(
            cache.load("TCS"),
            Err(DataError::NoCachedData { .. })
        ));
        assert!(!cache.contains("TCS"));
        assert!(dir
            .path()
            .join("TCS")
            .join("consolidated.parquet.quarantined")
            .is_file());
    }

    #[test]
    fn tampered_table_fails_hash_check_and_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConsolidatedCache::new(dir.path());
        cache.write(&sample_series()).unwrap();

        // Replace the table with a readable one holding different prices,
        // leaving the sidecar from the original write.
        let mut tampered = make_bars(&[100.0, 101.5, 99.5]);
        tampered[1].pe = Some(21.5);
        let mut df = bars_to_dataframe(&tampered).unwrap();
        write_parquet(&mut df, &cache.table_path("INFY")).unwrap();

        assert!(matches!(
            cache.load("INFY"),
            Err(DataError::NoCachedData { .. })
        ));
        assert!(!cache.contains("INFY"));
        assert!(cache.get_meta("INFY").is_none());
        assert!(dir
            .path()
            .join("INFY")
            .join("consolidated.parquet.quarantined")
            .is_file());
    }

    #[test]
    fn meta_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConsolidatedCache::new(dir.path());
        let series = sample_series();
        let meta = cache.write(&series).unwrap();

        assert_eq!(meta.bar_count, 3);
        assert_eq!(meta.start_date, series.first().date);
        assert_eq!(meta.data_hash.len(), 64);

        let statuses = cache.status(&["INFY".to_string(), "TCS".to_string()]);
        assert!(statuses[0].cached);
        assert_eq!(statuses[0].has_pe, Some(true));
        assert!(!statuses[1].cached);
    }
}
