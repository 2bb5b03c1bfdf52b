//! Exchange downloader: yearly historical-equity CSVs per symbol.
//!
//! Files land in `{nse_dir}/{SYMBOL}/` under the name the exchange supplies
//! (for example `Quote-Equity-INFY-EQ-01-01-2024-31-12-2024.csv`). The last
//! `dd-mm-yyyy` in a file name is its end date; a file ending on Dec 31
//! marks its year as complete. Every other file is fetched again and removed
//! once its replacement is on disk.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use tracing::{debug, info};

use super::consolidate::source_files;
use super::provider::{DataError, DownloadProgress};

const HOME_URL: &str = "https://www.nseindia.com";
const HISTORY_URL: &str = "https://www.nseindia.com/api/historical/cm/equity";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

/// First calendar year fetched when no override is configured.
pub const DEFAULT_START_YEAR: i32 = 2020;

/// The day's data is considered published after this IST hour.
pub const PUBLISH_HOUR_IST: u32 = 19;

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// One CSV payload returned by the exchange.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub filename: String,
    pub content: String,
}

/// Source of yearly exchange files. Implemented over HTTP by
/// [`NseDownloader`]; tests substitute an in-memory source.
pub trait ExchangeSource: Send + Sync {
    /// Fetch the bars for `symbol` in `[from, to]`. `Ok(None)` means the
    /// exchange answered without a file.
    fn fetch_range(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<FetchedFile>, DataError>;
}

/// HTTP client for the exchange's historical-equity endpoint.
pub struct NseDownloader {
    client: reqwest::blocking::Client,
}

impl NseDownloader {
    /// Build a cookie-carrying client and prime the session with the home page.
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("client build: {e}")))?;

        client
            .get(HOME_URL)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(format!("session prime: {e}")))?;
        debug!("exchange session primed");

        Ok(Self { client })
    }
}

impl ExchangeSource for NseDownloader {
    fn fetch_range(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<FetchedFile>, DataError> {
        let query = format!(
            "symbol={symbol}&series=[%22EQ%22]&from={}&to={}&csv=true",
            from.format("%d-%m-%Y"),
            to.format("%d-%m-%Y")
        );
        let url = format!("{HISTORY_URL}?{query}");
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(format!("{url}: {e}")))?;

        if !resp.status().is_success() {
            debug!(symbol, status = %resp.status(), "no file returned");
            return Ok(None);
        }

        let filename = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .ok_or_else(|| {
                DataError::ResponseFormatChanged("missing content-disposition filename".into())
            })?;
        let content = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("read body: {e}")))?;

        info!(symbol, file = %filename, "downloaded");
        Ok(Some(FetchedFile { filename, content }))
    }
}

/// Extract `filename=...` from a content-disposition header value.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let name = rest.split(';').next()?.trim().trim_matches('"');
    // Keep only the final path component.
    let name = name.rsplit(['/', '\\']).next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Current time in India Standard Time.
pub fn ist_now() -> DateTime<FixedOffset> {
    // UTC+05:30 is always a valid offset.
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&ist)
}

/// Last date with published data: today after the publish hour, else yesterday.
pub fn effective_end_date(now: DateTime<FixedOffset>) -> NaiveDate {
    let today = now.date_naive();
    if now.hour() >= PUBLISH_HOUR_IST {
        today
    } else {
        today.pred_opt().unwrap_or(today)
    }
}

/// Last `dd-mm-yyyy` date embedded in a file stem.
pub fn last_date_in_name(stem: &str) -> Option<NaiveDate> {
    let bytes = stem.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    (0..=bytes.len() - 10).rev().find_map(|start| {
        let window = &bytes[start..start + 10];
        let shaped = window.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
        if !shaped {
            return None;
        }
        let text = std::str::from_utf8(window).ok()?;
        NaiveDate::parse_from_str(text, "%d-%m-%Y").ok()
    })
}

/// Bring `{nse_dir}/{symbol}/` up to date. Returns true when a new file
/// was written.
pub fn update_symbol(
    source: &dyn ExchangeSource,
    nse_dir: &Path,
    symbol: &str,
    start_year: i32,
    end_date: NaiveDate,
) -> Result<bool, DataError> {
    let dir = nse_dir.join(symbol);
    fs::create_dir_all(&dir)?;

    let mut completed_years = BTreeSet::new();
    // Incomplete files by the year of their end date; `None` when the name
    // carries no date.
    let mut stale: BTreeMap<Option<i32>, Vec<PathBuf>> = BTreeMap::new();
    for file in source_files(symbol, nse_dir)? {
        let last = file
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(last_date_in_name);
        match last {
            Some(d) if d.month() == 12 && d.day() == 31 => {
                completed_years.insert(d.year());
            }
            other => stale.entry(other.map(|d| d.year())).or_default().push(file),
        }
    }

    let mut updated = false;
    for year in start_year..=end_date.year() {
        if completed_years.contains(&year) {
            continue;
        }
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| DataError::ValidationError(format!("invalid year {year}")))?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)
            .map(|dec31| dec31.min(end_date))
            .ok_or_else(|| DataError::ValidationError(format!("invalid year {year}")))?;

        let Some(fetched) = source.fetch_range(symbol, from, to)? else {
            continue;
        };
        if fetched.content.lines().filter(|l| !l.trim().is_empty()).count() < 2 {
            info!(symbol, year, "downloaded data ignored since it was empty");
            continue;
        }

        let path = dir.join(&fetched.filename);
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, fetched.content.as_bytes())?;
        fs::rename(&tmp_path, &path)?;
        updated = true;

        for old in stale.remove(&Some(year)).unwrap_or_default() {
            remove_replaced(&old, &path)?;
        }
    }

    for old in stale.remove(&None).unwrap_or_default() {
        info!(file = %old.display(), "removing file without an end date");
        fs::remove_file(&old)?;
    }

    Ok(updated)
}

fn remove_replaced(old: &Path, replacement: &Path) -> Result<(), DataError> {
    if old != replacement {
        info!(file = %old.display(), "removing incomplete file");
        fs::remove_file(old)?;
    }
    Ok(())
}

/// Update several symbols in turn, reporting progress.
pub fn download_symbols(
    source: &dyn ExchangeSource,
    nse_dir: &Path,
    symbols: &[String],
    start_year: i32,
    end_date: NaiveDate,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut updated = Vec::new();
    let mut errors = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);
        let result = update_symbol(source, nse_dir, symbol, start_year, end_date);
        progress.on_complete(symbol, i, total, &result);
        match result {
            Ok(true) => updated.push(symbol.clone()),
            Ok(false) => {}
            Err(e) => errors.push((symbol.clone(), e)),
        }
    }

    let failed = errors.len();
    progress.on_batch_complete(total - failed, failed, total);

    DownloadSummary {
        total,
        updated,
        errors,
    }
}

/// Summary of a batch download operation.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    /// Symbols for which a new file was written.
    pub updated: Vec<String>,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn was_updated(&self, symbol: &str) -> bool {
        self.updated.iter().any(|s| s == symbol)
    }
}
