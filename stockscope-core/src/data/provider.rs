//! Structured data-layer errors and progress reporting.

use thiserror::Error;

use crate::domain::SeriesError;

/// Errors from loading, consolidating, caching and downloading series.
///
/// Designed to be displayable in CLI output and log lines.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("no source files for '{symbol}' in {dir}")]
    NoSourceFiles { symbol: String, dir: String },

    #[error("csv error in {source_name}: {message}")]
    Csv { source_name: String, message: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for symbol '{symbol}'; run `report` without --no-update first")]
    NoCachedData { symbol: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Progress callback for multi-symbol downloads.
pub trait DownloadProgress: Send + Sync {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol fetch completes.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<bool, DataError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl DownloadProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::info!("[{}/{}] updating {symbol}", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<bool, DataError>,
    ) {
        match result {
            Ok(true) => tracing::info!(symbol, "new data downloaded"),
            Ok(false) => tracing::info!(symbol, "already up to date"),
            Err(e) => tracing::warn!(symbol, error = %e, "download failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!("download complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
