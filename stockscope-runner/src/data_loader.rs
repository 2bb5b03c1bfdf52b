//! Series loading for the runner.
//!
//! Resolution order for one symbol:
//! 1. Cached consolidated table, unless a rebuild is requested
//! 2. Consolidation from the raw exchange and company files, written back to
//!    the cache
//!
//! A rebuild is requested by `--reload`, or when the downloader wrote new
//! files for the symbol. A corrupt cache entry is quarantined by the cache
//! and falls through to consolidation.

use std::path::PathBuf;

use stockscope_core::data::{consolidate, ConsolidatedCache, DataError};
use stockscope_core::StockSeries;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PathsConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load '{symbol}': {source}")]
    Data {
        symbol: String,
        #[source]
        source: DataError,
    },
}

impl LoadError {
    pub fn symbol(&self) -> &str {
        match self {
            LoadError::Data { symbol, .. } => symbol,
        }
    }
}

/// Where a loaded series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    Cache,
    Consolidated,
}

#[derive(Debug)]
pub struct LoadedSeries {
    pub series: StockSeries,
    pub source: SeriesSource,
}

/// Filesystem locations the loader reads from.
pub struct SeriesLoader {
    nse_data_dir: PathBuf,
    company_data_dir: PathBuf,
    cache: ConsolidatedCache,
}

impl SeriesLoader {
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            nse_data_dir: paths.nse_data_dir.clone(),
            company_data_dir: paths.company_data_dir.clone(),
            cache: ConsolidatedCache::new(&paths.nse_data_dir),
        }
    }

    pub fn cache(&self) -> &ConsolidatedCache {
        &self.cache
    }

    pub fn load(&self, symbol: &str, rebuild: bool) -> Result<LoadedSeries, LoadError> {
        if !rebuild && self.cache.contains(symbol) {
            match self.cache.load(symbol) {
                Ok(series) => {
                    debug!(symbol, records = series.len(), "loaded consolidated table from cache");
                    return Ok(LoadedSeries {
                        series,
                        source: SeriesSource::Cache,
                    });
                }
                Err(e) => warn!(symbol, error = %e, "cache unusable, rebuilding"),
            }
        }

        let series = consolidate(symbol, &self.nse_data_dir, &self.company_data_dir).map_err(
            |source| LoadError::Data {
                symbol: symbol.to_string(),
                source,
            },
        )?;
        // A failed cache write only costs a rebuild next time.
        if let Err(e) = self.cache.write(&series) {
            warn!(symbol, error = %e, "failed to write consolidated table");
        }
        Ok(LoadedSeries {
            series,
            source: SeriesSource::Consolidated,
        })
    }
}
