//! Application configuration loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file) is a
//! valid configuration rooted at `data/` and `output/`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stockscope_core::features::FeatureConfigError;
use stockscope_core::{CorrelationConfig, FeatureConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [features] section: {0}")]
    Features(#[from] FeatureConfigError),

    #[error("invalid [report] section: {0}")]
    Report(String),

    #[error("list symbols in {path}: {source}")]
    ListSymbols {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// One sub-directory of yearly exchange CSVs per symbol.
    pub nse_data_dir: PathBuf,
    /// `{SYMBOL}.csv` earnings files and `{SYMBOL}_splits.csv` split files.
    pub company_data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Overrides for the built-in HTML templates.
    pub index_template: Option<PathBuf>,
    pub stock_template: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            nse_data_dir: PathBuf::from("data/NSE"),
            company_data_dir: PathBuf::from("data/company"),
            output_dir: PathBuf::from("output"),
            index_template: None,
            stock_template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rows in each top gainers / losers table.
    pub top_count: usize,
    /// Performance windows ranked on the index page.
    pub index_periods: Vec<usize>,
    /// Analyse symbols on the rayon pool.
    pub parallel: bool,
    /// First calendar year fetched by the downloader.
    pub start_year: i32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_count: 5,
            index_periods: vec![5, 50, 1000],
            parallel: true,
            start_year: stockscope_core::data::DEFAULT_START_YEAR,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub features: FeatureConfig,
    pub correlation: CorrelationConfig,
    pub report: ReportConfig,
    /// Explicit symbol list; `None` means every sub-directory of `nse_data_dir`.
    pub symbols: Option<Vec<String>>,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.features.validate()?;
        if self.report.top_count == 0 {
            return Err(ConfigError::Report("top_count must be at least 1".into()));
        }
        if let Some(&p) = self
            .report
            .index_periods
            .iter()
            .find(|p| !self.features.performance_windows.contains(p))
        {
            return Err(ConfigError::Report(format!(
                "index period {p} is not one of the performance windows"
            )));
        }
        Ok(())
    }

    /// Configured symbols, or the sorted sub-directories of `nse_data_dir`.
    pub fn resolve_symbols(&self) -> Result<Vec<String>, ConfigError> {
        match &self.symbols {
            Some(list) => Ok(list.iter().map(|s| s.to_uppercase()).collect()),
            None => list_symbol_dirs(&self.paths.nse_data_dir),
        }
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.paths.output_dir.join("pages")
    }

    pub fn data_out_dir(&self) -> PathBuf {
        self.paths.output_dir.join("data")
    }
}

/// Sorted names of the sub-directories of `dir`; empty when `dir` is missing.
pub fn list_symbol_dirs(dir: &Path) -> Result<Vec<String>, ConfigError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::ListSymbols {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut symbols = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::ListSymbols {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                symbols.push(name.to_string());
            }
        }
    }
    symbols.sort();
    Ok(symbols)
}
