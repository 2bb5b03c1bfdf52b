//! Batch analysis over a symbol list.
//!
//! Each symbol is loaded and analysed independently, on the rayon pool when
//! `report.parallel` is set. A symbol that fails to load is logged and left
//! out; the rest of the batch continues. Correlation runs only after every
//! per-symbol result has been collected.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use chrono::NaiveDate;
use rayon::prelude::*;
use stockscope_core::features::FeatureConfigError;
use stockscope_core::{correlation_report, CorrelationReport, FeatureEngine, StockAnalysis};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::data_loader::{LoadError, SeriesLoader};
use crate::export::write_symbol_exports;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("feature configuration: {0}")]
    Features(#[from] FeatureConfigError),

    #[error("no symbols to process")]
    NoSymbols,

    #[error("every symbol failed ({0} attempted)")]
    AllFailed(usize),
}

/// Failure of one symbol; the rest of the batch is unaffected.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to export '{symbol}': {reason}")]
    Export { symbol: String, reason: String },
}

impl SymbolError {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolError::Load(e) => e.symbol(),
            SymbolError::Export { symbol, .. } => symbol,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Ignore cached tables and consolidate every symbol again.
    pub reload: bool,
    /// Symbols the downloader wrote new files for; their cache is rebuilt.
    pub updated: HashSet<String>,
    /// Write `{SYMBOL}.csv` and `{SYMBOL}.json` here during the symbol's pass.
    pub export_dir: Option<PathBuf>,
}

/// Analysis of one symbol plus the close points fed to the correlator.
struct SymbolResult {
    analysis: StockAnalysis,
    closes: Vec<(NaiveDate, f64)>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    /// In input symbol order.
    pub analyses: Vec<StockAnalysis>,
    pub failures: Vec<SymbolError>,
    /// `None` when fewer than two symbols were analysed.
    pub correlation: Option<CorrelationReport>,
}

impl PipelineOutput {
    pub fn get(&self, symbol: &str) -> Option<&StockAnalysis> {
        self.analyses.iter().find(|a| a.symbol() == symbol)
    }
}

fn analyze_symbol(
    loader: &SeriesLoader,
    engine: &FeatureEngine,
    symbol: &str,
    options: &PipelineOptions,
) -> Result<SymbolResult, SymbolError> {
    let rebuild = options.reload || options.updated.contains(symbol);
    let loaded = loader.load(symbol, rebuild)?;
    let analysis = engine.analyze(&loaded.series);
    if let Some(dir) = &options.export_dir {
        write_symbol_exports(dir, &loaded.series, &analysis).map_err(|e| SymbolError::Export {
            symbol: symbol.to_string(),
            reason: format!("{e:#}"),
        })?;
    }
    info!(
        symbol,
        records = loaded.series.len(),
        highlights = analysis.highlights.len(),
        "analysed"
    );
    Ok(SymbolResult {
        analysis,
        closes: loaded.series.close_points(),
    })
}

pub fn run_pipeline(
    config: &AppConfig,
    symbols: &[String],
    options: &PipelineOptions,
) -> Result<PipelineOutput, PipelineError> {
    if symbols.is_empty() {
        return Err(PipelineError::NoSymbols);
    }
    let engine = FeatureEngine::new(config.features.clone())?;
    let loader = SeriesLoader::new(&config.paths);

    let results: Vec<Result<SymbolResult, SymbolError>> = if config.report.parallel {
        symbols
            .par_iter()
            .map(|symbol| analyze_symbol(&loader, &engine, symbol, options))
            .collect()
    } else {
        symbols
            .iter()
            .map(|symbol| analyze_symbol(&loader, &engine, symbol, options))
            .collect()
    };

    let mut analyses = Vec::with_capacity(results.len());
    let mut closes = BTreeMap::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(r) => {
                closes.insert(r.analysis.symbol().to_string(), r.closes);
                analyses.push(r.analysis);
            }
            Err(e) => {
                warn!(symbol = e.symbol(), error = %e, "skipping symbol");
                failures.push(e);
            }
        }
    }
    if analyses.is_empty() {
        return Err(PipelineError::AllFailed(symbols.len()));
    }

    let correlation = (closes.len() >= 2).then(|| correlation_report(&closes, &config.correlation));
    info!(
        analysed = analyses.len(),
        failed = failures.len(),
        "pipeline complete"
    );

    Ok(PipelineOutput {
        analyses,
        failures,
        correlation,
    })
}
