//! StockScope Runner — batch analysis, app configuration, reports and exports.
//!
//! This crate builds on `stockscope-core` to provide:
//! - TOML application config with per-section defaults
//! - Series loading through the consolidated cache
//! - Parallel per-symbol pipeline with error isolation and correlation
//! - HTML index and per-symbol pages from `{placeholder}` templates
//! - Derived-table CSV and analysis JSON export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod pipeline;
pub mod reporting;

pub use config::{AppConfig, ConfigError, PathsConfig, ReportConfig};
pub use data_loader::{LoadError, LoadedSeries, SeriesLoader, SeriesSource};
pub use export::{write_symbol_exports, ExportPaths};
pub use pipeline::{run_pipeline, PipelineError, PipelineOptions, PipelineOutput, SymbolError};
pub use reporting::{render_site, SitePaths};
