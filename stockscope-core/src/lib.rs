//! StockScope Core — daily equity series, loaders, indicators and the feature engine.
//!
//! This crate contains everything needed to turn exchange files into
//! per-symbol statistics:
//! - Domain types (daily bars, validated series, summaries)
//! - Exchange CSV parsing, consolidation, split/PE adjustment, Parquet cache
//! - Exchange downloader
//! - Indicators (moving averages, rank correlation, rank-trend)
//! - Feature engine (performance, streaks, rolling returns, hits, ATH)
//! - Cross-symbol correlation

pub mod correlation;
pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;

pub use correlation::{
    correlation_report, CorrelationConfig, CorrelationMethod, CorrelationReport, PeerExtremes,
};
pub use domain::{DailyBar, SeriesError, StockSeries, StockSummary};
pub use features::{FeatureConfig, FeatureEngine, StockAnalysis};

#[cfg(test)]
mod test_util;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner moves across rayon workers
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<DailyBar>();
        require_sync::<DailyBar>();
        require_send::<StockSeries>();
        require_sync::<StockSeries>();
        require_send::<StockAnalysis>();
        require_sync::<StockAnalysis>();
        require_send::<FeatureEngine>();
        require_sync::<FeatureEngine>();
        require_send::<CorrelationReport>();
        require_sync::<CorrelationReport>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::ConsolidatedCache>();
        require_sync::<data::ConsolidatedCache>();
    }
}
