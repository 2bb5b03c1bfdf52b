//! Domain types for StockScope

pub mod bar;
pub mod series;

pub use bar::DailyBar;
pub use series::{SeriesError, StockSeries, StockSummary};
