//! Series loading: exchange CSV parsing, consolidation, caching and download.

pub mod align;
pub mod cache;
pub mod consolidate;
pub mod download;
pub mod nse_csv;
pub mod provider;

pub use align::{align_closes, AlignedCloses};
pub use cache::{CacheMeta, CacheStatus, ConsolidatedCache};
pub use consolidate::{consolidate, EpsReport, SplitEvent};
pub use download::{
    download_symbols, effective_end_date, ist_now, update_symbol, DownloadSummary,
    ExchangeSource, NseDownloader, DEFAULT_START_YEAR,
};
pub use provider::{DataError, DownloadProgress, LogProgress};
