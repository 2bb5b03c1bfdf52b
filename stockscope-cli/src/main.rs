//! StockScope CLI — download, report, correlation and cache commands.
//!
//! Commands:
//! - `download` — fetch yearly exchange CSVs for the given symbols
//! - `report` — update, analyse, correlate, render HTML and export tables
//! - `correlation` — print each symbol's most and least correlated peers
//! - `cache status` — list consolidated tables and their date ranges

use std::collections::{BTreeMap, HashSet};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use stockscope_core::data::{
    download_symbols, effective_end_date, ist_now, ConsolidatedCache, LogProgress, NseDownloader,
};
use stockscope_core::{correlation_report, CorrelationMethod, CorrelationReport};
use stockscope_runner::{render_site, run_pipeline, AppConfig, PipelineOptions, SeriesLoader};
use tracing::{info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "stockscope.toml";

#[derive(Parser)]
#[command(
    name = "stockscope",
    about = "StockScope — descriptive analytics over daily equity price series"
)]
struct Cli {
    /// Also write log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download yearly exchange CSVs into the NSE data directory.
    Download {
        /// Symbols to download (e.g., INFY TCS).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// First calendar year to fetch. Defaults to `[report] start_year`.
        #[arg(long)]
        start_year: Option<i32>,
    },
    /// Update data, analyse every symbol, and write the HTML report and tables.
    Report {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the download step.
        #[arg(long, default_value_t = false)]
        no_update: bool,

        /// Rebuild every consolidated table from the raw files.
        #[arg(long, default_value_t = false)]
        reload: bool,

        /// Restrict the run to these symbols.
        #[arg(long, num_args = 1..)]
        symbols: Option<Vec<String>>,
    },
    /// Print the most and least correlated peer of every symbol.
    Correlation {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Most recent aligned rows to use.
        #[arg(long)]
        max_records: Option<usize>,

        /// pearson or spearman.
        #[arg(long)]
        method: Option<CorrelationMethod>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List consolidated tables with their date ranges.
    Status {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Dropping the guard flushes the file writer, so it lives until exit.
    let _log_guard = init_tracing(cli.log_file)?;

    match cli.command {
        Commands::Download {
            symbols,
            config,
            start_year,
        } => run_download(config.as_deref(), symbols, start_year),
        Commands::Report {
            config,
            no_update,
            reload,
            symbols,
        } => run_report(config.as_deref(), no_update, reload, symbols),
        Commands::Correlation {
            config,
            max_records,
            method,
        } => run_correlation(config.as_deref(), max_records, method),
        Commands::Cache { action } => match action {
            CacheAction::Status { config } => run_cache_status(config.as_deref()),
        },
    }
}

fn init_tracing(log_file: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    if let Some(path) = log_file {
        let (writer, guard) = log_file_writer(&path)?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))?;
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))?;
        Ok(None)
    }
}

/// Background writer appending to `path`, creating parent directories.
fn log_file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
    Ok(tracing_appender::non_blocking(file))
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => AppConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            AppConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("failed to load {DEFAULT_CONFIG}"))
        }
        None => Ok(AppConfig::default()),
    }
}

/// Downloads `symbols`; returns the ones that received new files.
fn update_data(config: &AppConfig, symbols: &[String], start_year: i32) -> Result<HashSet<String>> {
    let downloader = NseDownloader::new().context("failed to start exchange session")?;
    let end_date = effective_end_date(ist_now());
    let summary = download_symbols(
        &downloader,
        &config.paths.nse_data_dir,
        symbols,
        start_year,
        end_date,
        &LogProgress,
    );
    for (symbol, err) in &summary.errors {
        warn!(symbol = %symbol, error = %err, "download failed, using existing files");
    }
    Ok(summary.updated.into_iter().collect())
}

fn run_download(config: Option<&Path>, symbols: Vec<String>, start_year: Option<i32>) -> Result<()> {
    let config = load_config(config)?;
    let symbols: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
    let start_year = start_year.unwrap_or(config.report.start_year);

    let downloader = NseDownloader::new().context("failed to start exchange session")?;
    let summary = download_symbols(
        &downloader,
        &config.paths.nse_data_dir,
        &symbols,
        start_year,
        effective_end_date(ist_now()),
        &LogProgress,
    );

    for symbol in &summary.updated {
        println!("{symbol}: new data");
    }
    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        bail!(
            "{} of {} downloads failed",
            summary.errors.len(),
            summary.total
        );
    }
    Ok(())
}

fn run_report(
    config: Option<&Path>,
    no_update: bool,
    reload: bool,
    symbols: Option<Vec<String>>,
) -> Result<()> {
    let config = load_config(config)?;
    let symbols = match symbols {
        Some(list) => list.iter().map(|s| s.to_uppercase()).collect(),
        None => config.resolve_symbols()?,
    };
    if symbols.is_empty() {
        bail!(
            "no symbols configured and no symbol directories in {}",
            config.paths.nse_data_dir.display()
        );
    }

    let updated = if no_update {
        HashSet::new()
    } else {
        update_data(&config, &symbols, config.report.start_year)?
    };

    let options = PipelineOptions {
        reload,
        updated,
        export_dir: Some(config.data_out_dir()),
    };
    let output = run_pipeline(&config, &symbols, &options)?;
    let today = chrono::Local::now().date_naive();
    let site = render_site(&config, &output, today)?;

    println!(
        "Analysed {} of {} symbols. Report: {}",
        output.analyses.len(),
        symbols.len(),
        site.index.display()
    );
    for failure in &output.failures {
        eprintln!("  skipped {}: {failure}", failure.symbol());
    }
    Ok(())
}

fn run_correlation(
    config: Option<&Path>,
    max_records: Option<usize>,
    method: Option<CorrelationMethod>,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(n) = max_records {
        config.correlation.max_records = n;
    }
    if let Some(m) = method {
        config.correlation.method = m;
    }

    let loader = SeriesLoader::new(&config.paths);
    let mut closes = BTreeMap::new();
    for symbol in config.resolve_symbols()? {
        match loader.load(&symbol, false) {
            Ok(loaded) => {
                closes.insert(symbol, loaded.series.close_points());
            }
            Err(e) => warn!(error = %e, "skipping symbol"),
        }
    }
    if closes.len() < 2 {
        bail!("correlation needs at least two symbols, found {}", closes.len());
    }

    let report = correlation_report(&closes, &config.correlation);
    info!(symbols = report.symbols.len(), rows = report.dates_used, "correlation computed");
    print_peer_table(&report);
    Ok(())
}

fn print_peer_table(report: &CorrelationReport) {
    if let (Some(first), Some(last)) = (report.first_date, report.last_date) {
        println!(
            "{} correlation over {} rows ({first} to {last})",
            report.method, report.dates_used
        );
    }
    println!(
        "{:<14} {:<14} {:>8}  {:<14} {:>8}",
        "Symbol", "Max peer", "Value", "Min peer", "Value"
    );
    println!("{}", "-".repeat(64));
    for symbol in &report.symbols {
        match report.peers.get(symbol) {
            Some(p) => println!(
                "{:<14} {:<14} {:>8.3}  {:<14} {:>8.3}",
                symbol, p.max_peer, p.max_value, p.min_peer, p.min_value
            ),
            None => println!("{symbol:<14} (no overlapping history)"),
        }
    }
}

fn run_cache_status(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let cache = ConsolidatedCache::new(&config.paths.nse_data_dir);
    let symbols = config.resolve_symbols()?;
    if symbols.is_empty() {
        println!(
            "No symbol directories in {}",
            config.paths.nse_data_dir.display()
        );
        return Ok(());
    }

    println!(
        "{:<14} {:<8} {:<25} {:>8} {:<4}",
        "Symbol", "Cached", "Date Range", "Bars", "PE"
    );
    println!("{}", "-".repeat(64));
    let statuses = cache.status(&symbols);
    for s in &statuses {
        let range = match (s.start_date, s.end_date) {
            (Some(a), Some(b)) => format!("{a} to {b}"),
            _ => "-".to_string(),
        };
        println!(
            "{:<14} {:<8} {:<25} {:>8} {:<4}",
            s.symbol,
            if s.cached { "yes" } else { "no" },
            range,
            s.bar_count.map_or_else(|| "-".to_string(), |n| n.to_string()),
            match s.has_pe {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            }
        );
    }
    let cached = statuses.iter().filter(|s| s.cached).count();
    println!("\n{cached} of {} symbols cached", statuses.len());
    Ok(())
}
