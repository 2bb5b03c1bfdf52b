//! HTML report rendering.
//!
//! The index page lists every analysed symbol with top movers and
//! correlation peers; each symbol gets its own page under `pages/`.

pub mod index;
pub mod stock_page;
pub mod template;

pub use index::{rank_period, render_index};
pub use stock_page::render_stock_page;
pub use template::{Template, TemplateError};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::config::AppConfig;
use crate::pipeline::PipelineOutput;

pub const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
pub const STOCK_TEMPLATE: &str = include_str!("../../templates/stock.html");

/// Files written by one rendering pass.
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub index: PathBuf,
    pub pages: Vec<PathBuf>,
}

/// Render the index and one page per analysed symbol into `output_dir`.
pub fn render_site(config: &AppConfig, output: &PipelineOutput, today: NaiveDate) -> Result<SitePaths> {
    let index_template = Template::load(config.paths.index_template.as_deref(), INDEX_TEMPLATE)
        .context("failed to read index template")?;
    let stock_template = Template::load(config.paths.stock_template.as_deref(), STOCK_TEMPLATE)
        .context("failed to read stock template")?;

    let pages_dir = config.pages_dir();
    std::fs::create_dir_all(&pages_dir)
        .with_context(|| format!("failed to create {}", pages_dir.display()))?;

    let mut pages = Vec::with_capacity(output.analyses.len());
    for analysis in &output.analyses {
        let html = render_stock_page(&stock_template, analysis, today)
            .with_context(|| format!("failed to render page for {}", analysis.symbol()))?;
        let path = pages_dir.join(format!("{}.html", analysis.symbol()));
        write_file(&path, &html)?;
        pages.push(path);
    }

    let html = render_index(
        &index_template,
        &output.analyses,
        output.correlation.as_ref(),
        &config.report,
        today,
    )
    .context("failed to render index")?;
    let index = config.paths.output_dir.join("index.html");
    write_file(&index, &html)?;

    info!(pages = pages.len(), index = %index.display(), "rendered report");
    Ok(SitePaths { index, pages })
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

// ── Formatting helpers ──────────────────────────────────────────────

pub(crate) fn pct(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

pub(crate) fn color_class(value: f64) -> &'static str {
    if value >= 0.0 {
        "color-green"
    } else {
        "color-red"
    }
}

pub(crate) fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

pub(crate) fn weekday_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
