//! Index page: per-symbol summaries, top movers, correlation peers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use stockscope_core::{CorrelationReport, StockAnalysis};

use super::template::{Template, TemplateError};
use super::{color_class, escape_html, long_date, pct};
use crate::config::ReportConfig;

/// `(net_return, symbol)` for every analysis with a full `period` window,
/// ascending by return.
pub fn rank_period(analyses: &[StockAnalysis], period: usize) -> Vec<(f64, &str)> {
    let mut ranked: Vec<(f64, &str)> = analyses
        .iter()
        .filter_map(|a| {
            a.performance_for(period)
                .filter(|r| r.is_full_window())
                .map(|r| (r.net_return, a.symbol()))
        })
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    ranked
}

fn summary_rows(analyses: &[StockAnalysis]) -> String {
    analyses
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let s = &a.summary;
            let pe = match s.last_pe {
                Some(pe) if s.has_pe => format!("{pe:.2}"),
                _ => "Not available".to_string(),
            };
            format!(
                "<tr>\n\
                 <th scope=\"row\">#{}</th>\n\
                 <td><a href=\"pages/{sym}.html\">{sym}</a></td>\n\
                 <td>{}</td>\n\
                 <td>{}</td>\n\
                 <td>{}</td>\n\
                 <td>{:.2} <span class=\"{} metric\">({})</span></td>\n\
                 <td>{}</td>\n\
                 </tr>",
                i + 1,
                long_date(s.start_date),
                long_date(s.end_date),
                s.num_records,
                s.last_close,
                color_class(s.last_change),
                pct(s.last_change, 2),
                pe,
                sym = escape_html(&s.symbol),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn mover_cell(entry: Option<&(f64, &str)>) -> String {
    match entry {
        Some((ret, symbol)) => format!(
            "<td>{} <span class=\"{} metric\">({})</span></td>",
            escape_html(symbol),
            color_class(*ret),
            pct(*ret, 2)
        ),
        None => "<td>-</td>".to_string(),
    }
}

/// Header cells plus gainer and loser rows, one column per period.
fn top_movers(
    analyses: &[StockAnalysis],
    periods: &[usize],
    top_count: usize,
) -> (String, String, String) {
    let ranked: Vec<Vec<(f64, &str)>> = periods.iter().map(|&p| rank_period(analyses, p)).collect();
    let header = periods
        .iter()
        .map(|p| format!("<th scope=\"col\">{p} Days</th>"))
        .collect::<Vec<_>>()
        .join("\n");
    let rows = ranked.iter().map(Vec::len).max().unwrap_or(0).min(top_count);

    let mut gainers = Vec::with_capacity(rows);
    let mut losers = Vec::with_capacity(rows);
    for i in 0..rows {
        let gain_cells: Vec<String> = ranked
            .iter()
            .map(|r| mover_cell(r.len().checked_sub(i + 1).and_then(|j| r.get(j))))
            .collect();
        let loss_cells: Vec<String> = ranked.iter().map(|r| mover_cell(r.get(i))).collect();
        gainers.push(format!(
            "<tr>\n<th scope=\"row\">#{}</th>\n{}\n</tr>",
            i + 1,
            gain_cells.join("\n")
        ));
        losers.push(format!(
            "<tr>\n<th scope=\"row\">#{}</th>\n{}\n</tr>",
            i + 1,
            loss_cells.join("\n")
        ));
    }
    (header, gainers.join("\n"), losers.join("\n"))
}

fn correlation_rows(report: Option<&CorrelationReport>) -> String {
    let Some(report) = report else {
        return "<tr><td colspan=\"5\">Correlation needs at least two symbols.</td></tr>".to_string();
    };
    report
        .symbols
        .iter()
        .map(|symbol| match report.peers.get(symbol) {
            Some(p) => format!(
                "<tr>\n<td>{}</td>\n<td>{}</td>\n<td>{:.3}</td>\n<td>{}</td>\n<td>{:.3}</td>\n</tr>",
                escape_html(symbol),
                escape_html(&p.max_peer),
                p.max_value,
                escape_html(&p.min_peer),
                p.min_value
            ),
            None => format!(
                "<tr>\n<td>{}</td>\n<td colspan=\"4\">Not enough overlapping history</td>\n</tr>",
                escape_html(symbol)
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_index(
    template: &Template,
    analyses: &[StockAnalysis],
    correlation: Option<&CorrelationReport>,
    report: &ReportConfig,
    today: NaiveDate,
) -> Result<String, TemplateError> {
    let (perf_period_size, top_gainers, top_losers) =
        top_movers(analyses, &report.index_periods, report.top_count);
    let correlation_window = match correlation.and_then(|c| c.first_date.zip(c.last_date)) {
        Some((first, last)) => format!(
            "{} trading days from {} to {}",
            correlation.map_or(0, |c| c.dates_used),
            long_date(first),
            long_date(last)
        ),
        None => "No overlapping history".to_string(),
    };

    let mut values = BTreeMap::new();
    values.insert("today_date", long_date(today));
    values.insert("stock_count", analyses.len().to_string());
    values.insert("stock_summaries", summary_rows(analyses));
    values.insert("perf_period_size", perf_period_size);
    values.insert("top_gainers", top_gainers);
    values.insert("top_losers", top_losers);
    values.insert(
        "correlation_method",
        correlation.map_or_else(String::new, |c| c.method.to_string()),
    );
    values.insert("correlation_window", correlation_window);
    values.insert("correlation_rows", correlation_rows(correlation));
    template.render(&values)
}
