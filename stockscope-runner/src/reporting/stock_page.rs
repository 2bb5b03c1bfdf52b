//! Per-symbol page.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use stockscope_core::features::{rolling_returns, CandleMix};
use stockscope_core::StockAnalysis;

use super::template::{Template, TemplateError};
use super::{color_class, escape_html, long_date, pct, weekday_date};

struct PerfRows {
    period_size: Vec<String>,
    start_date: Vec<String>,
    net_returns: Vec<String>,
    avg_daily_returns: Vec<String>,
    median_close: Vec<String>,
    lowest_close: Vec<String>,
    highest_close: Vec<String>,
    median_pe: Vec<String>,
}

fn perf_rows(analysis: &StockAnalysis) -> PerfRows {
    let mut rows = PerfRows {
        period_size: vec!["<th scope=\"col\"></th>".to_string()],
        start_date: vec!["<th scope=\"row\">Start Date</th>".to_string()],
        net_returns: vec!["<th scope=\"row\">Net Return</th>".to_string()],
        avg_daily_returns: vec!["<th scope=\"row\">Average Daily Return</th>".to_string()],
        median_close: vec!["<th scope=\"row\">Median Close Price</th>".to_string()],
        lowest_close: vec!["<th scope=\"row\">Lowest Close Price</th>".to_string()],
        highest_close: vec!["<th scope=\"row\">Highest Close Price</th>".to_string()],
        median_pe: vec!["<th scope=\"row\">Median PE</th>".to_string()],
    };
    for r in &analysis.performance {
        // Short histories are labelled with the rows actually used.
        rows.period_size
            .push(format!("<th scope=\"col\">{} Days</th>", r.period_size));
        rows.start_date
            .push(format!("<td>{}</td>", long_date(r.start_date)));
        let color = color_class(r.net_return);
        rows.net_returns.push(format!(
            "<td><span class=\"{color} metric\">{}</span></td>",
            pct(r.net_return, 2)
        ));
        rows.avg_daily_returns.push(format!(
            "<td><span class=\"{color} metric\">{}</span></td>",
            pct(r.avg_daily_return, 3)
        ));
        rows.median_close
            .push(format!("<td>{:.2}</td>", r.median_close));
        rows.lowest_close
            .push(format!("<td>{:.2}</td>", r.lowest_close));
        rows.highest_close
            .push(format!("<td>{:.2}</td>", r.highest_close));
        rows.median_pe.push(format!("<td>{:.2}</td>", r.median_pe));
    }
    rows
}

/// "When did it last close this high?" sentences for the last row.
fn hit_narrative(analysis: &StockAnalysis, today: NaiveDate) -> (String, String) {
    let symbol = escape_html(analysis.symbol());
    let hit = &analysis.metrics.last_hit;
    if hit.total_hits > 1 {
        let first = format!(
            "{symbol} first closed at or above its last close price on \
             <span class=\"metric\">{}</span> which was \
             <span class=\"metric\">{}</span> days ago.",
            weekday_date(hit.first_hit),
            (today - hit.first_hit).num_days()
        );
        let last = format!(
            "Previously, {symbol} closed at or above its last close price on \
             <span class=\"metric\">{}</span> which was \
             <span class=\"metric\">{}</span> days ago.",
            weekday_date(hit.last_hit),
            (today - hit.last_hit).num_days()
        );
        (first, last)
    } else {
        (
            format!("This is the first time {symbol} has closed at this high a price."),
            String::new(),
        )
    }
}

fn ma_values(analysis: &StockAnalysis) -> String {
    analysis
        .metrics
        .ma_values
        .iter()
        .map(|(period, value)| {
            format!(
                "<p>Average of last {period} days: <span class=\"metric\">{value:.2}</span></p>"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn ma_streak_info(analysis: &StockAnalysis) -> String {
    let s = &analysis.metrics.ma_streak;
    let side = if s.above { "above" } else { "below" };
    format!(
        "Closed {side} the {}-day moving average for <span class=\"metric\">{}</span> sessions \
         since {}, a return of <span class=\"{} metric\">{}</span>.",
        s.period,
        s.length,
        long_date(s.start_date),
        color_class(s.net_return),
        pct(s.net_return, 2)
    )
}

fn rank_trend_rows(analysis: &StockAnalysis) -> String {
    analysis
        .metrics
        .rank_trends
        .iter()
        .map(|r| {
            format!(
                "<tr>\n<td>{} to {} days</td>\n<td>{:.3}</td>\n<td>{}</td>\n</tr>",
                r.first_window,
                r.last_window,
                r.value,
                r.strength.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn highlights(analysis: &StockAnalysis) -> String {
    if analysis.highlights.is_empty() {
        return "<p>Nothing notable today.</p>".to_string();
    }
    let items: Vec<String> = analysis
        .highlights
        .iter()
        .map(|h| format!("<li>{}</li>", escape_html(&h.message)))
        .collect();
    format!("<ul>\n{}\n</ul>", items.join("\n"))
}

/// Current, average, best and worst daily rolling return per window.
fn rolling_return_rows(analysis: &StockAnalysis) -> String {
    let columns = &analysis.table.columns;
    let mut windows: Vec<usize> = columns
        .names()
        .iter()
        .filter_map(|name| name.strip_prefix("rolling_return_")?.parse().ok())
        .collect();
    windows.sort_unstable();

    windows
        .into_iter()
        .filter_map(|w| {
            let values = columns.get_series(&rolling_returns::column_name(w))?;
            let current = *values.last()?;
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let worst = values.iter().copied().fold(f64::INFINITY, f64::min);
            Some(format!(
                "<tr>\n<td>{w} Days</td>\n\
                 <td><span class=\"{} metric\">{current:.3}%</span></td>\n\
                 <td>{mean:.3}%</td>\n<td>{best:.3}%</td>\n<td>{worst:.3}%</td>\n</tr>",
                color_class(current)
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn streak_distribution_rows(analysis: &StockAnalysis) -> String {
    let c = &analysis.metrics.candles;
    let lengths: Vec<usize> = c
        .green_distribution
        .keys()
        .chain(c.red_distribution.keys())
        .copied()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    lengths
        .iter()
        .map(|len| {
            format!(
                "<tr>\n<td>{len}</td>\n<td>{}</td>\n<td>{}</td>\n</tr>",
                c.green_distribution.get(len).copied().unwrap_or(0),
                c.red_distribution.get(len).copied().unwrap_or(0)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn candle_mix_rows(mixes: &[CandleMix]) -> String {
    mixes
        .iter()
        .map(|m| {
            format!(
                "<tr>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n</tr>",
                m.period,
                m.green,
                m.red,
                pct(m.green_share(), 1)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_stock_page(
    template: &Template,
    analysis: &StockAnalysis,
    today: NaiveDate,
) -> Result<String, TemplateError> {
    let summary = &analysis.summary;
    let metrics = &analysis.metrics;
    let candles = &metrics.candles;
    let ath = &metrics.ath;
    let perf = perf_rows(analysis);
    let (first_hit_info, last_hit_info) = hit_narrative(analysis, today);
    let is_ath = metrics.last_hit.total_hits <= 1;

    let mut values = BTreeMap::new();
    values.insert("symbol", escape_html(&summary.symbol));
    values.insert("num_records", summary.num_records.to_string());
    values.insert("start_date", long_date(summary.start_date));
    values.insert("end_date", long_date(summary.end_date));
    values.insert("today_date", long_date(today));

    values.insert("perf_period_size", perf.period_size.join("\n"));
    values.insert("perf_start_date", perf.start_date.join("\n"));
    values.insert("perf_net_returns", perf.net_returns.join("\n"));
    values.insert("perf_avg_daily_returns", perf.avg_daily_returns.join("\n"));
    values.insert("perf_median_close", perf.median_close.join("\n"));
    values.insert("perf_lowest_close", perf.lowest_close.join("\n"));
    values.insert("perf_highest_close", perf.highest_close.join("\n"));
    values.insert("perf_median_pe", perf.median_pe.join("\n"));
    let pe_class = if summary.has_pe { "" } else { "no_PE" };
    values.insert("pe_available", pe_class.to_string());

    values.insert("last_close", format!("{:.2}", summary.last_close));
    values.insert("ma_values", ma_values(analysis));
    values.insert("ma_streak_info", ma_streak_info(analysis));

    values.insert("first_hit_info", first_hit_info);
    values.insert("last_hit_info", last_hit_info);
    let ath_class = if is_ath { "is_ATH" } else { "" };
    values.insert("is_ath", ath_class.to_string());
    values.insert(
        "total_hits_of_last_close",
        metrics.last_hit.total_hits.to_string(),
    );
    values.insert(
        "pcnt_hits_of_last_close",
        pct(metrics.last_hit.pct_hit, 1),
    );

    values.insert("last_candle", candles.color().to_string());
    values.insert(
        "last_candle_color",
        format!("color-{}", candles.color().to_lowercase()),
    );
    values.insert("last_change", pct(summary.last_change, 2));
    values.insert("last_candle_overall_pcnt", pct(candles.overall_share, 1));
    values.insert("candle_streak", candles.streak_length.to_string());
    values.insert("curr_streak_returns", pct(candles.streak_return, 2));
    values.insert("streak_cont_prob", pct(candles.continuation_probability, 1));
    values.insert("longest_candle_streak", candles.longest.length.to_string());
    values.insert(
        "longest_candle_streak_start",
        long_date(candles.longest.start),
    );
    values.insert("longest_candle_streak_end", long_date(candles.longest.end));

    values.insert("rank_trend_rows", rank_trend_rows(analysis));

    values.insert("ath_value", format!("{:.2}", ath.ath));
    values.insert("curr_pcnt_down_ath", format!("{:.2}%", ath.pct_down));
    values.insert("max_pcnt_down_ath", format!("{:.2}%", ath.max_drawdown_pct));
    values.insert("ath_lookback", ath.lookback.to_string());
    values.insert("ath_hits", ath.new_high_days.to_string());
    values.insert("last_ath_date", weekday_date(ath.last_new_high));

    values.insert("highlights", highlights(analysis));
    values.insert("rolling_return_rows", rolling_return_rows(analysis));
    values.insert("streak_distribution_rows", streak_distribution_rows(analysis));
    values.insert("candle_mix_rows", candle_mix_rows(&metrics.candles.by_year));
    values.insert(
        "candle_quarter_rows",
        candle_mix_rows(&metrics.candles.by_quarter),
    );

    template.render(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockscope_core::{DailyBar, FeatureConfig, FeatureEngine, StockSeries};

    fn analysis(closes: &[f64]) -> StockAnalysis {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let prev = if i == 0 { close } else { closes[i - 1] };
                DailyBar {
                    date: base + chrono::Duration::days(i as i64),
                    open: prev,
                    high: close.max(prev) + 1.0,
                    low: close.min(prev) - 1.0,
                    close,
                    prev_close: prev,
                    ltp: close,
                    vwap: close,
                    week52_high: close,
                    week52_low: close,
                    volume: 1_000,
                    turnover_value: close * 1_000.0,
                    num_trades: 100,
                    pe: Some(close / 5.0),
                    adjustment: 1.0,
                }
            })
            .collect();
        let series = StockSeries::new("ACME", bars, true).unwrap();
        let config = FeatureConfig {
            performance_windows: vec![2, 10],
            ma_periods: vec![2, 3],
            rank_trend_stacks: vec![vec![1, 2, 3]],
            rolling_return_windows: vec![3],
            ma_streak_period: 3,
            ma_streak_highlight_len: 3,
            ath_lookback: 10,
            ..FeatureConfig::default()
        };
        FeatureEngine::new(config).unwrap().analyze(&series)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    #[test]
    fn new_high_gets_the_ath_narrative() {
        let a = analysis(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let (first, last) = hit_narrative(&a, today());
        assert_eq!(
            first,
            "This is the first time ACME has closed at this high a price."
        );
        assert!(last.is_empty());
    }

    #[test]
    fn earlier_hit_reports_days_ago() {
        // Last close 12 was first reached on day 2 (Jan 3) and last on day 3 (Jan 4).
        let a = analysis(&[10.0, 11.0, 12.0, 13.0, 12.0]);
        let (first, last) = hit_narrative(&a, today());
        assert!(first.contains("Wednesday, January 03, 2024"));
        assert!(first.contains("<span class=\"metric\">28</span> days ago"));
        assert!(last.contains("Thursday, January 04, 2024"));
    }

    #[test]
    fn page_renders_every_section() {
        let a = analysis(&[10.0, 11.0, 12.0, 13.0, 12.0]);
        let html = render_stock_page(&Template::new(super::super::STOCK_TEMPLATE), &a, today())
            .unwrap();
        assert!(html.contains("<th scope=\"col\">2 Days</th>"));
        // The 10-day report only had 5 rows.
        assert!(html.contains("<th scope=\"col\">5 Days</th>"));
        assert!(html.contains("Average of last 3 days"));
        assert!(html.contains("1 to 3 days"));
        assert!(html.contains("<span class=\"color-red metric\">Red</span>"));
        assert!(html.contains("<td>3 Days</td>"));
        assert!(!html.contains("class=\"pe-section no_PE\""));
    }

    #[test]
    fn candle_mix_has_year_and_quarter_tables() {
        // Jan 1 to Apr 9 2024: Q1 and Q2 buckets.
        let closes: Vec<f64> = (0..100).map(|i| 50.0 + f64::from(i % 7)).collect();
        let a = analysis(&closes);
        let html = render_stock_page(&Template::new(super::super::STOCK_TEMPLATE), &a, today())
            .unwrap();
        assert!(html.contains("<h3>Candles by Quarter</h3>"));
        assert!(html.contains("<td>2024-Q1</td>"));
        assert!(html.contains("<td>2024-Q2</td>"));
        assert!(html.contains("<td>2024</td>"));

        let q2 = &a.metrics.candles.by_quarter[1];
        let rows = candle_mix_rows(&a.metrics.candles.by_quarter);
        assert!(rows.contains(&format!(
            "<td>2024-Q2</td>\n<td>{}</td>\n<td>{}</td>",
            q2.green, q2.red
        )));
    }

    #[test]
    fn distribution_rows_cover_both_colors() {
        let a = analysis(&[10.0, 11.0, 12.0, 13.0, 12.0]);
        let rows = streak_distribution_rows(&a);
        // Green run of 4, red run of 1.
        assert!(rows.contains("<td>1</td>\n<td>0</td>\n<td>1</td>"));
        assert!(rows.contains("<td>4</td>\n<td>1</td>\n<td>0</td>"));
    }
}
