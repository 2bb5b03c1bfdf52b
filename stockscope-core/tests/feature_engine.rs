//! End-to-end checks of the feature engine on small hand-built series.

use chrono::NaiveDate;
use stockscope_core::correlation::{correlation_report, CorrelationConfig};
use stockscope_core::features::HighlightKind;
use stockscope_core::indicators::{spearman_over_ma, TrendStrength};
use stockscope_core::{DailyBar, FeatureConfig, FeatureEngine, SeriesError, StockSeries};

fn series(symbol: &str, closes: &[f64]) -> StockSeries {
    let base = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let prev_close = if i == 0 { close } else { closes[i - 1] };
            DailyBar {
                date: base + chrono::Duration::days(i as i64),
                open: prev_close,
                high: close.max(prev_close) + 1.0,
                low: close.min(prev_close) - 1.0,
                close,
                prev_close,
                ltp: close,
                vwap: close,
                week52_high: close,
                week52_low: close,
                volume: 1_000,
                turnover_value: close * 1_000.0,
                num_trades: 10,
                pe: None,
                adjustment: 1.0,
            }
        })
        .collect();
    StockSeries::new(symbol, bars, false).unwrap()
}

#[test]
fn rank_trend_of_rising_series_ends_at_one() {
    let x: Vec<f64> = (1..=10).map(f64::from).collect();
    let rho = spearman_over_ma(&x, &[1, 2, 3], 0.0);
    assert!((rho[9] - 1.0).abs() < 1e-12);
    assert_eq!(TrendStrength::from_rho(rho[9]), TrendStrength::Strong);
}

#[test]
fn flat_series_rank_trend_is_default_everywhere() {
    let config = FeatureConfig {
        rank_trend_stacks: vec![vec![1, 2, 3]],
        ..FeatureConfig::default()
    };
    let engine = FeatureEngine::new(config).unwrap();
    let analysis = engine.analyze(&series("FLAT", &[101.35; 60]));
    let values = analysis
        .table
        .columns
        .get_series("rank_trend_1_3")
        .unwrap();
    assert_eq!(values, &[0.0; 60]);
    assert_eq!(analysis.metrics.rank_trends[0].strength, TrendStrength::Neutral);
}

#[test]
fn three_bars_with_long_window() {
    let config = FeatureConfig {
        performance_windows: vec![200],
        ..FeatureConfig::default()
    };
    let engine = FeatureEngine::new(config).unwrap();
    let analysis = engine.analyze(&series("SHORT", &[10.0, 11.0, 12.0]));
    let report = &analysis.performance[0];
    assert_eq!(report.requested_window, 200);
    assert_eq!(report.period_size, 3);
    assert!((report.net_return - 0.2).abs() < 1e-12);
}

#[test]
fn increasing_series_is_its_own_first_hit() {
    let engine = FeatureEngine::new(FeatureConfig::default()).unwrap();
    let s = series("UP", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let analysis = engine.analyze(&s);
    for (hit, date) in analysis.table.hits.iter().zip(s.dates()) {
        assert_eq!(hit.total_hits, 1);
        assert_eq!(hit.first_hit, date);
    }
    assert_eq!(analysis.metrics.ath.pct_down, 0.0);
    assert_eq!(analysis.metrics.ath.last_new_high, s.last().date);
    assert!(analysis
        .highlights
        .iter()
        .any(|h| h.kind == HighlightKind::NearAllTimeHigh));
}

#[test]
fn continuation_is_zero_for_record_streak() {
    let engine = FeatureEngine::new(FeatureConfig::default()).unwrap();
    // Green runs: 2 then a final run of 4.
    let analysis = engine.analyze(&series(
        "RUN",
        &[10.0, 11.0, 10.0, 10.5, 11.0, 12.0, 13.0],
    ));
    let candles = &analysis.metrics.candles;
    assert!(candles.last_green);
    assert_eq!(candles.streak_length, 4);
    assert_eq!(candles.longest.length, 4);
    assert_eq!(candles.continuation_probability, 0.0);
}

#[test]
fn identical_series_correlate_perfectly() {
    let closes = [3.0, 4.0, 2.0, 6.0, 5.0, 7.0];
    let mut input = std::collections::BTreeMap::new();
    for symbol in ["ALPHA", "BETA"] {
        input.insert(symbol.to_string(), series(symbol, &closes).close_points());
    }
    input.insert(
        "GAMMA".to_string(),
        series("GAMMA", &[7.0, 1.0, 5.0, 2.0, 6.0, 1.0]).close_points(),
    );

    let report = correlation_report(&input, &CorrelationConfig::default());
    assert!((report.get("ALPHA", "BETA").unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(report.peers["ALPHA"].max_peer, "BETA");
    assert_eq!(report.peers["BETA"].max_peer, "ALPHA");
}

#[test]
fn empty_series_never_reaches_the_engine() {
    let err = StockSeries::new("NONE", Vec::new(), false).unwrap_err();
    assert_eq!(
        err,
        SeriesError::EmptySeries {
            symbol: "NONE".into()
        }
    );
}
