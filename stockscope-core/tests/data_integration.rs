//! Integration tests for the load pipeline: exchange CSVs on disk ->
//! consolidated series -> Parquet cache.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use stockscope_core::data::{consolidate, ConsolidatedCache, DataError};
use stockscope_core::indicators::TrendStrength;
use stockscope_core::{FeatureConfig, FeatureEngine};

const HEADER: &str = "Date ,series ,OPEN ,HIGH ,LOW ,PREV. CLOSE ,ltp ,close ,vwap ,52W H ,52W L ,VOLUME ,VALUE ,No of trades \n";

fn row(date: &str, prev: f64, close: f64) -> String {
    format!(
        "{date},EQ,{prev},{high},{low},{prev},{close},{close},{close},{high},{low},\"1,000\",\"{value}\",10\n",
        high = close.max(prev) + 1.0,
        low = close.min(prev) - 1.0,
        value = close * 1000.0,
    )
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Two yearly files (newest first inside each, overlapping on one date),
/// an EPS file and a 1:2 split in January 2024.
fn fixture(root: &Path) {
    let nse = root.join("nse");
    let company = root.join("company");

    let mut y2023 = HEADER.to_string();
    y2023.push_str(&row("29-Dec-2023", 198.0, 200.0));
    y2023.push_str(&row("28-Dec-2023", 196.0, 198.0));
    write(
        &nse.join("ACME/Quote-Equity-ACME-EQ-01-01-2023-31-12-2023.csv"),
        &y2023,
    );

    let mut y2024 = HEADER.to_string();
    y2024.push_str(&row("03-Jan-2024", 101.0, 102.0));
    y2024.push_str(&row("02-Jan-2024", 200.0, 101.0));
    y2024.push_str(&row("29-Dec-2023", 198.0, 999.0));
    write(
        &nse.join("ACME/Quote-Equity-ACME-EQ-01-01-2024-03-01-2024.csv"),
        &y2024,
    );

    write(
        &company.join("ACME.csv"),
        "FirstDateAfterFYReport,EPS\n15-12-2023,10\n",
    );
    write(
        &company.join("ACME_splits.csv"),
        "ExDate,Multiplier\n02-01-2024,2\n",
    );
}

#[test]
fn consolidates_merges_adjusts_and_caches() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());
    let nse = dir.path().join("nse");
    let company = dir.path().join("company");

    let series = consolidate::consolidate("ACME", &nse, &company).unwrap();
    let bars = series.bars();

    let dates: Vec<NaiveDate> = series.dates();
    assert_eq!(
        dates,
        vec![d(2023, 12, 28), d(2023, 12, 29), d(2024, 1, 2), d(2024, 1, 3)]
    );
    // Duplicate 29-Dec row: the 2023 file sorts first and wins.
    assert_eq!(bars[1].close, 100.0);
    assert_eq!(bars[1].adjustment, 2.0);
    assert_eq!(bars[1].volume, 2_000);
    // PE is computed on the unadjusted close.
    assert_eq!(bars[1].pe, Some(20.0));
    assert_eq!(bars[2].pe, Some(10.1));
    assert_eq!(bars[2].adjustment, 1.0);
    assert!(series.has_pe());

    let cache = ConsolidatedCache::new(&nse);
    cache.write(&series).unwrap();
    let reloaded = cache.load("ACME").unwrap();
    assert_eq!(reloaded.bars(), series.bars());
    assert!(reloaded.has_pe());
}

#[test]
fn missing_symbol_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = consolidate::consolidate("GHOST", dir.path(), dir.path()).unwrap_err();
    assert!(matches!(err, DataError::NoSourceFiles { .. }));
}

#[test]
fn header_only_files_give_empty_series_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("EMPTY/Quote-Equity-EMPTY-EQ-01-01-2024-31-12-2024.csv"),
        HEADER,
    );
    let err = consolidate::consolidate("EMPTY", dir.path(), dir.path()).unwrap_err();
    assert!(matches!(err, DataError::Series(_)));
}

#[test]
fn dash_close_row_is_dropped_before_features() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = HEADER.to_string();
    let start = d(2024, 1, 1);
    for i in 0..40u32 {
        let date = (start + chrono::Duration::days(i64::from(i)))
            .format("%d-%b-%Y")
            .to_string();
        let close = 100.0 + f64::from(i) * 1.5;
        if i == 5 {
            csv.push_str(&format!(
                "{date},EQ,{prev},{high},{low},{prev},-,-,-,{high},{low},\"1,000\",-,10\n",
                prev = close - 1.5,
                high = close + 1.0,
                low = close - 3.0,
            ));
        } else {
            csv.push_str(&row(&date, close - 1.5, close));
        }
    }
    write(
        &dir.path().join("GAPCO/Quote-Equity-GAPCO-EQ-01-01-2024-09-02-2024.csv"),
        &csv,
    );

    let series = consolidate::consolidate("GAPCO", dir.path(), dir.path()).unwrap();
    assert_eq!(series.len(), 39);
    assert!(series.bars().iter().all(|b| !b.is_void()));
    assert!(series.bars().iter().all(|b| b.date != d(2024, 1, 6)));

    let config = FeatureConfig {
        rank_trend_stacks: vec![vec![1, 2, 3]],
        ..FeatureConfig::default()
    };
    let analysis = FeatureEngine::new(config).unwrap().analyze(&series);
    let ma = analysis.table.columns.last("ma_15").unwrap();
    assert!(ma.is_finite());
    let trend = &analysis.metrics.rank_trends[0];
    assert!((trend.value - 1.0).abs() < 1e-12);
    assert_eq!(trend.strength, TrendStrength::Strong);
}
