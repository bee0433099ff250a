#![allow(dead_code)]

use std::path::Path;

use quantedge_screen::{PriceBar, PriceSeries};
use serde::{Deserialize, de::DeserializeOwned};

/// Reference value with timestamp.
#[derive(Debug, Deserialize)]
pub struct RefValue {
    pub open_time: u64,
    pub expected: f64,
}

/// 420 weekday daily bars starting 2023-01-02, calm over the last 40.
pub const SYNTHETIC_PATH: &str = "tests/fixtures/data/synthetic-1d.csv";

/// Load the synthetic daily OHLCV bars.
pub fn load_synthetic_bars() -> Vec<PriceBar> {
    load_records(SYNTHETIC_PATH, "invalid OHLCV record")
}

pub fn load_synthetic_series() -> PriceSeries {
    PriceSeries::new(load_synthetic_bars()).expect("synthetic bars are ordered")
}

/// Load single-value reference data.
pub fn load_ref_values(path: &str) -> Vec<RefValue> {
    load_records(path, "invalid reference record")
}

/// Copy the synthetic bars into `dir` as `<symbol>.csv`.
pub fn install_synthetic(dir: &Path, symbol: &str) {
    std::fs::copy(SYNTHETIC_PATH, dir.join(format!("{symbol}.csv")))
        .unwrap_or_else(|e| panic!("failed to copy fixture for {symbol}: {e}"));
}

/// Assert two f64 values are within tolerance.
pub fn assert_near(actual: f64, expected: f64, tolerance: f64, context: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "{context}: expected {expected:.10}, got {actual:.10}, diff {diff:.2e} > tolerance {tolerance:.2e}"
    );
}

fn load_records<D>(path: &str, expect_msg: &str) -> Vec<D>
where
    D: DeserializeOwned,
{
    let mut rdr =
        csv::Reader::from_path(path).unwrap_or_else(|e| panic!("failed to open {path}: {e}"));

    rdr.deserialize().map(|r| r.expect(expect_msg)).collect()
}
