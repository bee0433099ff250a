// src/test_util.rs

use crate::{Ohlcv, Price, PriceBar, PriceSeries, Timestamp};

/// Asserts that two `f64` values are approximately equal using a
/// relative epsilon of `4 * f64::EPSILON`.
macro_rules! assert_approx {
    ($actual:expr, $expected:expr) => {{
        let (a, e) = ($actual, $expected);
        assert!(
            (a - e).abs() <= e.abs() * 4.0 * f64::EPSILON,
            "assert_approx failed: actual={a}, expected={e}, diff={}",
            (a - e).abs(),
        );
    }};
}

pub(crate) use assert_approx;

pub struct Bar {
    pub close: f64,
    pub open_time: u64,
}

/// Bar with just a close price and timestamp (OHLC all equal to close).
pub fn bar(close: f64, time: u64) -> Bar {
    Bar {
        close,
        open_time: time,
    }
}

impl Ohlcv for Bar {
    fn open(&self) -> Price {
        self.close
    }
    fn high(&self) -> Price {
        self.close
    }
    fn low(&self) -> Price {
        self.close
    }
    fn close(&self) -> Price {
        self.close
    }
    fn open_time(&self) -> Timestamp {
        self.open_time
    }
}

/// Close-only series stamped `1..=n`.
pub fn close_series(closes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .zip(1..)
        .map(|(&close, t)| PriceBar::close_only(t, close))
        .collect();
    PriceSeries::new(bars).unwrap()
}
