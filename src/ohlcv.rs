use serde::{Deserialize, Serialize};

/// A price value.
///
/// Semantic alias for [`f64`]. Documents intent in function signatures
/// without introducing newtype construction overhead.
pub type Price = f64;

/// Bar open timestamp in milliseconds since the Unix epoch.
///
/// Must be strictly increasing between consecutive bars of a
/// [`PriceSeries`](crate::PriceSeries).
pub type Timestamp = u64;

/// OHLCV bar data used as input to all indicators.
///
/// Implement this on your own kline/candle type to feed indicators directly.
/// Indicators accept `&impl Ohlcv` and read the close price.
///
/// # Example
///
/// ```
/// use quantedge_screen::{Ohlcv, Price, Timestamp};
///
/// struct MyKline {
///     o: f64, h: f64, l: f64, c: f64,
///     ts: u64,
/// }
///
/// impl Ohlcv for MyKline {
///     fn open(&self) -> Price { self.o }
///     fn high(&self) -> Price { self.h }
///     fn low(&self) -> Price { self.l }
///     fn close(&self) -> Price { self.c }
///     fn open_time(&self) -> Timestamp { self.ts }
/// }
/// ```
pub trait Ohlcv {
    /// Opening price of the bar.
    fn open(&self) -> Price;

    /// Highest price during the bar.
    fn high(&self) -> Price;

    /// Lowest price during the bar.
    fn low(&self) -> Price;

    /// Closing price of the bar.
    fn close(&self) -> Price;

    /// Bar open timestamp.
    fn open_time(&self) -> Timestamp;

    /// Trade volume during the bar. Defaults to `0.0`.
    fn volume(&self) -> f64 {
        0.0
    }
}

/// A single historical bar as delivered by a
/// [`SeriesStore`](crate::SeriesStore).
///
/// Only `close` is mandatory. Missing open/high/low fall back to the close
/// when read through [`Ohlcv`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub open_time: Timestamp,
    #[serde(default)]
    pub open: Option<Price>,
    #[serde(default)]
    pub high: Option<Price>,
    #[serde(default)]
    pub low: Option<Price>,
    pub close: Price,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl PriceBar {
    /// Full OHLC bar without volume.
    #[must_use]
    pub fn new(open_time: Timestamp, open: Price, high: Price, low: Price, close: Price) -> Self {
        Self {
            open_time,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close,
            volume: None,
        }
    }

    /// Bar carrying only a close price.
    #[must_use]
    pub fn close_only(open_time: Timestamp, close: Price) -> Self {
        Self {
            open_time,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    #[must_use]
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl Ohlcv for PriceBar {
    fn open(&self) -> Price {
        self.open.unwrap_or(self.close)
    }

    fn high(&self) -> Price {
        self.high.unwrap_or(self.close)
    }

    fn low(&self) -> Price {
        self.low.unwrap_or(self.close)
    }

    fn close(&self) -> Price {
        self.close
    }

    fn open_time(&self) -> Timestamp {
        self.open_time
    }

    fn volume(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn close_only_falls_back_to_close() {
        let bar = PriceBar::close_only(1, 42.0);
        assert_eq!(bar.open(), 42.0);
        assert_eq!(bar.high(), 42.0);
        assert_eq!(bar.low(), 42.0);
        assert_eq!(bar.volume(), 0.0);
    }

    #[test]
    fn full_bar_reports_own_fields() {
        let bar = PriceBar::new(7, 10.0, 30.0, 5.0, 20.0).with_volume(1_000.0);
        assert_eq!(bar.open(), 10.0);
        assert_eq!(bar.high(), 30.0);
        assert_eq!(bar.low(), 5.0);
        assert_eq!(bar.close(), 20.0);
        assert_eq!(bar.open_time(), 7);
        assert_eq!(bar.volume(), 1_000.0);
    }
}
