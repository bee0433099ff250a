use std::{fmt::Display, num::NonZero};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, price_window::RangeWindow,
};

/// Configuration for the [`RangePosition`] indicator.
///
/// # Example
///
/// ```
/// use quantedge_screen::{IndicatorConfig, RangePositionConfig};
/// use std::num::NonZero;
///
/// let config = RangePositionConfig::close(NonZero::new(20).unwrap());
/// assert_eq!(config.length(), 20);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct RangePositionConfig {
    length: usize,
}

impl IndicatorConfig for RangePositionConfig {
    type Builder = RangePositionConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        RangePositionConfigBuilder::new()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl RangePositionConfig {
    /// Range position over `length` closing prices.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }
}

impl Display for RangePositionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RangePositionConfig({})", self.length)
    }
}

/// Builder for [`RangePositionConfig`].
///
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct RangePositionConfigBuilder {
    length: Option<usize>,
}

impl RangePositionConfigBuilder {
    fn new() -> Self {
        Self { length: None }
    }
}

impl IndicatorConfigBuilder<RangePositionConfig> for RangePositionConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    #[inline]
    fn build(self) -> RangePositionConfig {
        RangePositionConfig {
            length: self.length.expect("length is required"),
        }
    }
}

/// Normalized range position.
///
/// Where the latest close sits inside the rolling low/high of the last *n*
/// closes, scaled to `[0, 100]`:
///
/// ```text
/// value = (close − low) / (high − low) × 100
/// ```
///
/// The value is exactly `100` when the close is the window maximum and exactly
/// `0` when it is the minimum. A flat window (`high == low`) has no defined
/// position and yields `None`.
#[derive(Clone, Debug)]
pub struct RangePosition {
    config: RangePositionConfig,
    window: RangeWindow,
    current: Option<f64>,
}

impl Indicator for RangePosition {
    type Config = RangePositionConfig;
    type Output = f64;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            window: RangeWindow::new(config.length),
            current: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<f64> {
        self.window.add(ohlcv);

        self.current = self
            .window
            .bounds()
            .and_then(|(low, high)| position(ohlcv.close(), low, high));

        self.current
    }

    #[inline]
    fn value(&self) -> Option<f64> {
        self.current
    }
}

#[inline]
#[allow(clippy::float_cmp)]
fn position(close: Price, low: Price, high: Price) -> Option<f64> {
    if high == low {
        return None;
    }
    Some((close - low) / (high - low) * 100.0)
}

impl Display for RangePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RANGE({})", self.config.length)
    }
}
