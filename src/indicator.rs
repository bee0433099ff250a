use crate::Ohlcv;

use std::{
    fmt::{Debug, Display},
    hash::Hash,
    num::NonZero,
};

/// Configuration for a technical [`Indicator`].
///
/// Every indicator has a corresponding config type that holds its parameters.
/// Configs are value types: cheap to clone, compare, and hash.
pub trait IndicatorConfig: Sized + PartialEq + Eq + Hash + Display + Debug {
    /// Builder type for constructing this config.
    type Builder: IndicatorConfigBuilder<Self>;

    /// Returns a new builder with default values.
    fn builder() -> Self::Builder;

    /// Rolling window length (number of bars).
    fn length(&self) -> usize;
}

/// Builder for an [`IndicatorConfig`].
pub trait IndicatorConfigBuilder<Config>
where
    Config: IndicatorConfig,
{
    /// Sets the rolling window length.
    #[must_use]
    fn length(self, length: NonZero<usize>) -> Self;

    /// Builds the config. Panics if required fields are missing.
    #[must_use]
    fn build(self) -> Config;
}

/// A rolling technical indicator fed one bar at a time.
///
/// Output is `None` until enough bars have been received, and also at any bar
/// where the value is mathematically undefined (for example a zero price
/// range). Undefined is never signalled through NaN.
///
/// # Example
///
/// ```
/// use quantedge_screen::{Indicator, RangePosition, RangePositionConfig};
/// use std::num::NonZero;
/// # use quantedge_screen::{Ohlcv, Price, Timestamp};
/// #
/// # struct Bar(f64, u64);
/// # impl Ohlcv for Bar {
/// #     fn open(&self) -> Price { self.0 }
/// #     fn high(&self) -> Price { self.0 }
/// #     fn low(&self) -> Price { self.0 }
/// #     fn close(&self) -> Price { self.0 }
/// #     fn open_time(&self) -> Timestamp { self.1 }
/// # }
///
/// let mut range = RangePosition::new(RangePositionConfig::close(NonZero::new(3).unwrap()));
///
/// assert_eq!(range.compute(&Bar(10.0, 1)), None);
/// assert_eq!(range.compute(&Bar(20.0, 2)), None);
/// assert_eq!(range.compute(&Bar(15.0, 3)), Some(50.0));
/// ```
pub trait Indicator: Sized + Clone + Display + Debug {
    /// Configuration type for this indicator.
    type Config: IndicatorConfig;

    /// Computed output type. `f64` for bounded statistics,
    /// a struct for composite ones (e.g. Bollinger Bands).
    type Output: Send + Sync + Display + Debug;

    /// Creates a new indicator from the given config.
    fn new(config: Self::Config) -> Self;

    /// Feeds the next bar and returns the value at that bar,
    /// or `None` if undefined there.
    fn compute(&mut self, kline: &impl Ohlcv) -> Option<Self::Output>;

    /// Returns the last computed value without advancing state.
    fn value(&self) -> Option<Self::Output>;
}
