use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    num::NonZero,
};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, price_window::PriceWindow,
};

/// Standard deviation multiplier for Bollinger Bands.
///
/// Wraps a positive, non-NaN `f64`. The constructor panics if the value is
/// zero, negative, or NaN.
///
/// Defaults to `2.0` (the standard Bollinger Bands setting).
///
/// Implements `Eq` and `Hash` via bit-level comparison, which is safe because
/// NaN is rejected at construction.
#[derive(Clone, Copy, Debug)]
pub struct StdDev(f64);

impl StdDev {
    /// Creates a new standard deviation multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `value` is zero, negative, or NaN.
    #[must_use]
    pub fn new(value: f64) -> Self {
        assert!(!value.is_nan(), "std_dev must not be NaN");
        assert!(value > 0.0, "std_dev must be positive");
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for StdDev {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for StdDev {}

impl Hash for StdDev {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Default for StdDev {
    fn default() -> Self {
        Self(2.0)
    }
}

/// Which standard deviation the bands are built from.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub enum Deviation {
    /// Divide by `n`. The classic Bollinger definition.
    #[default]
    Population,
    /// Divide by `n − 1`, as spreadsheet and dataframe rolling `std` do.
    /// Undefined for a window of one bar.
    Sample,
}

impl Display for Deviation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Configuration for the Bollinger Bands ([`Bb`]) indicator.
///
/// # Example
///
/// ```
/// use quantedge_screen::{BbConfig, Deviation, IndicatorConfig, IndicatorConfigBuilder};
/// use std::num::NonZero;
///
/// // length 20, 2.0 std devs, sample deviation
/// let config = BbConfig::builder()
///     .length(NonZero::new(20).unwrap())
///     .deviation(Deviation::Sample)
///     .build();
///
/// assert_eq!(config.length(), 20);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct BbConfig {
    length: usize,
    std_dev: StdDev,
    deviation: Deviation,
}

impl IndicatorConfig for BbConfig {
    type Builder = BbConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        BbConfigBuilder::new()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl BbConfig {
    /// Standard deviation multiplier for the upper and lower bands.
    #[inline]
    #[must_use]
    pub fn std_dev(&self) -> StdDev {
        self.std_dev
    }

    #[inline]
    #[must_use]
    pub fn deviation(&self) -> Deviation {
        self.deviation
    }

    /// BB with custom length on close, 2σ, population deviation.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }
}

impl Display for BbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BbConfig({}, {}, {})",
            self.length,
            self.std_dev.value(),
            self.deviation
        )
    }
}

/// Builder for [`BbConfig`].
///
/// Defaults: `std_dev` = `2.0`, deviation = [`Deviation::Population`].
/// Length must be set before calling
/// [`build`](IndicatorConfigBuilder::build).
pub struct BbConfigBuilder {
    length: Option<usize>,
    std_dev: StdDev,
    deviation: Deviation,
}

impl BbConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            std_dev: StdDev::default(),
            deviation: Deviation::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn std_dev(mut self, std_dev: StdDev) -> Self {
        self.std_dev = std_dev;
        self
    }

    #[inline]
    #[must_use]
    pub fn deviation(mut self, deviation: Deviation) -> Self {
        self.deviation = deviation;
        self
    }
}

impl IndicatorConfigBuilder<BbConfig> for BbConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    #[inline]
    fn build(self) -> BbConfig {
        BbConfig {
            length: self.length.expect("length is required"),
            std_dev: self.std_dev,
            deviation: self.deviation,
        }
    }
}

/// Bollinger Bands output: upper, middle, and lower bands.
///
/// ```text
/// upper  = SMA + k × σ
/// middle = SMA
/// lower  = SMA − k × σ
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BbValue {
    upper: Price,
    middle: Price,
    lower: Price,
}

impl BbValue {
    #[inline]
    #[must_use]
    pub fn upper(&self) -> Price {
        self.upper
    }

    #[inline]
    #[must_use]
    pub fn middle(&self) -> Price {
        self.middle
    }

    #[inline]
    #[must_use]
    pub fn lower(&self) -> Price {
        self.lower
    }

    /// Band width: `upper − lower`.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Band width relative to the middle band, in percent:
    /// `(upper − lower) / middle × 100`.
    ///
    /// Narrow width indicates consolidation (a squeeze). `None` when the
    /// middle band is zero.
    #[inline]
    #[must_use]
    pub fn width_percent(&self) -> Option<f64> {
        let pct = self.width() / self.middle * 100.0;
        pct.is_finite().then_some(pct)
    }
}

impl Display for BbValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BB(u: {}, m: {}, l: {})",
            self.upper, self.middle, self.lower
        )
    }
}

/// Bollinger Bands (BB).
///
/// A simple moving average (middle) with upper and lower bands offset by a
/// configurable number of standard deviations.
///
/// Uses a running sum and sum of squares for O(1) updates per bar.
#[derive(Clone, Debug)]
pub struct Bb {
    config: BbConfig,
    length_reciprocal: f64,
    /// `1 / (n − ddof)`; `None` when the deviation is undefined (sample, n = 1).
    variance_reciprocal: Option<f64>,
    std_dev_multiplier: f64,
    window: PriceWindow,
    current: Option<BbValue>,
}

impl Indicator for Bb {
    type Config = BbConfig;
    type Output = BbValue;

    #[allow(clippy::cast_precision_loss)]
    fn new(config: Self::Config) -> Self {
        let divisor = match config.deviation {
            Deviation::Population => config.length,
            Deviation::Sample => config.length - 1,
        };

        Self {
            config,
            length_reciprocal: 1.0 / config.length as f64,
            variance_reciprocal: (divisor > 0).then(|| 1.0 / divisor as f64),
            std_dev_multiplier: config.std_dev.0,
            window: PriceWindow::new(config.length),
            current: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<Self::Output> {
        self.window.add(ohlcv);

        self.current = match (
            self.window.sum(),
            self.window.sum_of_squares(),
            self.variance_reciprocal,
        ) {
            (Some(sum), Some(sum_of_squares), Some(variance_reciprocal)) => {
                let mean = sum * self.length_reciprocal;

                // Σ(x − mean)² = Σx² − mean·Σx
                let squared_deviations = sum.mul_add(-mean, sum_of_squares);
                let variance = squared_deviations * variance_reciprocal;
                let offset = variance.max(0.0).sqrt() * self.std_dev_multiplier;

                Some(BbValue {
                    upper: mean + offset,
                    middle: mean,
                    lower: mean - offset,
                })
            }
            _ => None,
        };

        self.current
    }

    #[inline]
    fn value(&self) -> Option<Self::Output> {
        self.current
    }
}

impl Display for Bb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BB({}, {}, {})",
            self.config.length, self.std_dev_multiplier, self.config.deviation
        )
    }
}
