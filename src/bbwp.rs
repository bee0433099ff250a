use std::{fmt::Display, num::NonZero};

use crate::{
    Bb, BbConfig, Deviation, Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, StdDev,
    ring_buffer::RingBuffer,
};

/// Default percentile lookback: one trading year of daily bars.
pub const DEFAULT_LOOKBACK: usize = 252;

/// Configuration for the Bollinger Band Width Percentile ([`Bbwp`]).
///
/// `length` is the Bollinger window; `lookback` is how many band-width values
/// the percentile is ranked against.
///
/// # Example
///
/// ```
/// use quantedge_screen::{BbwpConfig, IndicatorConfig};
/// use std::num::NonZero;
///
/// let config = BbwpConfig::close(NonZero::new(20).unwrap());
/// assert_eq!(config.length(), 20);
/// assert_eq!(config.lookback(), 252);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct BbwpConfig {
    bands: BbConfig,
    lookback: usize,
}

impl IndicatorConfig for BbwpConfig {
    type Builder = BbwpConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        BbwpConfigBuilder::new()
    }

    #[inline]
    fn length(&self) -> usize {
        self.bands.length()
    }
}

impl BbwpConfig {
    /// BBWP on close with a 252-bar lookback and 2σ sample bands.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    #[inline]
    #[must_use]
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Underlying band configuration (always [`Deviation::Sample`]).
    #[inline]
    #[must_use]
    pub fn bands(&self) -> BbConfig {
        self.bands
    }

    /// Bars needed before the first defined value.
    #[must_use]
    pub fn warm_up(&self) -> usize {
        self.bands.length() + self.lookback - 1
    }
}

impl Display for BbwpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BbwpConfig({}, {}, {})",
            self.bands.length(),
            self.bands.std_dev().value(),
            self.lookback
        )
    }
}

/// Builder for [`BbwpConfig`].
///
/// Defaults: `std_dev` = `2.0`, lookback = [`DEFAULT_LOOKBACK`].
pub struct BbwpConfigBuilder {
    length: Option<NonZero<usize>>,
    std_dev: StdDev,
    lookback: usize,
}

impl BbwpConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            std_dev: StdDev::default(),
            lookback: DEFAULT_LOOKBACK,
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
    pub fn lookback(mut self, lookback: NonZero<usize>) -> Self {
        self.lookback = lookback.get();
        self
    }
}

impl IndicatorConfigBuilder<BbwpConfig> for BbwpConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length);
        self
    }

    #[inline]
    fn build(self) -> BbwpConfig {
        let bands = BbConfig::builder()
            .length(self.length.expect("length is required"))
            .std_dev(self.std_dev)
            .deviation(Deviation::Sample)
            .build();

        BbwpConfig {
            bands,
            lookback: self.lookback,
        }
    }
}

/// Bollinger Band Width Percentile (BBWP).
///
/// Ranks the current band width (see [`BbValue::width_percent`]) against the
/// trailing `lookback` widths, including itself:
///
/// ```text
/// BBWP = count(width_j ≤ width_now, j in last lookback bars) / lookback × 100
/// ```
///
/// Low readings flag volatility compression. The value is defined only when
/// every width in the lookback is defined, so the first value appears after
/// [`BbwpConfig::warm_up`] bars. It may reach exactly `100` and, since the
/// current width always counts itself, never drops below `100 / lookback`.
///
/// [`BbValue::width_percent`]: crate::BbValue::width_percent
#[derive(Clone, Debug)]
pub struct Bbwp {
    config: BbwpConfig,
    bands: Bb,
    widths: RingBuffer<Option<f64>>,
    /// Undefined widths currently held in `widths`.
    undefined: usize,
    current: Option<f64>,
}

impl Indicator for Bbwp {
    type Config = BbwpConfig;
    type Output = f64;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            bands: Bb::new(config.bands),
            widths: RingBuffer::new(config.lookback),
            undefined: 0,
            current: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<f64> {
        let width = self
            .bands
            .compute(ohlcv)
            .and_then(|value| value.width_percent());

        if width.is_none() {
            self.undefined += 1;
        }
        if let Some(None) = self.widths.push(width) {
            self.undefined -= 1;
        }

        self.current = match width {
            Some(width) if self.widths.is_ready() && self.undefined == 0 => {
                Some(self.percentile_of(width))
            }
            _ => None,
        };

        self.current
    }

    #[inline]
    fn value(&self) -> Option<f64> {
        self.current
    }
}

impl Bbwp {
    #[allow(clippy::cast_precision_loss)]
    fn percentile_of(&self, width: f64) -> f64 {
        let at_or_below = self
            .widths
            .iter()
            .flatten()
            .filter(|&w| w <= width)
            .count();

        at_or_below as f64 / self.config.lookback as f64 * 100.0
    }
}

impl Display for Bbwp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BBWP({}, {}, {})",
            self.config.bands.length(),
            self.config.bands.std_dev().value(),
            self.config.lookback
        )
    }
}
