use std::{fmt::Display, num::NonZero, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Bbwp, BbwpConfig, Indicator, IndicatorConfig, IndicatorConfigBuilder, IndicatorPoint,
    IndicatorSeries, Ohlcv, PriceSeries, RangePosition, RangePositionConfig, StdDev,
    bbwp::DEFAULT_LOOKBACK,
};

/// Which bounded statistic the engine computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Position of the close inside the rolling low/high, see [`RangePosition`].
    NormalizedRange,
    /// Percentile of the Bollinger band width, see [`Bbwp`].
    #[default]
    PercentileBbw,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NormalizedRange => "normalized-range",
            Self::PercentileBbw => "percentile-bbw",
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normalized-range" | "range" => Ok(Self::NormalizedRange),
            "percentile-bbw" | "bbwp" => Ok(Self::PercentileBbw),
            other => Err(format!(
                "unknown mode `{other}`, expected `normalized-range` or `percentile-bbw`"
            )),
        }
    }
}

/// Maps a [`PriceSeries`] to an aligned [`IndicatorSeries`].
///
/// Pure: the same series always yields the same output, and nothing is
/// retained between calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorEngine {
    mode: Mode,
    window: NonZero<usize>,
    std_dev: StdDev,
    lookback: NonZero<usize>,
}

impl IndicatorEngine {
    /// Engine with 2σ bands and a 252-bar percentile lookback.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn new(mode: Mode, window: NonZero<usize>) -> Self {
        Self {
            mode,
            window,
            std_dev: StdDev::default(),
            lookback: NonZero::new(DEFAULT_LOOKBACK).expect("non-zero default lookback"),
        }
    }

    #[must_use]
    pub fn with_std_dev(mut self, std_dev: StdDev) -> Self {
        self.std_dev = std_dev;
        self
    }

    /// Percentile lookback, ignored in [`Mode::NormalizedRange`].
    #[must_use]
    pub fn with_lookback(mut self, lookback: NonZero<usize>) -> Self {
        self.lookback = lookback;
        self
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window.get()
    }

    /// Bars needed before the first value can be defined.
    #[must_use]
    pub fn warm_up(&self) -> usize {
        match self.mode {
            Mode::NormalizedRange => self.window.get(),
            Mode::PercentileBbw => self.bbwp_config().warm_up(),
        }
    }

    /// Computes the indicator for every bar in `series`.
    ///
    /// Series shorter than [`warm_up`](Self::warm_up) produce an entirely
    /// undefined output rather than an error.
    #[must_use]
    pub fn compute(&self, series: &PriceSeries) -> IndicatorSeries {
        match self.mode {
            Mode::NormalizedRange => run(
                RangePosition::new(RangePositionConfig::close(self.window)),
                series,
            ),
            Mode::PercentileBbw => run(Bbwp::new(self.bbwp_config()), series),
        }
    }

    fn bbwp_config(&self) -> BbwpConfig {
        BbwpConfig::builder()
            .length(self.window)
            .std_dev(self.std_dev)
            .lookback(self.lookback)
            .build()
    }
}

fn run<I>(mut indicator: I, series: &PriceSeries) -> IndicatorSeries
where
    I: Indicator<Output = f64>,
{
    series
        .bars()
        .iter()
        .map(|bar| IndicatorPoint {
            open_time: bar.open_time(),
            value: indicator.compute(bar),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::test_util::close_series;

    fn nz(n: usize) -> NonZero<usize> {
        NonZero::new(n).unwrap()
    }

    mod normalized_range {
        use super::*;

        fn engine() -> IndicatorEngine {
            IndicatorEngine::new(Mode::NormalizedRange, nz(20))
        }

        #[test]
        fn output_is_aligned_with_input() {
            let series = close_series(&[1.0, 2.0, 3.0]);
            let out = engine().compute(&series);
            assert_eq!(out.len(), series.len());
            for (point, bar) in out.points().iter().zip(series.bars()) {
                assert_eq!(point.open_time, bar.open_time);
            }
        }

        #[test]
        fn increasing_25_bars_is_100_once_defined() {
            let closes: Vec<f64> = (1..=25).map(f64::from).collect();
            let out = engine().compute(&close_series(&closes));

            assert_eq!(out.defined_count(), 6);
            assert!(out.points()[..19].iter().all(|p| p.value.is_none()));
            assert!(out.points()[19..].iter().all(|p| p.value == Some(100.0)));
        }

        #[test]
        fn identical_25_bars_is_undefined() {
            let out = engine().compute(&close_series(&[50.0; 25]));
            assert!(out.is_undefined());
        }

        #[test]
        fn shorter_than_window_is_undefined() {
            let closes: Vec<f64> = (1..=19).map(f64::from).collect();
            let out = engine().compute(&close_series(&closes));
            assert_eq!(out.len(), 19);
            assert!(out.is_undefined());
        }

        #[test]
        fn empty_series() {
            let out = engine().compute(&PriceSeries::default());
            assert!(out.is_empty());
        }
    }

    mod percentile_bbw {
        use super::*;

        #[test]
        fn needs_window_plus_lookback_bars() {
            let engine = IndicatorEngine::new(Mode::PercentileBbw, nz(3)).with_lookback(nz(4));
            assert_eq!(engine.warm_up(), 6);

            let closes = [10.0, 11.0, 13.0, 12.0, 15.0, 14.0];
            let out = engine.compute(&close_series(&closes));
            assert_eq!(out.defined_count(), 1);
            assert!(out.latest().is_some());
        }

        #[test]
        fn default_lookback_leaves_short_series_undefined() {
            let closes: Vec<f64> = (0..252).map(|i| 100.0 + f64::from(i % 5)).collect();
            let out =
                IndicatorEngine::new(Mode::PercentileBbw, nz(20)).compute(&close_series(&closes));
            assert!(out.is_undefined());
        }

        #[test]
        fn values_are_bounded() {
            let closes: Vec<f64> = (0..400)
                .map(|i| 100.0 + (f64::from(i) / 9.0).sin() * f64::from(i % 13))
                .collect();
            let out =
                IndicatorEngine::new(Mode::PercentileBbw, nz(20)).compute(&close_series(&closes));
            assert!(out.defined_count() > 0);
            for v in out.values().flatten() {
                assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    mod mode {
        use super::*;

        #[test]
        fn parses_names_and_aliases() {
            assert_eq!("normalized-range".parse::<Mode>(), Ok(Mode::NormalizedRange));
            assert_eq!("bbwp".parse::<Mode>(), Ok(Mode::PercentileBbw));
            assert!("rsi".parse::<Mode>().is_err());
        }

        #[test]
        fn display_round_trips() {
            for mode in [Mode::NormalizedRange, Mode::PercentileBbw] {
                assert_eq!(mode.to_string().parse::<Mode>(), Ok(mode));
            }
        }
    }
}
