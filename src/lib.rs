//! Volatility-compression screening over a universe of symbols.
//!
//! Two bounded `[0, 100]` statistics are computed bar by bar: the position of
//! the close inside its rolling range ([`RangePosition`]) and the Bollinger
//! Band Width Percentile ([`Bbwp`]). A [`Screener`] counts how many of the
//! trailing values sit below a threshold, and a [`BatchRunner`] applies that
//! to every symbol a [`SeriesStore`] can serve.
//!
//! Indicators accept any type implementing [`Ohlcv`]. Values are `None`
//! until enough data has been received, and wherever the statistic is
//! undefined. Each indicator type exposes [`new`](Bbwp::new),
//! [`compute`](Bbwp::compute), and [`value`](Bbwp::value) as inherent
//! methods, so no trait import is needed outside generic code.
//!
//! ```
//! use quantedge_screen::{BatchRunner, MemoryStore, ScreenConfig};
//!
//! let mut store = MemoryStore::new();
//! let closes: Vec<f64> = (0..300).map(|i| 100.0 + f64::from(i % 7)).collect();
//! store.insert_closes("KO", &closes).unwrap();
//!
//! let config = ScreenConfig {
//!     universe: vec!["KO".into()],
//!     ..ScreenConfig::default()
//! };
//! let report = BatchRunner::new(store, &config).unwrap().run(&config.universe);
//!
//! assert_eq!(report.summary.total, 1);
//! ```

mod bb;
mod bbwp;
mod cache;
mod config;
mod csv_store;
mod engine;
mod error;
mod export;
mod indicator;
mod ohlcv;
mod price_window;
mod range_position;
mod ring_buffer;
mod runner;
mod screener;
mod series;
mod store;

pub use crate::error::{ConfigError, ExportError, ScreenError, SeriesError, StoreError};
pub use crate::indicator::{Indicator, IndicatorConfig, IndicatorConfigBuilder};
pub use crate::ohlcv::{Ohlcv, Price, PriceBar, Timestamp};
pub use crate::series::{IndicatorPoint, IndicatorSeries, PriceSeries};

pub use crate::bb::{Bb, BbConfig, BbConfigBuilder, BbValue, Deviation, StdDev};
pub use crate::bbwp::{Bbwp, BbwpConfig, BbwpConfigBuilder, DEFAULT_LOOKBACK};
pub use crate::range_position::{RangePosition, RangePositionConfig, RangePositionConfigBuilder};

pub use crate::engine::{IndicatorEngine, Mode};
pub use crate::screener::{DEFAULT_THRESHOLD, DEFAULT_TRAILING_K, Screener, SymbolResult};

pub use crate::cache::{CachePolicy, CachedStore};
pub use crate::csv_store::CsvStore;
pub use crate::store::{Interval, MemoryStore, Period, SeriesRequest, SeriesStore};

pub use crate::config::{DEFAULT_UNIVERSE, ScreenConfig};
pub use crate::export::{
    ExportRecord, PeriodRecord, export_file_name, export_periods_to_dir, export_to_dir,
    period_file_name, write_period_rows, write_results,
};
pub use crate::runner::{
    BatchRunner, CancellationToken, Execution, NoSignalReason, RunStatus, RunSummary,
    ScreenReport, SymbolFailure, SymbolOutcome, screen_series,
};

macro_rules! impl_indicator_methods {
    ($type:ty, $config:ty, $output:ty) => {
        impl $type {
            /// See [`Indicator::new`].
            #[must_use]
            pub fn new(config: $config) -> Self {
                <Self as Indicator>::new(config)
            }

            /// See [`Indicator::compute`].
            #[inline]
            pub fn compute(&mut self, kline: &impl Ohlcv) -> Option<$output> {
                <Self as Indicator>::compute(self, kline)
            }

            /// See [`Indicator::value`].
            #[must_use]
            #[inline]
            pub fn value(&self) -> Option<$output> {
                <Self as Indicator>::value(self)
            }
        }
    };
}

impl_indicator_methods!(RangePosition, RangePositionConfig, f64);
impl_indicator_methods!(Bb, BbConfig, BbValue);
impl_indicator_methods!(Bbwp, BbwpConfig, f64);

#[cfg(test)]
mod test_util;
