//! Price-series retrieval.
//!
//! [`SeriesStore`] is the seam between the screening core and wherever bars
//! come from: a local CSV directory ([`CsvStore`](crate::CsvStore)), an
//! in-memory map ([`MemoryStore`]), or a remote market-data service. Stores
//! can be wrapped in [`CachedStore`](crate::CachedStore) to memoize fetches.

use std::{
    collections::HashMap,
    fmt::Display,
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{PriceBar, PriceSeries, StoreError};

/// How far back a fetch reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "3y")]
    ThreeYears,
    #[default]
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    const ALL: [Self; 9] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::ThreeYears,
        Self::FiveYears,
        Self::TenYears,
        Self::Max,
    ];

    /// Span in calendar months, `None` for [`Period::Max`].
    #[must_use]
    pub fn months(self) -> Option<u32> {
        match self {
            Self::OneMonth => Some(1),
            Self::ThreeMonths => Some(3),
            Self::SixMonths => Some(6),
            Self::OneYear => Some(12),
            Self::TwoYears => Some(24),
            Self::ThreeYears => Some(36),
            Self::FiveYears => Some(60),
            Self::TenYears => Some(120),
            Self::Max => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::ThreeYears => "3y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
            Self::Max => "max",
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown period `{s}`"))
    }
}

/// Bar sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
        })
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" | "daily" => Ok(Self::Daily),
            "1wk" | "weekly" => Ok(Self::Weekly),
            other => Err(format!("unknown interval `{other}`, expected `1d` or `1wk`")),
        }
    }
}

/// One fetch: which symbol, how far back, at what sampling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesRequest {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
    /// Upper bound on the fetch latency.
    pub timeout: Duration,
}

impl SeriesRequest {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn new(symbol: impl Into<String>, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            interval,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Source of historical bars.
///
/// A returned series is non-empty, sorted, and free of missing closes.
/// Implementations that block on I/O must bound each call by
/// [`SeriesRequest::timeout`] and report [`StoreError::Timeout`] past it.
pub trait SeriesStore: Send + Sync {
    /// Fetches the bars for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the symbol is unknown, the data is empty or
    /// malformed, or the fetch times out.
    fn fetch(&self, request: &SeriesRequest) -> Result<PriceSeries, StoreError>;
}

impl<S: SeriesStore + ?Sized> SeriesStore for &S {
    fn fetch(&self, request: &SeriesRequest) -> Result<PriceSeries, StoreError> {
        (**self).fetch(request)
    }
}

impl<S: SeriesStore + ?Sized> SeriesStore for Box<S> {
    fn fetch(&self, request: &SeriesRequest) -> Result<PriceSeries, StoreError> {
        (**self).fetch(request)
    }
}

/// Bars held in memory, keyed by symbol.
///
/// Serves every period and interval with the same bars.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    series: HashMap<String, PriceSeries>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the series for `symbol`.
    #[must_use]
    pub fn with_series(mut self, symbol: impl Into<String>, series: PriceSeries) -> Self {
        self.insert(symbol, series);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, series: PriceSeries) {
        self.series.insert(symbol.into(), series);
    }

    /// Convenience for close-only bars at timestamps `1..=n`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Series`] if a close is not finite.
    pub fn insert_closes(
        &mut self,
        symbol: impl Into<String>,
        closes: &[f64],
    ) -> Result<(), StoreError> {
        let bars = closes
            .iter()
            .zip(1..)
            .map(|(&close, t)| PriceBar::close_only(t, close))
            .collect();
        self.insert(symbol, PriceSeries::new(bars)?);
        Ok(())
    }
}

impl SeriesStore for MemoryStore {
    fn fetch(&self, request: &SeriesRequest) -> Result<PriceSeries, StoreError> {
        let series = self
            .series
            .get(&request.symbol)
            .ok_or_else(|| StoreError::Unavailable {
                symbol: request.symbol.clone(),
            })?;

        if series.is_empty() {
            return Err(StoreError::Empty {
                symbol: request.symbol.clone(),
            });
        }

        Ok(series.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod period {
        use super::*;

        #[test]
        fn parses_every_display_name() {
            for period in Period::ALL {
                assert_eq!(period.to_string().parse::<Period>(), Ok(period));
            }
        }

        #[test]
        fn rejects_unknown() {
            assert!("7y".parse::<Period>().is_err());
        }

        #[test]
        fn max_has_no_span() {
            assert_eq!(Period::Max.months(), None);
            assert_eq!(Period::FiveYears.months(), Some(60));
        }
    }

    mod interval {
        use super::*;

        #[test]
        fn parses_short_and_long_names() {
            assert_eq!("1wk".parse::<Interval>(), Ok(Interval::Weekly));
            assert_eq!("daily".parse::<Interval>(), Ok(Interval::Daily));
            assert!("1h".parse::<Interval>().is_err());
        }
    }

    mod memory_store {
        use super::*;

        fn request(symbol: &str) -> SeriesRequest {
            SeriesRequest::new(symbol, Period::Max, Interval::Daily)
        }

        #[test]
        fn returns_inserted_series() {
            let mut store = MemoryStore::new();
            store.insert_closes("AAPL", &[1.0, 2.0, 3.0]).unwrap();

            let series = store.fetch(&request("AAPL")).unwrap();
            assert_eq!(series.len(), 3);
            assert_eq!(series.last_open_time(), Some(3));
        }

        #[test]
        fn unknown_symbol_is_unavailable() {
            let err = MemoryStore::new().fetch(&request("MSFT")).unwrap_err();
            assert!(matches!(err, StoreError::Unavailable { symbol } if symbol == "MSFT"));
        }

        #[test]
        fn empty_series_is_reported() {
            let store = MemoryStore::new().with_series("EMPTY", PriceSeries::default());
            let err = store.fetch(&request("EMPTY")).unwrap_err();
            assert!(matches!(err, StoreError::Empty { .. }));
        }

        #[test]
        fn works_through_references_and_boxes() {
            let store = MemoryStore::new().with_series("A", crate::test_util::close_series(&[1.0]));
            let boxed: Box<dyn SeriesStore> = Box::new(store.clone());
            assert!((&store).fetch(&request("A")).is_ok());
            assert!(boxed.fetch(&request("A")).is_ok());
        }
    }
}
