use std::cmp::Ordering;

use serde::Serialize;

use crate::{IndicatorSeries, Timestamp};

/// Default number of trailing bars inspected.
pub const DEFAULT_TRAILING_K: usize = 6;

/// Default "below" threshold on the `[0, 100]` indicator scale.
pub const DEFAULT_THRESHOLD: f64 = 15.0;

/// Screening outcome for one symbol that produced at least one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolResult {
    pub symbol: String,
    /// Open time of the most recent bar.
    pub as_of: Timestamp,
    /// Indicator value at the most recent bar.
    pub latest: Option<f64>,
    /// Trailing values that were defined and strictly below the threshold.
    pub below_count: usize,
    /// 1-based positions of those values inside the trailing window, oldest
    /// first.
    pub below_periods: Vec<usize>,
    /// The values at `below_periods`, in the same order.
    pub below_values: Vec<f64>,
}

impl SymbolResult {
    /// `(period, value)` pairs for every trailing value below the threshold.
    pub fn below(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.below_periods
            .iter()
            .copied()
            .zip(self.below_values.iter().copied())
    }

    /// Ascending by latest value, undefined last.
    #[must_use]
    pub fn cmp_latest(&self, other: &Self) -> Ordering {
        match (self.latest, other.latest) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Counts how many of the last `trailing_k` indicator values fall below a
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screener {
    trailing_k: usize,
    threshold: f64,
}

impl Default for Screener {
    fn default() -> Self {
        Self::new(DEFAULT_TRAILING_K, DEFAULT_THRESHOLD)
    }
}

impl Screener {
    #[must_use]
    pub fn new(trailing_k: usize, threshold: f64) -> Self {
        Self {
            trailing_k,
            threshold,
        }
    }

    #[must_use]
    pub fn trailing_k(&self) -> usize {
        self.trailing_k
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Screens `indicator` for `symbol`.
    ///
    /// Uses the last `trailing_k` points, or fewer when the series is shorter
    /// (no padding). Returns `None` when the series carries no defined value
    /// at all: the symbol has no signal and belongs in no result set.
    #[must_use]
    pub fn evaluate(
        &self,
        symbol: &str,
        as_of: Timestamp,
        indicator: &IndicatorSeries,
    ) -> Option<SymbolResult> {
        if indicator.is_undefined() {
            return None;
        }

        let (below_periods, below_values): (Vec<usize>, Vec<f64>) = indicator
            .tail(self.trailing_k)
            .iter()
            .enumerate()
            .filter_map(|(i, point)| {
                point
                    .value
                    .filter(|&v| v < self.threshold)
                    .map(|v| (i + 1, v))
            })
            .unzip();

        Some(SymbolResult {
            symbol: symbol.to_owned(),
            as_of,
            latest: indicator.latest(),
            below_count: below_periods.len(),
            below_periods,
            below_values,
        })
    }
}
