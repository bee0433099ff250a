use crate::{Ohlcv, Price, PriceBar, SeriesError, Timestamp};

/// Ordered bars for one symbol.
///
/// Construction enforces strictly increasing timestamps and finite closes, so
/// every indicator downstream can assume a clean input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Validates `bars` as-is.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError`] on a non-finite close or a timestamp that does
    /// not strictly increase.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        let mut previous: Option<Timestamp> = None;

        for bar in &bars {
            if !bar.close.is_finite() {
                return Err(SeriesError::NonFiniteClose {
                    open_time: bar.open_time,
                });
            }
            if let Some(previous) = previous
                && bar.open_time <= previous
            {
                return Err(SeriesError::NotIncreasing {
                    previous,
                    next: bar.open_time,
                });
            }
            previous = Some(bar.open_time);
        }

        Ok(Self { bars })
    }

    /// Drops bars with missing (non-finite) closes, then validates ordering.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::NotIncreasing`] if the remaining bars are out of
    /// order.
    pub fn cleaned(mut bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        bars.retain(|bar| bar.close.is_finite());
        Self::new(bars)
    }

    #[must_use]
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    #[must_use]
    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> impl Iterator<Item = Price> + '_ {
        self.bars.iter().map(Ohlcv::close)
    }

    /// Timestamp of the most recent bar.
    #[must_use]
    pub fn last_open_time(&self) -> Option<Timestamp> {
        self.bars.last().map(|bar| bar.open_time)
    }
}

/// One indicator reading, aligned with the bar at `open_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub open_time: Timestamp,
    /// `None` where the indicator is undefined (warm-up or degenerate range).
    pub value: Option<f64>,
}

/// Indicator output aligned 1:1 with the [`PriceSeries`] it was computed
/// from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorSeries {
    points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    #[must_use]
    pub fn points(&self) -> &[IndicatorPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at the most recent bar, `None` if undefined or empty.
    #[must_use]
    pub fn latest(&self) -> Option<f64> {
        self.points.last().and_then(|point| point.value)
    }

    /// The last `k` points, or all of them when the series is shorter.
    #[must_use]
    pub fn tail(&self, k: usize) -> &[IndicatorPoint] {
        &self.points[self.points.len().saturating_sub(k)..]
    }

    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|point| point.value)
    }

    #[must_use]
    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }

    /// True when no point carries a value. Vacuously true when empty.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.points.iter().all(|p| p.value.is_none())
    }
}

impl FromIterator<IndicatorPoint> for IndicatorSeries {
    fn from_iter<I: IntoIterator<Item = IndicatorPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
