use crate::{Ohlcv, Price, Timestamp};
use std::collections::VecDeque;

/// Fixed-length window of closes with a running sum and sum of squares.
#[derive(Clone, Debug)]
pub(crate) struct PriceWindow {
    size: usize,
    window: VecDeque<Price>,
    /// Maintained incrementally via add/subtract. May accumulate FP rounding
    /// drift over very long runs, negligible for typical window sizes.
    sum: Price,
    sum_of_squares: f64,
    last_open_time: Option<Timestamp>,
}

impl PriceWindow {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            window: VecDeque::with_capacity(size),
            sum: 0.0,
            sum_of_squares: 0.0,
            last_open_time: None,
        }
    }

    #[inline]
    pub fn add(&mut self, ohlcv: &impl Ohlcv) {
        debug_assert_advances(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        if self.is_ready()
            && let Some(old) = self.window.pop_front()
        {
            self.sum -= old;
            self.sum_of_squares -= old * old;
        }

        let price = ohlcv.close();
        self.window.push_back(price);
        self.sum += price;
        self.sum_of_squares += price * price;
    }

    #[inline]
    pub fn sum(&self) -> Option<Price> {
        self.is_ready().then_some(self.sum)
    }

    #[inline]
    pub fn sum_of_squares(&self) -> Option<f64> {
        self.is_ready().then_some(self.sum_of_squares)
    }

    #[inline]
    fn is_ready(&self) -> bool {
        self.window.len() == self.size
    }
}

/// Fixed-length window tracking the rolling minimum and maximum close.
///
/// Two monotonic deques of `(sequence, price)` give amortized O(1) updates:
/// the max deque is non-increasing front to back, the min deque
/// non-decreasing, and entries older than the window are dropped from the
/// front.
#[derive(Clone, Debug)]
pub(crate) struct RangeWindow {
    size: usize,
    seen: usize,
    maxima: VecDeque<(usize, Price)>,
    minima: VecDeque<(usize, Price)>,
    last_open_time: Option<Timestamp>,
}

impl RangeWindow {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            seen: 0,
            maxima: VecDeque::with_capacity(size),
            minima: VecDeque::with_capacity(size),
            last_open_time: None,
        }
    }

    #[inline]
    pub fn add(&mut self, ohlcv: &impl Ohlcv) {
        debug_assert_advances(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let seq = self.seen;
        let price = ohlcv.close();
        self.seen += 1;

        while self.maxima.back().is_some_and(|&(_, p)| p <= price) {
            self.maxima.pop_back();
        }
        self.maxima.push_back((seq, price));

        while self.minima.back().is_some_and(|&(_, p)| p >= price) {
            self.minima.pop_back();
        }
        self.minima.push_back((seq, price));

        // oldest sequence still inside the window
        let oldest = self.seen.saturating_sub(self.size);
        while self.maxima.front().is_some_and(|&(s, _)| s < oldest) {
            self.maxima.pop_front();
        }
        while self.minima.front().is_some_and(|&(s, _)| s < oldest) {
            self.minima.pop_front();
        }
    }

    /// `(low, high)` of the window once it is full.
    #[inline]
    pub fn bounds(&self) -> Option<(Price, Price)> {
        if self.seen < self.size {
            return None;
        }
        let (_, low) = *self.minima.front()?;
        let (_, high) = *self.maxima.front()?;
        Some((low, high))
    }
}

#[inline]
fn debug_assert_advances(last: Option<Timestamp>, next: Timestamp) {
    debug_assert!(
        last.is_none_or(|t| t < next),
        "open_time must be strictly increasing: last={}, got={next}",
        last.unwrap_or(0),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::bar;

    mod price_window {
        use super::*;

        mod filling {
            use super::*;

            #[test]
            fn sum_is_none_when_empty() {
                let w = PriceWindow::new(3);
                assert_eq!(w.sum(), None);
                assert_eq!(w.sum_of_squares(), None);
            }

            #[test]
            fn sum_is_none_until_window_full() {
                let mut w = PriceWindow::new(3);
                w.add(&bar(10.0, 1));
                w.add(&bar(20.0, 2));
                assert_eq!(w.sum(), None);
            }

            #[test]
            fn sums_when_full() {
                let mut w = PriceWindow::new(2);
                w.add(&bar(3.0, 1));
                w.add(&bar(4.0, 2));
                assert_eq!(w.sum(), Some(7.0));
                assert_eq!(w.sum_of_squares(), Some(25.0));
            }
        }

        mod sliding {
            use super::*;

            #[test]
            fn oldest_value_drops_on_advance() {
                let mut w = PriceWindow::new(2);
                w.add(&bar(10.0, 1));
                w.add(&bar(20.0, 2));
                w.add(&bar(30.0, 3));
                // 10 dropped, 20 + 30 = 50
                assert_eq!(w.sum(), Some(50.0));
                assert_eq!(w.sum_of_squares(), Some(1300.0));
            }

            #[test]
            fn window_size_one_tracks_latest() {
                let mut w = PriceWindow::new(1);
                w.add(&bar(10.0, 1));
                w.add(&bar(20.0, 2));
                assert_eq!(w.sum(), Some(20.0));
            }
        }

        #[cfg(debug_assertions)]
        #[test]
        #[should_panic(expected = "open_time must be strictly increasing")]
        fn panics_on_repeated_open_time() {
            let mut w = PriceWindow::new(2);
            w.add(&bar(10.0, 2));
            w.add(&bar(20.0, 2));
        }
    }

    mod range_window {
        use super::*;

        fn window_of(size: usize, closes: &[f64]) -> RangeWindow {
            let mut w = RangeWindow::new(size);
            for (i, &c) in closes.iter().enumerate() {
                w.add(&bar(c, i as u64 + 1));
            }
            w
        }

        #[test]
        fn none_until_full() {
            let w = window_of(3, &[1.0, 2.0]);
            assert_eq!(w.bounds(), None);
        }

        #[test]
        fn bounds_of_full_window() {
            let w = window_of(3, &[5.0, 1.0, 3.0]);
            assert_eq!(w.bounds(), Some((1.0, 5.0)));
        }

        #[test]
        fn extremes_expire_with_window() {
            // [5, 1, 3] → [1, 3, 2] → [3, 2, 4]
            let w = window_of(3, &[5.0, 1.0, 3.0, 2.0, 4.0]);
            assert_eq!(w.bounds(), Some((2.0, 4.0)));
        }

        #[test]
        fn equal_prices_collapse_range() {
            let w = window_of(3, &[7.0, 7.0, 7.0, 7.0]);
            assert_eq!(w.bounds(), Some((7.0, 7.0)));
        }

        #[test]
        fn matches_brute_force_on_zigzag() {
            let closes: Vec<f64> = (0..50)
                .map(|i| f64::from((i * 37) % 11) - f64::from(i % 4))
                .collect();
            let mut w = RangeWindow::new(5);

            for (i, &c) in closes.iter().enumerate() {
                w.add(&bar(c, i as u64 + 1));
                if i >= 4 {
                    let slice = &closes[i - 4..=i];
                    let lo = slice.iter().copied().fold(f64::INFINITY, f64::min);
                    let hi = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    assert_eq!(w.bounds(), Some((lo, hi)), "bar {i}");
                }
            }
        }
    }
}
