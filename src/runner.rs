//! Batch screening over a universe of symbols.
//!
//! [`BatchRunner`] fetches each symbol from a [`SeriesStore`], computes the
//! configured indicator, and screens the trailing values. A symbol that fails
//! to fetch or compute never aborts the run: it is counted, logged, and
//! listed in the [`ScreenReport`].

use std::{
    error::Error,
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    ConfigError, IndicatorEngine, Interval, Period, PriceSeries, ScreenConfig, ScreenError,
    Screener, SeriesRequest, SeriesStore, SymbolResult,
};

/// Whether symbols are screened one after another or on the rayon pool.
///
/// Both produce the same report for the same inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    #[default]
    Sequential,
    Parallel,
}

/// Shared flag that stops a run before its next symbol.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a symbol produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoSignalReason {
    /// Fewer bars than the configured minimum.
    InsufficientHistory { bars: usize, required: usize },
    /// Every indicator value was undefined.
    AllUndefined,
}

impl Display for NoSignalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientHistory { bars, required } => {
                write!(f, "insufficient history: {bars} bars, {required} required")
            }
            Self::AllUndefined => f.write_str("indicator undefined on every bar"),
        }
    }
}

/// What screening one symbol produced.
#[derive(Debug)]
pub enum SymbolOutcome {
    Signal(SymbolResult),
    NoSignal(NoSignalReason),
    Failed(ScreenError),
    /// Not attempted because the run was cancelled.
    Skipped,
}

/// Per-run counters. `total` excludes skipped symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub no_signal: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// No symbol produced a result.
    NoData,
    Cancelled,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenReport {
    /// Ascending by latest value with undefined last; ties keep universe
    /// order.
    pub results: Vec<SymbolResult>,
    pub summary: RunSummary,
    pub failures: Vec<SymbolFailure>,
    pub no_signal: Vec<String>,
    pub cancelled: bool,
}

impl ScreenReport {
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            RunStatus::Cancelled
        } else if self.summary.succeeded == 0 {
            RunStatus::NoData
        } else {
            RunStatus::Completed
        }
    }

    fn record(&mut self, symbol: &str, outcome: SymbolOutcome) {
        match outcome {
            SymbolOutcome::Signal(result) => {
                self.summary.total += 1;
                self.summary.succeeded += 1;
                self.results.push(result);
            }
            SymbolOutcome::NoSignal(_) => {
                self.summary.total += 1;
                self.summary.no_signal += 1;
                self.no_signal.push(symbol.to_owned());
            }
            SymbolOutcome::Failed(err) => {
                self.summary.total += 1;
                self.summary.failed += 1;
                self.failures.push(SymbolFailure {
                    symbol: symbol.to_owned(),
                    reason: error_chain(&err),
                });
            }
            SymbolOutcome::Skipped => self.cancelled = true,
        }
    }
}

fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Screens one already-fetched series.
///
/// Pure: depends only on its arguments.
#[must_use]
pub fn screen_series(
    symbol: &str,
    series: &PriceSeries,
    engine: &IndicatorEngine,
    screener: &Screener,
    min_bars: usize,
) -> SymbolOutcome {
    if series.len() < min_bars {
        return SymbolOutcome::NoSignal(NoSignalReason::InsufficientHistory {
            bars: series.len(),
            required: min_bars,
        });
    }

    let indicator = engine.compute(series);
    let as_of = series.last_open_time().unwrap_or_default();

    screener
        .evaluate(symbol, as_of, &indicator)
        .map_or(SymbolOutcome::NoSignal(NoSignalReason::AllUndefined), SymbolOutcome::Signal)
}

/// Runs the screen for every symbol in a universe.
///
/// # Example
///
/// ```
/// use quantedge_screen::{BatchRunner, MemoryStore, Mode, RunStatus, ScreenConfig};
///
/// let mut store = MemoryStore::new();
/// store.insert_closes("UP", &[1.0, 2.0, 3.0]).unwrap();
///
/// let config = ScreenConfig {
///     mode: Mode::NormalizedRange,
///     window: 2,
///     ..ScreenConfig::default()
/// };
/// let runner = BatchRunner::new(store, &config).unwrap();
/// let report = runner.run(&["UP", "MISSING"]);
///
/// assert_eq!(report.status(), RunStatus::Completed);
/// assert_eq!(report.summary.succeeded, 1);
/// assert_eq!(report.summary.failed, 1);
/// ```
#[derive(Debug)]
pub struct BatchRunner<S> {
    store: S,
    engine: IndicatorEngine,
    screener: Screener,
    period: Period,
    interval: Interval,
    timeout: Duration,
    min_bars: usize,
    execution: Execution,
    cancellation: CancellationToken,
}

impl<S: SeriesStore> BatchRunner<S> {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` does not validate.
    pub fn new(store: S, config: &ScreenConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            store,
            engine: config.engine()?,
            screener: config.screener(),
            period: config.period,
            interval: config.interval,
            timeout: config.fetch_timeout(),
            min_bars: config.min_bars,
            execution: config.execution,
            cancellation: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Token that cancels this runner.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetches and screens a single symbol.
    pub fn screen_symbol(&self, symbol: &str) -> SymbolOutcome {
        if self.cancellation.is_cancelled() {
            return SymbolOutcome::Skipped;
        }

        let request =
            SeriesRequest::new(symbol, self.period, self.interval).with_timeout(self.timeout);

        let outcome = match self.store.fetch(&request) {
            Ok(series) => {
                screen_series(symbol, &series, &self.engine, &self.screener, self.min_bars)
            }
            Err(err) => SymbolOutcome::Failed(err.into()),
        };

        match &outcome {
            SymbolOutcome::Signal(result) => debug!(
                symbol,
                latest = ?result.latest,
                below = result.below_count,
                "screened"
            ),
            SymbolOutcome::NoSignal(reason) => debug!(symbol, %reason, "no signal"),
            SymbolOutcome::Failed(err) => warn!(symbol, error = %error_chain(err), "screen failed"),
            SymbolOutcome::Skipped => {}
        }

        outcome
    }

    /// Screens `symbols` and assembles the report.
    ///
    /// Outcomes are folded in universe order regardless of
    /// [`Execution`], so the report is deterministic.
    pub fn run<T>(&self, symbols: &[T]) -> ScreenReport
    where
        T: AsRef<str> + Sync,
    {
        info!(
            symbols = symbols.len(),
            mode = %self.engine.mode(),
            window = self.engine.window(),
            period = %self.period,
            interval = %self.interval,
            execution = ?self.execution,
            "starting screen"
        );

        let outcomes: Vec<SymbolOutcome> = match self.execution {
            Execution::Sequential => symbols
                .iter()
                .map(|symbol| self.screen_symbol(symbol.as_ref()))
                .collect(),
            Execution::Parallel => symbols
                .par_iter()
                .map(|symbol| self.screen_symbol(symbol.as_ref()))
                .collect(),
        };

        let mut report = ScreenReport::default();
        for (symbol, outcome) in symbols.iter().zip(outcomes) {
            report.record(symbol.as_ref(), outcome);
        }
        report.results.sort_by(SymbolResult::cmp_latest);

        info!(
            total = report.summary.total,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            no_signal = report.summary.no_signal,
            cancelled = report.cancelled,
            "screen finished"
        );

        report
    }
}
