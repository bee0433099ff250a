use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::Timestamp;

/// A price series violated its ordering or data-quality invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    /// Two consecutive bars were out of order or shared a timestamp.
    #[error("timestamps must be strictly increasing: {previous} followed by {next}")]
    NotIncreasing {
        previous: Timestamp,
        next: Timestamp,
    },

    /// A close price was NaN or infinite.
    #[error("close price at {open_time} is not finite")]
    NonFiniteClose { open_time: Timestamp },
}

/// Errors reported by a [`SeriesStore`](crate::SeriesStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has no data for the symbol.
    #[error("no price data available for {symbol}")]
    Unavailable { symbol: String },

    /// Data exists but nothing is left for the requested period.
    #[error("price data for {symbol} is empty")]
    Empty { symbol: String },

    /// The fetch did not complete within the request timeout.
    #[error("fetching {symbol} exceeded {timeout:?}")]
    Timeout { symbol: String, timeout: Duration },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed price data in {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The fetched bars could not form a valid series.
    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),
}

/// Why a single symbol failed during a batch run.
///
/// Never escapes [`BatchRunner::run`](crate::BatchRunner::run); failures are
/// counted and listed in the report instead.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Invalid or unreadable screening configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read configuration from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors writing the result export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write results")]
    Csv(#[from] csv::Error),

    #[error("failed to write results to {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_error_messages() {
        let err = SeriesError::NotIncreasing {
            previous: 5,
            next: 5,
        };
        assert_eq!(
            err.to_string(),
            "timestamps must be strictly increasing: 5 followed by 5"
        );
    }

    #[test]
    fn screen_error_is_transparent_over_store_error() {
        let err: ScreenError = StoreError::Unavailable {
            symbol: "AAPL".into(),
        }
        .into();
        assert_eq!(err.to_string(), "no price data available for AAPL");
    }

    #[test]
    fn series_errors_reach_the_runner_through_the_store() {
        let series = SeriesError::NonFiniteClose { open_time: 7 };
        let err: ScreenError = StoreError::from(series).into();
        assert!(matches!(err, ScreenError::Store(StoreError::Series(_))));
        assert_eq!(err.to_string(), "invalid series: close price at 7 is not finite");
    }

    #[test]
    fn config_error_names_field() {
        let err = ConfigError::invalid("window", "must be at least 2");
        assert_eq!(err.to_string(), "invalid `window`: must be at least 2");
    }
}
