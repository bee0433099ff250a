use std::{num::NonZero, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    CachePolicy, ConfigError, Execution, IndicatorEngine, Interval, Mode, Period, Screener, StdDev,
    bbwp::DEFAULT_LOOKBACK,
    screener::{DEFAULT_THRESHOLD, DEFAULT_TRAILING_K},
};

/// Large-cap universe screened when none is configured.
pub const DEFAULT_UNIVERSE: [&str; 20] = [
    "AAPL", "MSFT", "AMZN", "META", "GOOGL", "NVDA", "TSLA", "NFLX", "AMD", "INTC", "JPM", "BAC",
    "V", "MA", "XOM", "CVX", "PEP", "KO", "DIS", "WMT",
];

/// Settings for one screening run.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration:
///
/// ```
/// use quantedge_screen::{Mode, ScreenConfig};
///
/// let config = ScreenConfig::from_toml_str(
///     r#"
///     universe = ["AAPL", "MSFT"]
///     mode = "normalized-range"
///     threshold = 10.0
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.mode, Mode::NormalizedRange);
/// assert_eq!(config.window, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenConfig {
    pub universe: Vec<String>,
    pub mode: Mode,
    /// Rolling window of the indicator (range length or band length).
    pub window: usize,
    /// Trailing values inspected per symbol.
    pub trailing_k: usize,
    /// Values strictly below this count as a signal.
    pub threshold: f64,
    /// Band-width history ranked by [`Mode::PercentileBbw`].
    pub percentile_lookback: usize,
    /// Bollinger band multiplier.
    pub std_dev: f64,
    pub period: Period,
    pub interval: Interval,
    /// Symbols with fewer bars are reported as no signal. `0` turns the
    /// check off and leaves short histories to the indicator warm-up.
    pub min_bars: usize,
    pub execution: Execution,
    pub fetch_timeout_secs: u64,
    /// Cache lifetime in seconds; absent keeps fetches for the whole session.
    pub cache_ttl_secs: Option<u64>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            universe: DEFAULT_UNIVERSE.iter().map(ToString::to_string).collect(),
            mode: Mode::default(),
            window: 20,
            trailing_k: DEFAULT_TRAILING_K,
            threshold: DEFAULT_THRESHOLD,
            percentile_lookback: DEFAULT_LOOKBACK,
            std_dev: 2.0,
            period: Period::default(),
            interval: Interval::default(),
            min_bars: 0,
            execution: Execution::default(),
            fetch_timeout_secs: 30,
            cache_ttl_secs: None,
        }
    }
}

impl ScreenConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys, and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// As [`from_toml_str`](Self::from_toml_str), plus [`ConfigError::Io`]
    /// if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Checks every numeric setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::invalid("window", "must be at least 2"));
        }
        if self.trailing_k == 0 {
            return Err(ConfigError::invalid("trailing_k", "must be at least 1"));
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::invalid("threshold", "must be a finite number"));
        }
        if self.percentile_lookback == 0 {
            return Err(ConfigError::invalid(
                "percentile_lookback",
                "must be at least 1",
            ));
        }
        if !(self.std_dev.is_finite() && self.std_dev > 0.0) {
            return Err(ConfigError::invalid(
                "std_dev",
                "must be a positive finite number",
            ));
        }
        Ok(())
    }

    /// Indicator engine described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration does not
    /// validate.
    pub fn engine(&self) -> Result<IndicatorEngine, ConfigError> {
        self.validate()?;

        let window = NonZero::new(self.window)
            .ok_or_else(|| ConfigError::invalid("window", "must be at least 2"))?;
        let lookback = NonZero::new(self.percentile_lookback)
            .ok_or_else(|| ConfigError::invalid("percentile_lookback", "must be at least 1"))?;

        Ok(IndicatorEngine::new(self.mode, window)
            .with_std_dev(StdDev::new(self.std_dev))
            .with_lookback(lookback))
    }

    #[must_use]
    pub fn screener(&self) -> Screener {
        Screener::new(self.trailing_k, self.threshold)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_ttl_secs
            .map_or(CachePolicy::Session, |secs| {
                CachePolicy::Ttl(Duration::from_secs(secs))
            })
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    mod defaults {
        use super::*;

        #[test]
        fn empty_document_yields_defaults() {
            let config = ScreenConfig::from_toml_str("").unwrap();
            assert_eq!(config, ScreenConfig::default());
        }

        #[test]
        fn default_values() {
            let config = ScreenConfig::default();
            assert_eq!(config.universe.len(), 20);
            assert_eq!(config.universe[0], "AAPL");
            assert_eq!(config.mode, Mode::PercentileBbw);
            assert_eq!(config.window, 20);
            assert_eq!(config.trailing_k, 6);
            assert_eq!(config.threshold, 15.0);
            assert_eq!(config.percentile_lookback, 252);
            assert_eq!(config.period, Period::FiveYears);
            assert_eq!(config.interval, Interval::Daily);
            assert_eq!(config.min_bars, 0);
            assert_eq!(config.execution, Execution::Sequential);
            assert_eq!(config.cache_policy(), CachePolicy::Session);
            assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn reads_every_field() {
            let config = ScreenConfig::from_toml_str(
                r#"
                universe = ["KO", "PEP"]
                mode = "normalized-range"
                window = 10
                trailing_k = 3
                threshold = 20.5
                percentile_lookback = 100
                std_dev = 2.5
                period = "1y"
                interval = "1wk"
                min_bars = 50
                execution = "parallel"
                fetch_timeout_secs = 5
                cache_ttl_secs = 600
                "#,
            )
            .unwrap();

            assert_eq!(config.universe, vec!["KO", "PEP"]);
            assert_eq!(config.mode, Mode::NormalizedRange);
            assert_eq!(config.window, 10);
            assert_eq!(config.trailing_k, 3);
            assert_eq!(config.threshold, 20.5);
            assert_eq!(config.percentile_lookback, 100);
            assert_eq!(config.std_dev, 2.5);
            assert_eq!(config.period, Period::OneYear);
            assert_eq!(config.interval, Interval::Weekly);
            assert_eq!(config.min_bars, 50);
            assert_eq!(config.execution, Execution::Parallel);
            assert_eq!(
                config.cache_policy(),
                CachePolicy::Ttl(Duration::from_secs(600))
            );
        }

        #[test]
        fn unknown_keys_are_rejected() {
            let err = ScreenConfig::from_toml_str("windw = 3").unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
        }

        #[test]
        fn unknown_mode_is_rejected() {
            let err = ScreenConfig::from_toml_str(r#"mode = "rsi""#).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
        }

        #[test]
        fn reads_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("screen.toml");
            std::fs::write(&path, "trailing_k = 4\n").unwrap();

            let config = ScreenConfig::from_path(&path).unwrap();
            assert_eq!(config.trailing_k, 4);
        }

        #[test]
        fn missing_file_is_io_error() {
            let err = ScreenConfig::from_path("/nonexistent/screen.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Io { .. }));
        }
    }

    mod validation {
        use super::*;

        fn field_of(err: ConfigError) -> &'static str {
            match err {
                ConfigError::Invalid { field, .. } => field,
                other => panic!("expected invalid field, got {other:?}"),
            }
        }

        #[test]
        fn window_below_two() {
            let config = ScreenConfig {
                window: 1,
                ..ScreenConfig::default()
            };
            assert_eq!(field_of(config.validate().unwrap_err()), "window");
        }

        #[test]
        fn zero_trailing_k() {
            let err = ScreenConfig::from_toml_str("trailing_k = 0").unwrap_err();
            assert_eq!(field_of(err), "trailing_k");
        }

        #[test]
        fn non_finite_threshold() {
            let config = ScreenConfig {
                threshold: f64::NAN,
                ..ScreenConfig::default()
            };
            assert_eq!(field_of(config.validate().unwrap_err()), "threshold");
        }

        #[test]
        fn zero_lookback() {
            let err = ScreenConfig::from_toml_str("percentile_lookback = 0").unwrap_err();
            assert_eq!(field_of(err), "percentile_lookback");
        }

        #[test]
        fn non_positive_std_dev() {
            let err = ScreenConfig::from_toml_str("std_dev = 0.0").unwrap_err();
            assert_eq!(field_of(err), "std_dev");
        }

        #[test]
        fn engine_reflects_settings() {
            let config = ScreenConfig {
                mode: Mode::NormalizedRange,
                window: 14,
                ..ScreenConfig::default()
            };
            let engine = config.engine().unwrap();
            assert_eq!(engine.mode(), Mode::NormalizedRange);
            assert_eq!(engine.window(), 14);
            assert_eq!(engine.warm_up(), 14);
        }
    }
}
