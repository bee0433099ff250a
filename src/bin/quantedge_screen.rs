use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use quantedge_screen::{
    BatchRunner, CachedStore, CsvStore, Execution, Interval, Mode, Period, RunStatus,
    ScreenConfig, ScreenReport, export_periods_to_dir, export_to_dir,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Screens a universe of symbols for volatility compression.
///
/// Reads `<SYMBOL>.csv` files from the data directory. Flags override the
/// values loaded from `--config`.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Directory holding one `<SYMBOL>.csv` per symbol.
    #[arg(long, value_name = "DIR")]
    data_dir: PathBuf,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Comma-separated symbols, replacing the configured universe.
    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// `normalized-range` or `percentile-bbw`.
    #[arg(long)]
    mode: Option<Mode>,

    /// `1d` or `1wk`.
    #[arg(long)]
    interval: Option<Interval>,

    /// `1mo`, `3mo`, `6mo`, `1y`, `2y`, `3y`, `5y`, `10y` or `max`.
    #[arg(long)]
    period: Option<Period>,

    #[arg(long)]
    window: Option<usize>,

    #[arg(long)]
    trailing_k: Option<usize>,

    #[arg(long)]
    threshold: Option<f64>,

    /// Symbols with fewer bars are reported as no signal.
    #[arg(long)]
    min_bars: Option<usize>,

    /// Screen symbols on all cores.
    #[arg(long)]
    parallel: bool,

    /// Write `results_<interval>_<count>.csv` into this directory.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
}

impl Cli {
    fn screen_config(&self) -> Result<ScreenConfig> {
        let mut config = match &self.config {
            Some(path) => ScreenConfig::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ScreenConfig::default(),
        };

        if let Some(symbols) = &self.symbols {
            config.universe.clone_from(symbols);
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(window) = self.window {
            config.window = window;
        }
        if let Some(trailing_k) = self.trailing_k {
            config.trailing_k = trailing_k;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(min_bars) = self.min_bars {
            config.min_bars = min_bars;
        }
        if self.parallel {
            config.execution = Execution::Parallel;
        }

        config.validate()?;
        Ok(config)
    }
}

fn write_table(out: &mut impl Write, report: &ScreenReport, trailing_k: usize) -> io::Result<()> {
    writeln!(
        out,
        "{:<10} {:>10} {:>8}  periods",
        "symbol",
        "latest",
        format!("below/{trailing_k}")
    )?;
    for result in &report.results {
        let latest = result
            .latest
            .map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"));
        let periods = result
            .below()
            .map(|(period, value)| format!("{period}:{value:.2}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            out,
            "{:<10} {:>10} {:>8}  {}",
            result.symbol, latest, result.below_count, periods
        )?;
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, report: &ScreenReport) -> io::Result<()> {
    let summary = report.summary;
    writeln!(
        out,
        "processed {}: {} succeeded, {} failed, {} no signal",
        summary.total, summary.succeeded, summary.failed, summary.no_signal
    )?;
    for failure in &report.failures {
        writeln!(out, "  failed {}: {}", failure.symbol, failure.reason)?;
    }
    for symbol in &report.no_signal {
        writeln!(out, "  no signal {symbol}")?;
    }
    Ok(())
}

/// Writes the results table, or the no-data notice, followed by the run
/// counts and every failure reason.
fn render_report(out: &mut impl Write, report: &ScreenReport, trailing_k: usize) -> io::Result<()> {
    match report.status() {
        RunStatus::NoData => writeln!(out, "no data obtained")?,
        RunStatus::Cancelled => {
            writeln!(out, "run cancelled, partial results:")?;
            write_table(out, report, trailing_k)?;
        }
        RunStatus::Completed => write_table(out, report, trailing_k)?,
    }

    writeln!(out)?;
    write_summary(out, report)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = cli.screen_config()?;

    let store = CachedStore::new(CsvStore::new(&cli.data_dir), config.cache_policy());
    let runner = BatchRunner::new(store, &config)?;
    let report = runner.run(&config.universe);

    render_report(&mut io::stdout().lock(), &report, config.trailing_k)
        .context("writing report")?;

    if let Some(dir) = &cli.out
        && report.status() != RunStatus::NoData
    {
        let universe_size = config.universe.len();
        let path = export_to_dir(dir, config.interval, universe_size, &report.results)
            .context("exporting results")?;
        println!("results written to {}", path.display());
        let path = export_periods_to_dir(dir, config.interval, universe_size, &report.results)
            .context("exporting trailing periods")?;
        println!("trailing periods written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantedge_screen::{RunSummary, SymbolFailure, SymbolResult};

    fn render(report: &ScreenReport) -> String {
        let mut out = Vec::new();
        render_report(&mut out, report, 6).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn no_data_still_reports_counts_and_failures() {
        let report = ScreenReport {
            summary: RunSummary {
                total: 3,
                succeeded: 0,
                failed: 2,
                no_signal: 1,
            },
            failures: vec![
                SymbolFailure {
                    symbol: "MISSING".into(),
                    reason: "no price data available for MISSING".into(),
                },
                SymbolFailure {
                    symbol: "GONE".into(),
                    reason: "no price data available for GONE".into(),
                },
            ],
            no_signal: vec!["FLAT".into()],
            ..ScreenReport::default()
        };

        assert_eq!(
            render(&report),
            "no data obtained\n\
             \n\
             processed 3: 0 succeeded, 2 failed, 1 no signal\n\
             \x20 failed MISSING: no price data available for MISSING\n\
             \x20 failed GONE: no price data available for GONE\n\
             \x20 no signal FLAT\n"
        );
    }

    #[test]
    fn table_lists_periods_with_values() {
        let report = ScreenReport {
            results: vec![SymbolResult {
                symbol: "KO".into(),
                as_of: 0,
                latest: Some(0.396_825),
                below_count: 2,
                below_periods: vec![5, 6],
                below_values: vec![1.19, 0.396_825],
            }],
            summary: RunSummary {
                total: 1,
                succeeded: 1,
                failed: 0,
                no_signal: 0,
            },
            ..ScreenReport::default()
        };

        let text = render(&report);
        assert!(text.starts_with("symbol"));
        assert!(text.contains("KO"));
        assert!(text.contains("5:1.19 6:0.40"));
        assert!(text.ends_with("processed 1: 1 succeeded, 0 failed, 0 no signal\n"));
    }
}
