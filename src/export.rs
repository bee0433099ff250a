use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::info;

use crate::{ExportError, Interval, SymbolResult};

/// One exported row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub symbol: String,
    /// Latest value rounded to two decimals, empty when undefined.
    pub latest_value: Option<f64>,
    pub trailing_below_count: usize,
}

impl From<&SymbolResult> for ExportRecord {
    fn from(result: &SymbolResult) -> Self {
        Self {
            symbol: result.symbol.clone(),
            latest_value: result.latest.map(round2),
            trailing_below_count: result.below_count,
        }
    }
}

/// One exported row per trailing period below the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRecord {
    pub symbol: String,
    /// 1-based position inside the trailing window, oldest first.
    pub period: usize,
    /// Indicator value at that period, rounded to two decimals.
    pub value: f64,
}

impl PeriodRecord {
    /// One record per entry of [`SymbolResult::below`].
    pub fn from_result(result: &SymbolResult) -> impl Iterator<Item = Self> + '_ {
        result.below().map(|(period, value)| Self {
            symbol: result.symbol.clone(),
            period,
            value: round2(value),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `results_<interval>_<universe_size>.csv`
#[must_use]
pub fn export_file_name(interval: Interval, universe_size: usize) -> String {
    format!("results_{interval}_{universe_size}.csv")
}

/// `periods_<interval>_<universe_size>.csv`
#[must_use]
pub fn period_file_name(interval: Interval, universe_size: usize) -> String {
    format!("periods_{interval}_{universe_size}.csv")
}

fn write_records<W, R>(
    writer: W,
    records: impl IntoIterator<Item = R>,
) -> Result<(), ExportError>
where
    W: Write,
    R: Serialize,
{
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes `results` as CSV with a header row, in the order given.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] if serialization or the underlying writer
/// fails.
pub fn write_results<W: Write>(writer: W, results: &[SymbolResult]) -> Result<(), ExportError> {
    write_records(writer, results.iter().map(ExportRecord::from))
}

/// Writes one `symbol,period,value` row per trailing value below the
/// threshold, symbols in the order given.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] if serialization or the underlying writer
/// fails.
pub fn write_period_rows<W: Write>(
    writer: W,
    results: &[SymbolResult],
) -> Result<(), ExportError> {
    write_records(writer, results.iter().flat_map(PeriodRecord::from_result))
}

fn create_in(dir: &Path, file_name: String) -> Result<(PathBuf, fs::File), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(file_name);
    let file = fs::File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok((path, file))
}

/// Writes `results` to [`export_file_name`] inside `dir`, creating `dir` if
/// needed, and returns the file path.
///
/// # Errors
///
/// Returns [`ExportError`] if the directory or file cannot be written.
pub fn export_to_dir(
    dir: impl AsRef<Path>,
    interval: Interval,
    universe_size: usize,
    results: &[SymbolResult],
) -> Result<PathBuf, ExportError> {
    let (path, file) = create_in(dir.as_ref(), export_file_name(interval, universe_size))?;
    write_results(file, results)?;

    info!(path = %path.display(), rows = results.len(), "exported results");
    Ok(path)
}

/// Writes [`write_period_rows`] output to [`period_file_name`] inside `dir`,
/// creating `dir` if needed, and returns the file path.
///
/// # Errors
///
/// Returns [`ExportError`] if the directory or file cannot be written.
pub fn export_periods_to_dir(
    dir: impl AsRef<Path>,
    interval: Interval,
    universe_size: usize,
    results: &[SymbolResult],
) -> Result<PathBuf, ExportError> {
    let (path, file) = create_in(dir.as_ref(), period_file_name(interval, universe_size))?;
    write_period_rows(file, results)?;

    let rows: usize = results.iter().map(|r| r.below_count).sum();
    info!(path = %path.display(), rows, "exported trailing periods");
    Ok(path)
}
