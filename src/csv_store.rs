use std::{
    fs::File,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::{DateTime, Datelike, Days, Months, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::{
    Interval, Ohlcv, Period, PriceBar, PriceSeries, SeriesRequest, SeriesStore, StoreError,
    Timestamp,
};

/// Reads daily bars from `<dir>/<SYMBOL>.csv`.
///
/// Expected header: `open_time,open,high,low,close,volume`, with `open_time`
/// in epoch milliseconds. Only `open_time` and `close` are required; rows with
/// an empty or non-finite close are dropped. Rows may appear in any order.
///
/// [`Period`] is measured back from the most recent bar in the file.
/// [`Interval::Weekly`] resamples the daily rows into ISO weeks.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Row {
    open_time: Timestamp,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

impl Row {
    fn into_bar(self) -> Option<PriceBar> {
        let close = self.close?;
        Some(PriceBar {
            open_time: self.open_time,
            open: self.open,
            high: self.high,
            low: self.low,
            close,
            volume: self.volume,
        })
    }
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> Option<PathBuf> {
        let valid = !symbol.is_empty()
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^' | '='))
            && !symbol.starts_with('.');

        valid.then(|| self.dir.join(format!("{symbol}.csv")))
    }

    /// Reads every row of the symbol's file, giving up with
    /// [`StoreError::Timeout`] once `request.timeout` has elapsed since
    /// `started`.
    fn read_bars(
        &self,
        request: &SeriesRequest,
        started: Instant,
    ) -> Result<Vec<PriceBar>, StoreError> {
        let symbol = &request.symbol;
        let unavailable = || StoreError::Unavailable {
            symbol: symbol.clone(),
        };
        let path = self.path_for(symbol).ok_or_else(unavailable)?;

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(source) if source.kind() == ErrorKind::NotFound => return Err(unavailable()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut bars = Vec::new();
        for row in csv::Reader::from_reader(file).deserialize::<Row>() {
            check_deadline(request, started)?;
            let row = row.map_err(|source| StoreError::Csv {
                path: path.clone(),
                source,
            })?;
            bars.extend(row.into_bar());
        }

        bars.sort_by_key(|bar| bar.open_time);
        Ok(PriceSeries::cleaned(bars)?.into_bars())
    }
}

fn check_deadline(request: &SeriesRequest, started: Instant) -> Result<(), StoreError> {
    if started.elapsed() > request.timeout {
        return Err(StoreError::Timeout {
            symbol: request.symbol.clone(),
            timeout: request.timeout,
        });
    }
    Ok(())
}

impl SeriesStore for CsvStore {
    fn fetch(&self, request: &SeriesRequest) -> Result<PriceSeries, StoreError> {
        let started = Instant::now();

        let mut bars = self.read_bars(request, started)?;
        trim_to_period(&mut bars, request.period);
        if request.interval == Interval::Weekly {
            bars = resample_weekly(&bars);
        }

        check_deadline(request, started)?;
        if bars.is_empty() {
            return Err(StoreError::Empty {
                symbol: request.symbol.clone(),
            });
        }

        debug!(
            symbol = %request.symbol,
            period = %request.period,
            interval = %request.interval,
            bars = bars.len(),
            "loaded price series"
        );

        Ok(PriceSeries::new(bars)?)
    }
}

fn to_datetime(open_time: Timestamp) -> Option<DateTime<Utc>> {
    i64::try_from(open_time)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

fn to_timestamp(datetime: DateTime<Utc>) -> Timestamp {
    Timestamp::try_from(datetime.timestamp_millis()).unwrap_or(0)
}

/// Keeps bars no older than `period` before the most recent bar.
fn trim_to_period(bars: &mut Vec<PriceBar>, period: Period) {
    let Some(months) = period.months() else {
        return;
    };
    let Some(cutoff) = bars
        .last()
        .and_then(|bar| to_datetime(bar.open_time))
        .and_then(|latest| latest.checked_sub_months(Months::new(months)))
    else {
        return;
    };

    let cutoff = to_timestamp(cutoff);
    bars.retain(|bar| bar.open_time >= cutoff);
}

/// Monday 00:00 UTC of the ISO week containing `open_time`.
fn week_start(open_time: Timestamp) -> Timestamp {
    to_datetime(open_time)
        .and_then(|dt| {
            let date = dt.date_naive();
            let offset = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(offset))
        })
        .and_then(|monday| monday.and_hms_opt(0, 0, 0))
        .map_or(open_time, |monday| to_timestamp(monday.and_utc()))
}

/// Aggregates sorted daily bars into one bar per ISO week.
fn resample_weekly(bars: &[PriceBar]) -> Vec<PriceBar> {
    let mut weeks: Vec<PriceBar> = Vec::new();
    let mut current_week: Option<Timestamp> = None;

    for bar in bars {
        let week = week_start(bar.open_time);

        if current_week == Some(week)
            && let Some(agg) = weeks.last_mut()
        {
            agg.high = Some(agg.high().max(bar.high()));
            agg.low = Some(agg.low().min(bar.low()));
            agg.close = bar.close;
            agg.volume = match (agg.volume, bar.volume) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            };
        } else {
            current_week = Some(week);
            let mut agg = PriceBar::new(week, bar.open(), bar.high(), bar.low(), bar.close);
            agg.volume = bar.volume;
            weeks.push(agg);
        }
    }

    weeks
}
