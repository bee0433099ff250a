use std::{collections::HashMap, sync::RwLock, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::{Interval, Period, PriceSeries, SeriesRequest, SeriesStore, StoreError};

/// How long a cached series stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Keep every successful fetch for the lifetime of the cache.
    #[default]
    Session,
    /// Refetch once an entry is older than the given duration.
    Ttl(Duration),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    series: PriceSeries,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new(series: PriceSeries, policy: CachePolicy) -> Self {
        let expires_at = match policy {
            CachePolicy::Session => None,
            CachePolicy::Ttl(ttl) => Some(
                TimeDelta::from_std(ttl)
                    .ok()
                    .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            ),
        };

        Self { series, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

type CacheKey = (String, Period, Interval);

/// Memoizing decorator over any [`SeriesStore`].
///
/// Entries are keyed by `(symbol, period, interval)`. Only successful fetches
/// are cached, so a failed symbol is retried on the next request.
///
/// # Example
///
/// ```
/// use quantedge_screen::{
///     CachePolicy, CachedStore, Interval, MemoryStore, Period, SeriesRequest, SeriesStore,
/// };
///
/// let mut inner = MemoryStore::new();
/// inner.insert_closes("AAPL", &[1.0, 2.0, 3.0]).unwrap();
///
/// let store = CachedStore::new(inner, CachePolicy::Session);
/// let request = SeriesRequest::new("AAPL", Period::Max, Interval::Daily);
/// assert_eq!(store.fetch(&request).unwrap().len(), 3);
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    policy: CachePolicy,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl<S: SeriesStore> CachedStore<S> {
    pub fn new(inner: S, policy: CachePolicy) -> Self {
        Self {
            inner,
            policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of entries held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry for `symbol`.
    pub fn invalidate(&self, symbol: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|(cached, _, _), _| cached != symbol);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn key(request: &SeriesRequest) -> CacheKey {
        (request.symbol.clone(), request.period, request.interval)
    }

    fn lookup(&self, key: &CacheKey) -> Option<PriceSeries> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.series.clone())
    }
}

impl<S: SeriesStore> SeriesStore for CachedStore<S> {
    fn fetch(&self, request: &SeriesRequest) -> Result<PriceSeries, StoreError> {
        let key = Self::key(request);

        if let Some(series) = self.lookup(&key) {
            debug!(symbol = %request.symbol, "series cache hit");
            return Ok(series);
        }

        let series = self.inner.fetch(request)?;
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, CacheEntry::new(series.clone(), self.policy));
        }

        Ok(series)
    }
}
