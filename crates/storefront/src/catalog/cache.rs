//! Time-bounded memoization of remote catalog reads.
//!
//! Entries are keyed by a query fingerprint and hold any cloneable value.
//! Freshness is decided per call: an entry is fresh iff
//! `now - fetched_at < ttl`. Expired entries are replaced wholesale by the
//! next successful fetch; a failed fetch propagates its error and leaves the
//! previous entry as it was.
//!
//! Concurrent misses for the same key may each run their own fetch.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moka::future::Cache;
use serde::Serialize;
use tracing::debug;

/// Source of the current time for freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from a fresh entry.
    pub hits: u64,
    /// Calls that had to fetch.
    pub misses: u64,
    /// Fetches that returned an error.
    pub fetch_failures: u64,
}

impl CacheStats {
    /// hits / (hits + misses), or 0.0 before any request.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // counters will never exceed f64 precision
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetch_failures: AtomicU64,
}

#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: DateTime<Utc>,
}

impl Entry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// TTL cache in front of catalog fetches.
#[derive(Clone)]
pub struct CatalogCache {
    entries: Cache<String, Entry>,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
}

impl CatalogCache {
    /// A cache holding at most `max_entries` keys, using wall-clock time.
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// A cache using `clock` for freshness checks.
    #[must_use]
    pub fn with_clock(max_entries: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
            clock,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Return the fresh value for `key`, or run `fetch` and store its result.
    ///
    /// A stored value of a different type than `T` counts as a miss.
    ///
    /// # Errors
    ///
    /// Returns the error from `fetch` unchanged. Nothing is stored in that case.
    pub async fn get<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key).await
            && entry.is_fresh(now, ttl)
            && let Some(value) = entry.value.downcast_ref::<T>()
        {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache hit");
            return Ok(value.clone());
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, "Cache miss, fetching");

        match fetch().await {
            Ok(value) => {
                let entry = Entry {
                    value: Arc::new(value.clone()),
                    fetched_at: self.clock.now(),
                };
                self.entries.insert(key.to_string(), entry).await;
                Ok(value)
            }
            Err(e) => {
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// When the value under `key` was fetched, if an entry exists.
    pub async fn fetched_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).await.map(|entry| entry.fetched_at)
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
        debug!("Catalog cache invalidated");
    }

    /// Approximate number of stored entries, including expired ones.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetch_failures: self.counters.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn cache() -> (CatalogCache, ManualClock) {
        let clock = ManualClock::default();
        (CatalogCache::with_clock(100, Arc::new(clock.clone())), clock)
    }

    async fn counted(
        cache: &CatalogCache,
        key: &str,
        calls: &AtomicUsize,
        value: u32,
    ) -> Result<u32, String> {
        cache
            .get(key, TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            })
            .await
    }

    #[tokio::test]
    async fn test_fetches_once_within_ttl() {
        let (cache, clock) = cache();
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&cache, "k", &calls, 1).await.unwrap(), 1);
        clock.advance(Duration::from_secs(59));
        assert_eq!(counted(&cache, "k", &calls, 2).await.unwrap(), 1);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_refetches_after_ttl() {
        let (cache, clock) = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "k", &calls, 1).await.unwrap();
        let first = cache.fetched_at("k").await.unwrap();

        // Expiry is inclusive: age == ttl is stale.
        clock.advance(TTL);
        assert_eq!(counted(&cache, "k", &calls, 2).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.fetched_at("k").await.unwrap() > first);
    }

    #[tokio::test]
    async fn test_ttl_is_per_call() {
        let (cache, clock) = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "k", &calls, 1).await.unwrap();
        clock.advance(Duration::from_secs(30));

        let short: Result<u32, String> = cache
            .get("k", Duration::from_secs(10), || async { Ok(9) })
            .await;
        assert_eq!(short.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_failed_fetch_propagates_and_keeps_prior_entry() {
        let (cache, clock) = cache();
        let calls = AtomicUsize::new(0);
        counted(&cache, "k", &calls, 1).await.unwrap();
        let fetched = cache.fetched_at("k").await.unwrap();

        clock.advance(TTL * 2);
        let result: Result<u32, String> = cache
            .get("k", TTL, || async { Err("backend down".to_string()) })
            .await;

        assert_eq!(result.unwrap_err(), "backend down");
        assert_eq!(cache.fetched_at("k").await, Some(fetched));
        assert_eq!(cache.stats().fetch_failures, 1);

        // No stale fallback: the expired entry is still not served.
        assert_eq!(counted(&cache, "k", &calls, 3).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_first_fetch_stores_nothing() {
        let (cache, _) = cache();
        let result: Result<u32, String> =
            cache.get("k", TTL, || async { Err("nope".to_string()) }).await;
        assert!(result.is_err());
        assert!(cache.fetched_at("k").await.is_none());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_collide() {
        let (cache, _) = cache();
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&cache, "a", &calls, 1).await.unwrap(), 1);
        assert_eq!(counted(&cache, "b", &calls, 2).await.unwrap(), 2);
        assert_eq!(counted(&cache, "a", &calls, 3).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_refetch() {
        let (cache, _) = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "a", &calls, 1).await.unwrap();
        counted(&cache, "b", &calls, 1).await.unwrap();
        cache.invalidate_all();

        assert_eq!(counted(&cache, "a", &calls, 2).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let (cache, _) = cache();
        let _: Result<u32, String> = cache.get("k", TTL, || async { Ok(1u32) }).await;
        let text: Result<String, String> =
            cache.get("k", TTL, || async { Ok("one".to_string()) }).await;
        assert_eq!(text.unwrap(), "one");
    }

    #[test]
    fn test_hit_rate() {
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < f64::EPSILON);
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            fetch_failures: 0,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
