//! Process-local exchange-rate cache.
//!
//! Keyed by ordered `(from, to)` pair. Entries are never evicted on age:
//! an entry past the freshness window still serves as a stale fallback
//! when the oracle is down, so the cache stores explicit fetch instants
//! instead of configuring a TTL. Growth is bounded by the number of
//! distinct currency pairs.

use moka::sync::Cache;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entries younger than this are served without consulting the oracle.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Upper bound on cached pairs; the supported-currency square plus slack.
const CACHE_CAPACITY: u64 = 1024;

/// A cached exchange rate with its fetch instant.
#[derive(Debug, Clone, Copy)]
pub struct CachedRate {
    /// The rate: 1 `from` = `rate` `to`.
    pub rate: Decimal,
    /// When the oracle produced this rate.
    pub fetched_at: Instant,
}

impl CachedRate {
    /// True while the entry is inside the freshness window.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < FRESHNESS_WINDOW
    }
}

/// Counters describing cache behavior since startup or the last `clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored.
    pub entries: u64,
    /// Lookups that found an entry (fresh or stale).
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
}

/// Concurrency-safe rate cache shared across request handlers.
#[derive(Clone)]
pub struct RateCache {
    cache: Cache<(String, String), CachedRate>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl RateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(CACHE_CAPACITY).build(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Looks up the rate for an ordered currency pair.
    ///
    /// Returns the entry even when it is past the freshness window; the
    /// caller decides whether staleness is acceptable.
    #[must_use]
    pub fn lookup(&self, from: &str, to: &str) -> Option<CachedRate> {
        let found = self.cache.get(&(from.to_string(), to.to_string()));
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores a rate for an ordered currency pair, stamped now.
    pub fn store(&self, from: &str, to: &str, rate: Decimal) {
        self.cache.insert(
            (from.to_string(), to.to_string()),
            CachedRate {
                rate,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Stores an entry with a back-dated fetch instant.
    #[cfg(test)]
    pub(crate) fn store_with_age(&self, from: &str, to: &str, rate: Decimal, age: Duration) {
        self.cache.insert(
            (from.to_string(), to.to_string()),
            CachedRate {
                rate,
                fetched_at: Instant::now() - age,
            },
        );
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Returns entry and hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            entries: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}
