//! Metrics hooks for the cache-first read path.
//!
//! The query service reports every cache lookup, write and failure through
//! [`CacheMetrics`]. The default trait methods log via the `log` crate;
//! [`NoOpMetrics`] silences them and [`AtomicMetrics`] keeps counters that
//! are reported in the `/health` payload.
//!
//! ```
//! use country_cache::observability::{AtomicMetrics, CacheMetrics};
//! use std::time::Duration;
//!
//! let metrics = AtomicMetrics::default();
//! metrics.record_miss("regions:all", Duration::from_millis(2));
//! metrics.record_set("regions:all", Duration::from_millis(1));
//! metrics.record_hit("regions:all", Duration::from_micros(300));
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!((snapshot.hits, snapshot.misses, snapshot.sets), (1, 1, 1));
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache write.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a failed cache or store operation.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }

    /// Current counters, if this implementation keeps any.
    fn counters(&self) -> Option<MetricsSnapshot> {
        None
    }
}

/// Metrics that only log, using the trait defaults.
#[derive(Clone, Default)]
pub struct LogMetrics;

impl CacheMetrics for LogMetrics {}

/// Metrics that do nothing.
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Lock-free counters. Also logs through the trait defaults.
#[derive(Default)]
pub struct AtomicMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`AtomicMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

impl MetricsSnapshot {
    /// Hits over lookups, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetrics for AtomicMetrics {
    fn record_hit(&self, key: &str, duration: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    fn record_miss(&self, key: &str, duration: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    fn record_set(&self, key: &str, duration: Duration) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    fn record_error(&self, key: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!("Cache ERROR for {}: {}", key, error);
    }

    fn counters(&self) -> Option<MetricsSnapshot> {
        Some(self.snapshot())
    }
}
