//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Automatically handles TTL expiration on access. Mirrors the Redis
//! semantics the service relies on: raw and JSON values live in separate
//! "types", and reading a key with the wrong accessor is an error.

use super::CacheBackend;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

enum StoredValue {
    Raw(Vec<u8>),
    Json(serde_json::Value),
}

impl StoredValue {
    fn size(&self) -> usize {
        match self {
            StoredValue::Raw(bytes) => bytes.len(),
            StoredValue::Json(value) => value.to_string().len(),
        }
    }
}

/// In-memory cache entry with optional expiration.
struct CacheEntry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: StoredValue, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        CacheEntry { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Thread-safe async in-memory cache backend.
///
/// Clones share the same underlying store.
///
/// # Example
///
/// ```no_run
/// use country_cache::backend::{CacheBackend, InMemoryBackend};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///
///     backend.set("key1", b"value".to_vec(), None).await?;
///     assert!(backend.get("key1").await?.is_some());
///
///     backend
///         .json_set("key2", &serde_json::json!({"data": [1, 2, 3]}))
///         .await?;
///     backend.expire("key2", Duration::from_secs(300)).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryBackend {
    /// Create a new in-memory cache backend.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Get the current number of entries in cache (expired ones included
    /// until they are touched).
    pub async fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Remaining time to live of a key, `None` if the key is missing,
    /// expired, or has no expiry.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.store.get(key)?;
        if entry.is_expired() {
            return None;
        }
        entry
            .expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }

    /// Get memory statistics.
    pub async fn stats(&self) -> CacheStats {
        let total_bytes: usize = self.store.iter().map(|entry| entry.value.size()).sum();
        let expired_count = self.store.iter().filter(|entry| entry.is_expired()).count();

        CacheStats {
            total_entries: self.store.len(),
            expired_entries: expired_count,
            total_bytes,
        }
    }

    /// Print cache statistics to debug log.
    pub async fn log_stats(&self) {
        let stats = self.stats().await;
        debug!(
            "Cache Stats: {} entries ({} expired), {} bytes",
            stats.total_entries, stats.expired_entries, stats.total_bytes
        );
    }

    fn wrong_type(key: &str) -> Error {
        Error::Cache(format!(
            "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
            key
        ))
    }

    fn evict_if_expired(&self, key: &str) {
        self.store.remove_if(key, |_, entry| entry.is_expired());
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.evict_if_expired(key);

        match self.store.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Raw(bytes) => {
                    debug!("✓ InMemory GET {} -> HIT", key);
                    Ok(Some(bytes.clone()))
                }
                StoredValue::Json(_) => Err(Self::wrong_type(key)),
            },
            None => {
                debug!("✓ InMemory GET {} -> MISS", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry::new(StoredValue::Raw(value), ttl);
        self.store.insert(key.to_string(), entry);

        if let Some(d) = ttl {
            debug!("✓ InMemory SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ InMemory SET {}", key);
        }

        Ok(())
    }

    async fn json_set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        // JSON.SET at the root replaces the document and clears any expiry.
        let entry = CacheEntry::new(StoredValue::Json(value.clone()), None);
        self.store.insert(key.to_string(), entry);
        debug!("✓ InMemory JSON.SET {} $", key);
        Ok(())
    }

    async fn json_get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.evict_if_expired(key);

        match self.store.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Json(value) => {
                    debug!("✓ InMemory JSON.GET {} $ -> HIT", key);
                    Ok(Some(serde_json::Value::Array(vec![value.clone()])))
                }
                StoredValue::Raw(_) => Err(Self::wrong_type(key)),
            },
            None => {
                debug!("✓ InMemory JSON.GET {} $ -> MISS", key);
                Ok(None)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.evict_if_expired(key);

        if let Some(mut entry) = self.store.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
            debug!("✓ InMemory EXPIRE {} ({:?})", key, ttl);
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if let Some(entry) = self.store.get(key) {
            return Ok(!entry.is_expired());
        }

        Ok(false)
    }

    async fn mdelete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.store.remove(*key);
        }

        debug!("✓ InMemory MDELETE {} keys", keys.len());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn clear_all(&self) -> Result<()> {
        self.store.clear();
        warn!("⚠ InMemory CLEAR_ALL executed - all cache cleared!");
        Ok(())
    }
}

/// Cache statistics.
#[derive(Clone, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: usize,
}
