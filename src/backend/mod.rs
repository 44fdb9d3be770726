//! Cache backend implementations.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisBackend, RedisConfig};

/// Trait for cache backend implementations.
///
/// Abstracts the key-value store behind the [`CacheGateway`](crate::gateway::CacheGateway).
/// Implementations: InMemory (default) and Redis with the RedisJSON module.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Backend implementations should use interior mutability or external storage.
///
/// **ASYNC:** Every method returns a `Send` future so the service can be
/// driven from spawned tasks and axum handlers. Implementations may use
/// `async fn` directly.
pub trait CacheBackend: Send + Sync + Clone + 'static {
    /// Retrieve a raw value by key.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - Value found in cache
    /// - `Ok(None)` - Cache miss (key not found or expired)
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store a raw value, optionally with a TTL, in one operation.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Store a JSON document at the root path (`$`) of `key`.
    ///
    /// No expiry is applied; callers follow up with [`expire`](Self::expire).
    fn json_set(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Read the JSON document stored at `key` using the root path (`$`).
    ///
    /// Path queries return every match, so a hit comes back as a
    /// one-element JSON array wrapping the stored document.
    fn json_get(&self, key: &str) -> impl Future<Output = Result<Option<serde_json::Value>>> + Send;

    /// Set the expiry of an existing key. Missing keys are ignored.
    fn expire(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<()>> + Send;

    /// Remove value from cache.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check if key exists in cache.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }

    /// Bulk delete operation.
    ///
    /// Default implementation calls `delete()` for each key.
    /// Override for batch efficiency (e.g., Redis DEL).
    fn mdelete(&self, keys: &[&str]) -> impl Future<Output = Result<()>> + Send {
        async move {
            for key in keys {
                self.delete(key).await?;
            }
            Ok(())
        }
    }

    /// Health check - verify backend is accessible.
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(true) }
    }

    /// Remove every key in the backend's namespace.
    fn clear_all(&self) -> impl Future<Output = Result<()>> + Send;
}
