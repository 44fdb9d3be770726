//! Cache gateway - the only path the service uses to talk to the cache.
//!
//! Wraps a [`CacheBackend`] and applies the deployment-wide fixed TTL to
//! every write. Errors from the backend are never swallowed here.

use crate::backend::CacheBackend;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Default entry lifetime: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Fixed-TTL facade over a cache backend.
///
/// Cheap to clone; clones share the backend.
///
/// # Example
///
/// ```no_run
/// use country_cache::{backend::InMemoryBackend, CacheGateway};
///
/// # async fn example() -> country_cache::Result<()> {
/// let cache = CacheGateway::new(InMemoryBackend::new());
///
/// cache.set_structured("regions:all", &serde_json::json!({"data": {}})).await?;
/// let cached = cache.get_structured("regions:all").await?;
/// assert!(cached.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CacheGateway<B: CacheBackend> {
    backend: B,
    ttl: Duration,
}

impl<B: CacheBackend> CacheGateway<B> {
    /// Create a gateway using [`DEFAULT_TTL`].
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the fixed TTL for this deployment.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The TTL applied to every write.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Direct access to the backend (health checks, tests).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Store a raw string value with the fixed TTL.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backend
            .set(key, value.as_bytes().to_vec(), Some(self.ttl))
            .await
    }

    /// Read a raw string value.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.backend.get(key).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| Error::Cache(format!("Non UTF-8 value at {}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Store a structured value at the document root, then apply the TTL.
    ///
    /// Two backend round trips: a failure between them leaves the entry
    /// without an expiry until the next refresh flushes the cache.
    pub async fn set_structured<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let document = serde_json::to_value(value)?;
        self.backend.json_set(key, &document).await?;
        self.backend.expire(key, self.ttl).await
    }

    /// Read a structured value, unwrapping the one-level array the root
    /// path query returns.
    pub async fn get_structured(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let wrapped = match self.backend.json_get(key).await? {
            Some(value) => value,
            None => return Ok(None),
        };

        match wrapped {
            serde_json::Value::Array(items) => Ok(items.into_iter().next()),
            // Backends without path semantics hand back the document itself.
            other => Ok(Some(other)),
        }
    }

    /// [`get_structured`](Self::get_structured) decoded into `T`.
    pub async fn get_structured_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_structured(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Remove one key.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }

    /// Remove several keys.
    pub async fn delete_many(&self, keys: &[&str]) -> Result<()> {
        self.backend.mdelete(keys).await
    }

    /// Remove every key in the cache namespace.
    pub async fn flush_all(&self) -> Result<()> {
        self.backend.clear_all().await
    }
}
