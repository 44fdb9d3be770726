//! Upstream country data source.
//!
//! The refresh job only needs "give me the whole dataset as JSON", so the
//! seam is a single-method trait. [`HttpUpstream`] talks to REST Countries;
//! [`StaticUpstream`] serves a fixed payload for tests and offline runs.

use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default REST Countries base URL.
pub const DEFAULT_BASE_URL: &str = "https://restcountries.com/v3.1";
/// Default resource path for the full listing.
pub const DEFAULT_PATH: &str = "all";

/// Source of raw upstream country records.
pub trait UpstreamSource: Send + Sync + 'static {
    /// Fetch the full dataset as parsed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::UpstreamFetch` on transport failures or non-2xx
    /// responses.
    fn fetch_all(&self) -> impl Future<Output = Result<serde_json::Value>> + Send;
}

/// REST Countries client backed by `reqwest`.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    path: String,
}

impl HttpUpstream {
    /// Create a client for `base_url` fetching `path`.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            path: path.into(),
        }
    }

    /// Use a preconfigured `reqwest::Client`.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Full URL of the dataset resource.
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_PATH)
    }
}

impl UpstreamSource for HttpUpstream {
    async fn fetch_all(&self) -> Result<serde_json::Value> {
        let url = self.url();
        info!("Fetching country dataset from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("✗ Upstream GET {} failed: {}", url, e);
            e
        })?;
        let response = response.error_for_status()?;
        let body = response.json::<serde_json::Value>().await?;

        debug!(
            "✓ Upstream GET {} -> {} records",
            url,
            body.as_array().map(Vec::len).unwrap_or(0)
        );
        Ok(body)
    }
}

/// Fixed in-memory payload, replaceable between fetches.
#[derive(Clone, Default)]
pub struct StaticUpstream {
    payload: Arc<RwLock<serde_json::Value>>,
}

impl StaticUpstream {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload: Arc::new(RwLock::new(payload)),
        }
    }

    /// Swap the payload returned by subsequent fetches.
    pub async fn replace(&self, payload: serde_json::Value) {
        *self.payload.write().await = payload;
    }
}

impl UpstreamSource for StaticUpstream {
    async fn fetch_all(&self) -> Result<serde_json::Value> {
        Ok(self.payload.read().await.clone())
    }
}
