//! # country-cache
//!
//! A cache-first REST API over country reference data.
//!
//! The dataset is pulled from REST Countries on a daily schedule, stored in
//! a document store and served through a cache: paginated listings,
//! single-country lookups, region and language rollups, and dataset-wide
//! statistics.
//!
//! ## Layout
//!
//! - [`backend`]: key-value cache primitives (in-memory, Redis)
//! - [`gateway`]: fixed-TTL cache facade the service talks to
//! - [`key`]: cache key derivation
//! - [`model`] / [`mapper`]: country documents and upstream mapping
//! - [`upstream`]: the REST Countries client
//! - [`repository`]: document store (in-memory, PostgreSQL)
//! - [`aggregate`]: region, language and statistics computations
//! - [`service`]: the cache-first query service
//! - [`refresh`] / [`schedule`]: dataset refresh and its daily trigger
//! - [`response`] / [`http`]: response envelope and axum router
//!
//! ## Quick Start
//!
//! ```
//! use country_cache::backend::InMemoryBackend;
//! use country_cache::refresh::RefreshJob;
//! use country_cache::repository::InMemoryCountryStore;
//! use country_cache::upstream::StaticUpstream;
//! use country_cache::{CacheGateway, CountryService};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> country_cache::Result<()> {
//! let cache = CacheGateway::new(InMemoryBackend::new());
//! let store = Arc::new(InMemoryCountryStore::new());
//! let upstream = Arc::new(StaticUpstream::new(json!([
//!     {"name": {"common": "Ghana"}, "region": "Africa", "population": 31072945, "area": 238533}
//! ])));
//!
//! RefreshJob::new(cache.clone(), store.clone(), upstream).refresh_all().await?;
//!
//! let service = CountryService::new(cache, store);
//! let regions = service.regions().await?;
//! assert_eq!(regions.meta, Some(json!({"total": 1})));
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod key;
pub mod mapper;
pub mod model;
pub mod observability;
pub mod refresh;
pub mod repository;
pub mod response;
pub mod schedule;
pub mod service;
pub mod upstream;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use gateway::CacheGateway;
pub use model::{Country, StoredCountry};
pub use refresh::RefreshJob;
pub use repository::CountryRepository;
pub use response::ServiceResponse;
pub use service::CountryService;
pub use upstream::UpstreamSource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
