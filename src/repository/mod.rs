//! Document store for country records.
//!
//! The `CountryRepository` trait is the only way the service and refresh job
//! touch primary storage. The collection is replaced wholesale on every
//! refresh; records are never mutated individually.
//!
//! Two implementations ship with the crate:
//! - [`InMemoryCountryStore`]: process-local, always available
//! - [`PgCountryStore`]: PostgreSQL JSONB (feature `postgres`)

use crate::error::Result;
use crate::model::{Country, StoredCountry};
use std::future::Future;

pub mod inmemory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use inmemory::InMemoryCountryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgCountryStore;

/// Filter for listing queries.
///
/// `None` means "no constraint". Both population bounds are inclusive and
/// apply together when both are set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub min_population: Option<u64>,
    pub max_population: Option<u64>,
}

impl CountryFilter {
    /// Whether `country` satisfies every set constraint.
    pub fn matches(&self, country: &Country) -> bool {
        if let Some(region) = &self.region {
            if &country.region != region {
                return false;
            }
        }
        if let Some(min) = self.min_population {
            if country.population < min {
                return false;
            }
        }
        if let Some(max) = self.max_population {
            if country.population > max {
                return false;
            }
        }
        true
    }
}

/// Trait for country document stores.
///
/// Methods take `&self`; implementations use interior mutability so one
/// store can be shared across request handlers and the refresh task.
pub trait CountryRepository: Send + Sync + 'static {
    /// Count documents matching `filter`.
    fn count(&self, filter: &CountryFilter) -> impl Future<Output = Result<u64>> + Send;

    /// Page of documents matching `filter`, sorted by name ascending.
    fn find(
        &self,
        filter: &CountryFilter,
        skip: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<StoredCountry>>> + Send;

    /// Exact, case-sensitive match on name.
    fn find_one_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<StoredCountry>>> + Send;

    /// Every document in insertion order.
    fn find_all(&self) -> impl Future<Output = Result<Vec<StoredCountry>>> + Send;

    /// Remove every document.
    fn delete_all(&self) -> impl Future<Output = Result<()>> + Send;

    /// Insert `countries` in order, assigning ids and timestamps.
    fn insert_many(
        &self,
        countries: Vec<Country>,
    ) -> impl Future<Output = Result<Vec<StoredCountry>>> + Send;

    /// Health check.
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(true) }
    }
}
