//! Process-local country store.

use super::{CountryFilter, CountryRepository};
use crate::error::Result;
use crate::model::{Country, StoredCountry};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory document store.
///
/// Keeps documents in insertion order. Cheap to clone; clones share data.
///
/// # Example
///
/// ```
/// use country_cache::model::Country;
/// use country_cache::repository::{CountryRepository, CountryFilter, InMemoryCountryStore};
///
/// # #[tokio::main]
/// # async fn main() -> country_cache::Result<()> {
/// let store = InMemoryCountryStore::new();
/// store.insert_many(vec![Country { name: "Chad".into(), ..Default::default() }]).await?;
///
/// assert_eq!(store.count(&CountryFilter::default()).await?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryCountryStore {
    documents: Arc<RwLock<Vec<StoredCountry>>>,
}

impl InMemoryCountryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl CountryRepository for InMemoryCountryStore {
    async fn count(&self, filter: &CountryFilter) -> Result<u64> {
        let documents = self.documents.read().await;
        Ok(documents.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn find(
        &self,
        filter: &CountryFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<StoredCountry>> {
        let documents = self.documents.read().await;

        let mut matching: Vec<&StoredCountry> =
            documents.iter().filter(|doc| filter.matches(doc)).collect();
        // Byte-order sort, stable so equal names keep insertion order.
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn find_one_by_name(&self, name: &str) -> Result<Option<StoredCountry>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|doc| doc.name == name).cloned())
    }

    async fn find_all(&self) -> Result<Vec<StoredCountry>> {
        Ok(self.documents.read().await.clone())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut documents = self.documents.write().await;
        debug!("✓ InMemory store DELETE ALL ({} documents)", documents.len());
        documents.clear();
        Ok(())
    }

    async fn insert_many(&self, countries: Vec<Country>) -> Result<Vec<StoredCountry>> {
        let inserted: Vec<StoredCountry> = countries.into_iter().map(StoredCountry::new).collect();

        let mut documents = self.documents.write().await;
        documents.extend(inserted.iter().cloned());
        debug!("✓ InMemory store INSERT {} documents", inserted.len());
        Ok(inserted)
    }
}
