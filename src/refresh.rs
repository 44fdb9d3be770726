//! Refresh job: repopulate the store and cache from upstream.
//!
//! A run fetches, maps and sorts the dataset, replaces the store contents,
//! flushes the cache and seeds `countries:all`. Any failing step aborts the
//! rest. Runs are serialized through an internal async mutex, so a manual
//! trigger and the scheduled one never interleave their delete/insert phases.
//! Reads are not synchronized with a run and may briefly see an empty store.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::gateway::CacheGateway;
use crate::key;
use crate::mapper;
use crate::model::{Country, StoredCountry};
use crate::repository::CountryRepository;
use crate::response::ServiceResponse;
use crate::upstream::UpstreamSource;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Full-dataset refresh.
pub struct RefreshJob<B: CacheBackend, R: CountryRepository, U: UpstreamSource> {
    cache: CacheGateway<B>,
    store: Arc<R>,
    upstream: Arc<U>,
    running: Arc<Mutex<()>>,
}

impl<B: CacheBackend, R: CountryRepository, U: UpstreamSource> Clone for RefreshJob<B, R, U> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            store: Arc::clone(&self.store),
            upstream: Arc::clone(&self.upstream),
            running: Arc::clone(&self.running),
        }
    }
}

impl<B: CacheBackend, R: CountryRepository, U: UpstreamSource> RefreshJob<B, R, U> {
    pub fn new(cache: CacheGateway<B>, store: Arc<R>, upstream: Arc<U>) -> Self {
        Self {
            cache,
            store,
            upstream,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one refresh and return the inserted documents.
    ///
    /// # Errors
    ///
    /// Propagates the first failure: `UpstreamFetch`, `Mapping`, `Store` or
    /// `Cache`. Steps after the failing one are not attempted.
    pub async fn refresh_all(&self) -> Result<Vec<StoredCountry>> {
        let _guard = self.running.lock().await;
        let start = Instant::now();

        let raw = self.upstream.fetch_all().await?;
        let mut countries = mapper::map_many(&raw)?;
        sort_by_name(&mut countries);

        self.store.delete_all().await?;
        let inserted = self.store.insert_many(countries).await?;

        self.cache.flush_all().await?;
        self.cache
            .set_structured(key::ALL_COUNTRIES, &inserted)
            .await?;

        info!(
            "✓ Refreshed {} countries in {:?}",
            inserted.len(),
            start.elapsed()
        );
        Ok(inserted)
    }

    /// Manual trigger: run a refresh and report only the count.
    pub async fn trigger(&self) -> Result<ServiceResponse> {
        let inserted = self.refresh_all().await?;
        Ok(ServiceResponse::success(
            "Data pull successful",
            Some(serde_json::json!({ "count": inserted.len() })),
            None,
        ))
    }
}

/// Case-insensitive ascending order, original name as tie-break.
pub fn sort_by_name(countries: &mut [Country]) {
    countries.sort_by_cached_key(|c| (c.name.to_lowercase(), c.name.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::repository::{CountryFilter, InMemoryCountryStore};
    use crate::upstream::StaticUpstream;
    use crate::Error;
    use serde_json::json;

    fn record(name: &str) -> serde_json::Value {
        json!({
            "name": {"common": name},
            "region": "Europe",
            "population": 10,
            "area": 1.5
        })
    }

    fn job(
        payload: serde_json::Value,
    ) -> (
        RefreshJob<InMemoryBackend, InMemoryCountryStore, StaticUpstream>,
        CacheGateway<InMemoryBackend>,
        Arc<InMemoryCountryStore>,
    ) {
        let cache = CacheGateway::new(InMemoryBackend::new());
        let store = Arc::new(InMemoryCountryStore::new());
        let upstream = Arc::new(StaticUpstream::new(payload));
        (
            RefreshJob::new(cache.clone(), store.clone(), upstream),
            cache,
            store,
        )
    }

    #[test]
    fn test_sort_by_name_case_insensitive() {
        let mut countries: Vec<Country> = ["b", "a", "B", "C"]
            .iter()
            .map(|n| Country {
                name: n.to_string(),
                ..Country::default()
            })
            .collect();

        sort_by_name(&mut countries);

        let names: Vec<_> = countries.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "B", "b", "C"]);
    }

    #[tokio::test]
    async fn test_refresh_replaces_store_and_seeds_cache() {
        let (job, cache, store) = job(json!([record("Spain"), record("austria")]));

        cache.set("stale", "x").await.expect("Failed to set");
        let inserted = job.refresh_all().await.expect("Failed to refresh");

        let names: Vec<_> = inserted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["austria", "Spain"]);
        assert_eq!(store.len().await, 2);
        assert!(cache.get("stale").await.expect("Failed to get").is_none());

        let seeded = cache
            .get_structured_as::<Vec<StoredCountry>>(key::ALL_COUNTRIES)
            .await
            .expect("Failed to read")
            .expect("countries:all seeded");
        assert_eq!(seeded, inserted);
    }

    #[tokio::test]
    async fn test_refresh_twice_is_idempotent() {
        let (job, _, store) = job(json!([record("Italy"), record("France")]));

        let first = job.refresh_all().await.expect("Failed to refresh");
        let second = job.refresh_all().await.expect("Failed to refresh");

        assert_eq!(first.len(), second.len());
        let names = |docs: &[StoredCountry]| docs.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
        assert_eq!(
            store
                .count(&CountryFilter::default())
                .await
                .expect("Failed to count"),
            2
        );
    }

    #[tokio::test]
    async fn test_mapping_failure_leaves_store_untouched() {
        let (job, _, store) = job(json!([record("Norway")]));
        job.refresh_all().await.expect("Failed to refresh");

        let (bad_job, _, _) = job_with_store(store.clone(), json!({"status": false}));
        let err = bad_job.refresh_all().await.expect_err("object payload must fail");

        assert!(matches!(err, Error::Mapping(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_trigger_reports_count() {
        let (job, _, _) = job(json!([record("Malta")]));
        let resp = job.trigger().await.expect("Failed to trigger");

        assert_eq!(resp.message, "Data pull successful");
        assert_eq!(resp.data, Some(json!({"count": 1})));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_do_not_interleave() {
        let (job, _, store) = job(json!([record("Peru"), record("Chile"), record("Bolivia")]));

        let a = tokio::spawn({
            let job = job.clone();
            async move { job.refresh_all().await }
        });
        let b = tokio::spawn({
            let job = job.clone();
            async move { job.refresh_all().await }
        });

        a.await.expect("task panicked").expect("Failed to refresh");
        b.await.expect("task panicked").expect("Failed to refresh");
        assert_eq!(store.len().await, 3);
    }

    /// In-memory store whose inserts fail once `fail_inserts` is set.
    #[derive(Default)]
    struct FailingStore {
        inner: InMemoryCountryStore,
        fail_inserts: std::sync::atomic::AtomicBool,
    }

    impl CountryRepository for FailingStore {
        async fn count(&self, filter: &CountryFilter) -> Result<u64> {
            self.inner.count(filter).await
        }

        async fn find(
            &self,
            filter: &CountryFilter,
            skip: u64,
            limit: u64,
        ) -> Result<Vec<StoredCountry>> {
            self.inner.find(filter, skip, limit).await
        }

        async fn find_one_by_name(&self, name: &str) -> Result<Option<StoredCountry>> {
            self.inner.find_one_by_name(name).await
        }

        async fn find_all(&self) -> Result<Vec<StoredCountry>> {
            self.inner.find_all().await
        }

        async fn delete_all(&self) -> Result<()> {
            self.inner.delete_all().await
        }

        async fn insert_many(&self, countries: Vec<Country>) -> Result<Vec<StoredCountry>> {
            if self.fail_inserts.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(Error::Store("insert rejected".to_string()));
            }
            self.inner.insert_many(countries).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_aborts_before_cache_flush() {
        let cache = CacheGateway::new(InMemoryBackend::new());
        let store = Arc::new(FailingStore::default());
        let upstream = Arc::new(StaticUpstream::new(json!([record("Greece")])));
        let job = RefreshJob::new(cache.clone(), store.clone(), upstream);

        let first = job.refresh_all().await.expect("Failed to refresh");
        cache
            .set_structured(key::REGIONS, &json!({"data": {}}))
            .await
            .expect("Failed to set");

        store
            .fail_inserts
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let err = job.refresh_all().await.expect_err("insert must fail");
        assert!(matches!(err, Error::Store(ref msg) if msg == "insert rejected"));

        // Neither flushed nor re-seeded.
        let seeded = cache
            .get_structured_as::<Vec<StoredCountry>>(key::ALL_COUNTRIES)
            .await
            .expect("Failed to read")
            .expect("previous seed kept");
        assert_eq!(seeded, first);
        assert!(cache
            .get_structured(key::REGIONS)
            .await
            .expect("Failed to read")
            .is_some());

        // delete_all already ran; the store stays empty until the next run.
        assert!(store.inner.is_empty().await);
    }

    fn job_with_store(
        store: Arc<InMemoryCountryStore>,
        payload: serde_json::Value,
    ) -> (
        RefreshJob<InMemoryBackend, InMemoryCountryStore, StaticUpstream>,
        CacheGateway<InMemoryBackend>,
        Arc<InMemoryCountryStore>,
    ) {
        let cache = CacheGateway::new(InMemoryBackend::new());
        let upstream = Arc::new(StaticUpstream::new(payload));
        (
            RefreshJob::new(cache.clone(), store.clone(), upstream),
            cache,
            store,
        )
    }
}
