//! Cache-first query service.
//!
//! Every read follows the same path: derive a key, return the cached
//! payload on a hit, otherwise compute from the store, write the result back
//! and return it. Hits and misses produce identical envelopes because both
//! come from the same `{data, meta}` payload.
//!
//! Concurrent misses on the same key both compute; the last write wins.

use crate::aggregate::{self, Languages, Statistics};
use crate::backend::CacheBackend;
use crate::error::{Error, Result};
use crate::gateway::CacheGateway;
use crate::key::{self, CacheKeyBuilder, ListQuery};
use crate::model::StoredCountry;
use crate::observability::{CacheMetrics, LogMetrics, MetricsSnapshot};
use crate::repository::{CountryFilter, CountryRepository};
use crate::response::ServiceResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Page used when none (or an unusable one) is requested.
pub const DEFAULT_PAGE: u64 = 1;
/// Page size used when none (or an unusable one) is requested.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Shape in which endpoint results are cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedPayload<T, M = serde_json::Value> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<M>,
}

impl CachedPayload<serde_json::Value> {
    /// Decode a cache entry, accepting only the `{data, meta?}` object shape.
    ///
    /// Other entries under the `countries:` namespace (the seeded dataset
    /// array) would otherwise decode as a sequence.
    pub fn from_entry(entry: serde_json::Value) -> Option<Self> {
        let mut fields = match entry {
            serde_json::Value::Object(fields) => fields,
            _ => return None,
        };
        let data = fields.remove("data")?;
        let meta = fields.remove("meta");

        fields.is_empty().then_some(CachedPayload { data, meta })
    }
}

/// Pagination metadata of a country listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub page_count: u64,
}

/// Metadata of a keyed rollup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalMeta {
    pub total: usize,
}

/// Raw listing parameters as they arrive on the query string.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub region: Option<String>,
    pub min_population: Option<String>,
    pub max_population: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ListParams {
    /// Apply defaults and validate.
    ///
    /// A missing, non-numeric or zero page/page size falls back to the
    /// default. An empty region or bound counts as absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuery` if a population bound is not a
    /// non-negative integer.
    pub fn resolve(&self) -> Result<ListQuery> {
        Ok(ListQuery {
            region: non_empty(&self.region).map(str::to_string),
            min_population: population_bound("minPopulation", &self.min_population)?,
            max_population: population_bound("maxPopulation", &self.max_population)?,
            page: positive_or(&self.page, DEFAULT_PAGE),
            page_size: positive_or(&self.page_size, DEFAULT_PAGE_SIZE),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn positive_or(value: &Option<String>, default: u64) -> u64 {
    non_empty(value)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

fn population_bound(name: &str, value: &Option<String>) -> Result<Option<u64>> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
            Error::InvalidQuery(format!(
                "{} must be a non-negative integer, got '{}'",
                name, raw
            ))
        }),
    }
}

/// Store/cache health as reported by `/health`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub cache: bool,
    pub store: bool,
    /// Lookup counters when the service runs with counting metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.cache && self.store
    }
}

/// Read side of the API.
pub struct CountryService<B: CacheBackend, R: CountryRepository> {
    cache: CacheGateway<B>,
    store: Arc<R>,
    metrics: Arc<dyn CacheMetrics>,
}

impl<B: CacheBackend, R: CountryRepository> Clone for CountryService<B, R> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<B: CacheBackend, R: CountryRepository> CountryService<B, R> {
    /// Create a service logging its cache activity.
    pub fn new(cache: CacheGateway<B>, store: Arc<R>) -> Self {
        Self {
            cache,
            store,
            metrics: Arc::new(LogMetrics),
        }
    }

    /// Replace the metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn cache(&self) -> &CacheGateway<B> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<R> {
        &self.store
    }

    /// Filtered, paginated country listing.
    ///
    /// # Errors
    ///
    /// `Error::InvalidQuery` for malformed bounds; cache and store failures
    /// propagate.
    pub async fn list_countries(&self, params: &ListParams) -> Result<ServiceResponse> {
        let query = params.resolve()?;
        let key = CacheKeyBuilder::list(&query);

        let payload = match self.lookup(&key).await? {
            Some(hit) => hit,
            None => {
                let filter = CountryFilter {
                    region: query.region.clone(),
                    min_population: query.min_population,
                    max_population: query.max_population,
                };
                let countries = self
                    .store
                    .find(&filter, query.skip(), query.page_size)
                    .await?;
                let total = self.store.count(&filter).await?;
                let meta = ListMeta {
                    page: query.page,
                    page_size: query.page_size,
                    total,
                    page_count: total.div_ceil(query.page_size),
                };

                self.write_back(&key, &countries, Some(&meta)).await?
            }
        };

        Ok(respond("Countries successfully retrieved", payload))
    }

    /// Single country by exact name. The cache key is case-insensitive; the
    /// store match is not.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when the store has no such country.
    pub async fn get_country(&self, name: &str) -> Result<ServiceResponse> {
        let key = CacheKeyBuilder::country(name);

        let payload = match self.lookup_matching(&key, |hit| hit.data.is_object()).await? {
            Some(hit) => hit,
            None => {
                let country = self.store.find_one_by_name(name).await?.ok_or_else(|| {
                    Error::NotFound(format!("No country information was found for {}", name))
                })?;

                self.write_back::<_, ()>(&key, &country, None).await?
            }
        };

        Ok(respond("Country successfully retrieved", payload))
    }

    /// Region rollup, keys ascending.
    pub async fn regions(&self) -> Result<ServiceResponse> {
        let payload = match self.lookup(key::REGIONS).await? {
            Some(hit) => hit,
            None => {
                let countries = self.all_countries().await?;
                let regions = aggregate::build_regions(countries.iter().map(|c| &c.country));
                let meta = TotalMeta {
                    total: regions.len(),
                };

                self.write_back(key::REGIONS, &regions, Some(&meta)).await?
            }
        };

        Ok(respond("Regions successfully retrieved", payload))
    }

    /// Language rollup, keys ascending.
    pub async fn languages(&self) -> Result<ServiceResponse> {
        let payload = match self.lookup(key::LANGUAGES).await? {
            Some(hit) => hit,
            None => {
                let countries = self.all_countries().await?;
                let languages = aggregate::build_languages(countries.iter().map(|c| &c.country));
                let meta = TotalMeta {
                    total: languages.len(),
                };

                self.write_back(key::LANGUAGES, &languages, Some(&meta)).await?
            }
        };

        Ok(respond("Languages successfully retrieved", payload))
    }

    /// Dataset-wide superlatives.
    pub async fn statistics(&self) -> Result<ServiceResponse> {
        let payload = match self.lookup(key::STATISTICS).await? {
            Some(hit) => hit,
            None => {
                let statistics = self.compute_statistics().await?;
                self.write_back::<_, ()>(key::STATISTICS, &statistics, None)
                    .await?
            }
        };

        Ok(respond("Statistics computed successfully", payload))
    }

    /// Probe the cache backend and the store. Failures count as unhealthy.
    pub async fn health(&self) -> HealthReport {
        let cache = match self.cache.backend().health_check().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Cache health check failed: {}", e);
                false
            }
        };
        let store = match self.store.health_check().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Store health check failed: {}", e);
                false
            }
        };

        HealthReport {
            cache,
            store,
            metrics: self.metrics.counters(),
        }
    }

    async fn compute_statistics(&self) -> Result<Statistics> {
        let countries = self.all_countries().await?;

        let cached_languages = self
            .cache
            .get_structured_as::<CachedPayload<Languages>>(key::LANGUAGES)
            .await?;
        let languages = match cached_languages {
            Some(payload) => payload.data,
            None => aggregate::build_languages(countries.iter().map(|c| &c.country)),
        };

        Ok(aggregate::compute_statistics(
            countries.iter().map(|c| &c.country),
            &languages,
        ))
    }

    /// The seeded full dataset, or the store when it is not cached.
    async fn all_countries(&self) -> Result<Vec<StoredCountry>> {
        match self.cache.get_structured(key::ALL_COUNTRIES).await? {
            Some(entry @ serde_json::Value::Array(_)) => Ok(serde_json::from_value(entry)?),
            Some(_) => {
                warn!("{} is not a country array, reading store", key::ALL_COUNTRIES);
                self.store.find_all().await
            }
            None => {
                debug!("{} not cached, reading store", key::ALL_COUNTRIES);
                self.store.find_all().await
            }
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<CachedPayload<serde_json::Value>>> {
        self.lookup_matching(key, |_| true).await
    }

    /// Cache read that counts entries of the wrong shape as misses.
    async fn lookup_matching(
        &self,
        key: &str,
        accept: fn(&CachedPayload<serde_json::Value>) -> bool,
    ) -> Result<Option<CachedPayload<serde_json::Value>>> {
        let start = Instant::now();
        let entry = self
            .cache
            .get_structured(key)
            .await
            .map(|found| found.map(|v| CachedPayload::from_entry(v).filter(accept)));

        match entry {
            Ok(Some(Some(payload))) => {
                self.metrics.record_hit(key, start.elapsed());
                Ok(Some(payload))
            }
            Ok(Some(None)) => {
                debug!("Ignoring foreign entry under {}", key);
                self.metrics.record_miss(key, start.elapsed());
                Ok(None)
            }
            Ok(None) => {
                self.metrics.record_miss(key, start.elapsed());
                Ok(None)
            }
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                Err(e)
            }
        }
    }

    async fn write_back<T: Serialize, M: Serialize>(
        &self,
        key: &str,
        data: &T,
        meta: Option<&M>,
    ) -> Result<CachedPayload<serde_json::Value>> {
        let payload = CachedPayload {
            data: serde_json::to_value(data)?,
            meta: meta.map(serde_json::to_value).transpose()?,
        };

        let start = Instant::now();
        match self.cache.set_structured(key, &payload).await {
            Ok(()) => {
                self.metrics.record_set(key, start.elapsed());
                Ok(payload)
            }
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                Err(e)
            }
        }
    }
}

fn respond(message: &str, payload: CachedPayload<serde_json::Value>) -> ServiceResponse {
    ServiceResponse::success(message, Some(payload.data), payload.meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::model::Country;
    use crate::observability::AtomicMetrics;
    use crate::repository::InMemoryCountryStore;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "region" => p.region = v,
                "minPopulation" => p.min_population = v,
                "maxPopulation" => p.max_population = v,
                "page" => p.page = v,
                "pageSize" => p.page_size = v,
                _ => unreachable!(),
            }
        }
        p
    }

    async fn service() -> (
        CountryService<InMemoryBackend, InMemoryCountryStore>,
        Arc<AtomicMetrics>,
    ) {
        let store = Arc::new(InMemoryCountryStore::new());
        store
            .insert_many(
                ["Ghana", "Benin", "Togo"]
                    .iter()
                    .enumerate()
                    .map(|(i, name)| Country {
                        name: name.to_string(),
                        region: "Africa".to_string(),
                        population: (i as u64 + 1) * 100,
                        area: 10.0,
                        languages: vec!["French".to_string()],
                        ..Country::default()
                    })
                    .collect(),
            )
            .await
            .expect("Failed to insert");

        let metrics = Arc::new(AtomicMetrics::new());
        let service = CountryService::new(CacheGateway::new(InMemoryBackend::new()), store)
            .with_metrics(metrics.clone());
        (service, metrics)
    }

    #[test]
    fn test_resolve_defaults() {
        let query = ListParams::default().resolve().expect("Failed to resolve");
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.region, None);
    }

    #[test]
    fn test_resolve_bad_pagination_falls_back() {
        let query = params(&[("page", "0"), ("pageSize", "lots")])
            .resolve()
            .expect("Failed to resolve");
        assert_eq!((query.page, query.page_size), (1, 10));
    }

    #[test]
    fn test_resolve_rejects_non_numeric_bound() {
        let err = params(&[("minPopulation", "many")])
            .resolve()
            .expect_err("bound must be numeric");
        assert!(matches!(err, Error::InvalidQuery(msg) if msg.contains("minPopulation")));
    }

    #[test]
    fn test_resolve_empty_values_are_absent() {
        let query = params(&[("region", ""), ("maxPopulation", " ")])
            .resolve()
            .expect("Failed to resolve");
        assert_eq!(query.region, None);
        assert_eq!(query.max_population, None);
    }

    #[tokio::test]
    async fn test_list_miss_then_hit() {
        let (service, metrics) = service().await;
        let p = params(&[("pageSize", "2")]);

        let first = service.list_countries(&p).await.expect("Failed to list");
        let second = service.list_countries(&p).await.expect("Failed to list");

        assert_eq!(first.data, second.data);
        assert_eq!(first.meta, second.meta);
        assert_eq!(
            first.meta,
            Some(json!({"page": 1, "pageSize": 2, "total": 3, "pageCount": 2}))
        );
        let names: Vec<_> = first
            .data
            .as_ref()
            .and_then(|d| d.as_array())
            .expect("data is an array")
            .iter()
            .map(|c| c["name"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["Benin", "Ghana"]);

        let snapshot = metrics.snapshot();
        assert_eq!((snapshot.hits, snapshot.misses, snapshot.sets), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_list_combines_population_bounds() {
        let (service, _) = service().await;
        let resp = service
            .list_countries(&params(&[("minPopulation", "150"), ("maxPopulation", "250")]))
            .await
            .expect("Failed to list");

        assert_eq!(resp.meta.as_ref().map(|m| m["total"].clone()), Some(json!(1)));
        assert_eq!(resp.data.as_ref().map(|d| d[0]["name"].clone()), Some(json!("Benin")));
    }

    #[tokio::test]
    async fn test_get_country_not_found() {
        let (service, _) = service().await;
        let err = service
            .get_country("Atlantis")
            .await
            .expect_err("Atlantis does not exist");

        assert!(matches!(err, Error::NotFound(msg) if msg == "No country information was found for Atlantis"));
        assert!(service
            .cache()
            .get_structured("countries:atlantis")
            .await
            .expect("Failed to read cache")
            .is_none());
    }

    #[tokio::test]
    async fn test_get_country_caches_lowercased_key() {
        let (service, _) = service().await;
        service.get_country("Togo").await.expect("Failed to get");

        let cached = service
            .cache()
            .get_structured("countries:togo")
            .await
            .expect("Failed to read cache")
            .expect("entry cached");
        assert_eq!(cached["data"]["name"], json!("Togo"));
        assert!(cached.get("meta").is_none());
    }

    #[tokio::test]
    async fn test_regions_and_statistics_from_store() {
        let (service, _) = service().await;

        let regions = service.regions().await.expect("Failed to get regions");
        assert_eq!(regions.meta, Some(json!({"total": 1})));
        assert_eq!(
            regions.data.as_ref().map(|d| d["Africa"]["totalPopulation"].clone()),
            Some(json!(600))
        );

        let stats = service.statistics().await.expect("Failed to get statistics");
        let data = stats.data.expect("statistics data");
        assert_eq!(data["countries"], json!(3));
        assert_eq!(data["largestCountryByPopulation"]["country"], json!("Togo"));
        assert_eq!(data["mostSpokenLanguage"]["totalCountries"], json!(3));
        assert!(stats.meta.is_none());
    }

    #[test]
    fn test_from_entry_accepts_only_payload_objects() {
        let payload = CachedPayload::from_entry(json!({"data": [1], "meta": {"total": 1}}))
            .expect("payload shape");
        assert_eq!(payload.data, json!([1]));
        assert_eq!(payload.meta, Some(json!({"total": 1})));

        assert!(CachedPayload::from_entry(json!([{"name": "A"}, {"name": "B"}])).is_none());
        assert!(CachedPayload::from_entry(json!({"name": "A"})).is_none());
        assert!(CachedPayload::from_entry(json!({"data": 1, "extra": 2})).is_none());
    }

    #[tokio::test]
    async fn test_get_country_ignores_cached_list_page() {
        let (service, metrics) = service().await;
        service
            .list_countries(&ListParams::default())
            .await
            .expect("Failed to list");

        // "1:10" lands on the default listing key countries:1:10.
        let err = service
            .get_country("1:10")
            .await
            .expect_err("a list page is not a country");
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(metrics.snapshot().hits, 0);
    }

    #[tokio::test]
    async fn test_health() {
        let (service, _) = service().await;
        service.regions().await.expect("Failed to get regions");
        service.regions().await.expect("Failed to get regions");

        let report = service.health().await;
        assert!(report.is_healthy());
        let counters = report.metrics.expect("atomic metrics report counters");
        assert_eq!((counters.hits, counters.misses, counters.sets), (1, 1, 1));
    }
}
