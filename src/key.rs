//! Cache key derivation.
//!
//! Keys are namespaced by resource type (`countries`, `regions`, ...) and,
//! for parameterised reads, by a fingerprint of the query. Every function
//! here is pure so key shapes can be tested without a backend.

/// Key of the seeded full dataset written by the refresh job.
pub const ALL_COUNTRIES: &str = "countries:all";
/// Key of the cached region rollup.
pub const REGIONS: &str = "regions:all";
/// Key of the cached language rollup.
pub const LANGUAGES: &str = "languages:all";
/// Key of the cached statistics snapshot.
pub const STATISTICS: &str = "statistics:all";

const COUNTRIES_PREFIX: &str = "countries";

/// Fully resolved parameters of a country listing.
///
/// Pagination values are already defaulted; filters stay optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub region: Option<String>,
    pub min_population: Option<u64>,
    pub max_population: Option<u64>,
    pub page: u64,
    pub page_size: u64,
}

impl ListQuery {
    /// Number of records to skip for the requested page.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Key for a paginated listing:
    /// `countries:<region>:<minPop>:<maxPop>:<page>:<pageSize>`.
    ///
    /// Absent filters (and an empty region) are skipped rather than left
    /// as empty segments.
    pub fn list(query: &ListQuery) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(6);
        parts.push(COUNTRIES_PREFIX.to_string());
        if let Some(region) = query.region.as_deref().filter(|r| !r.is_empty()) {
            parts.push(region.to_string());
        }
        if let Some(min) = query.min_population {
            parts.push(min.to_string());
        }
        if let Some(max) = query.max_population {
            parts.push(max.to_string());
        }
        parts.push(query.page.to_string());
        parts.push(query.page_size.to_string());
        parts.join(":")
    }

    /// Key for a single-country lookup: `countries:<lowercased name>`.
    pub fn country(name: &str) -> String {
        Self::build_composite(&[COUNTRIES_PREFIX, &name.to_lowercase()])
    }

    /// Build composite key from multiple parts.
    pub fn build_composite(parts: &[&str]) -> String {
        parts.join(":")
    }

    /// Split a key into its segments.
    pub fn parse(key: &str) -> Vec<&str> {
        key.split(':').collect()
    }
}
