//! Property-based tests for cache keys and rollup ordering.
//!
//! # Properties Tested
//!
//! 1. **Determinism**: the same listing query always maps to the same key
//! 2. **Shape**: keys are `countries:` followed by the set parameters in order
//! 3. **Ordering**: region and language rollups have ascending keys for any
//!    input order

use country_cache::aggregate::{build_languages, build_regions};
use country_cache::key::{CacheKeyBuilder, ListQuery};
use country_cache::Country;
use proptest::prelude::*;

fn list_query() -> impl Strategy<Value = ListQuery> {
    (
        proptest::option::of("[A-Za-z]{1,12}"),
        proptest::option::of(0u64..10_000_000),
        proptest::option::of(0u64..10_000_000),
        1u64..500,
        1u64..100,
    )
        .prop_map(|(region, min_population, max_population, page, page_size)| ListQuery {
            region,
            min_population,
            max_population,
            page,
            page_size,
        })
}

fn country() -> impl Strategy<Value = Country> {
    (
        "[A-Za-z]{1,10}",
        "[A-Za-z]{1,8}",
        proptest::collection::vec("[A-Za-z]{1,8}", 0..4),
        0u64..1_000_000_000,
        0u32..10_000_000,
    )
        .prop_map(|(name, region, languages, population, area)| Country {
            name,
            region,
            languages,
            population,
            area: f64::from(area),
            ..Country::default()
        })
}

fn is_ascending(keys: &[String]) -> bool {
    keys.windows(2).all(|w| w[0] < w[1])
}

proptest! {
    #[test]
    fn prop_list_key_is_deterministic(query in list_query()) {
        let copy = query.clone();
        prop_assert_eq!(CacheKeyBuilder::list(&query), CacheKeyBuilder::list(&copy));
    }

    #[test]
    fn prop_list_key_shape(query in list_query()) {
        let key = CacheKeyBuilder::list(&query);
        let parts = CacheKeyBuilder::parse(&key);

        let expected_len = 3
            + usize::from(query.region.is_some())
            + usize::from(query.min_population.is_some())
            + usize::from(query.max_population.is_some());

        prop_assert_eq!(parts[0], "countries");
        prop_assert_eq!(parts.len(), expected_len);
        prop_assert_eq!(parts[parts.len() - 2], query.page.to_string());
        prop_assert_eq!(parts[parts.len() - 1], query.page_size.to_string());
    }

    #[test]
    fn prop_pages_get_distinct_keys(query in list_query(), other_page in 1u64..500) {
        prop_assume!(other_page != query.page);
        let other = ListQuery { page: other_page, ..query.clone() };
        prop_assert_ne!(CacheKeyBuilder::list(&query), CacheKeyBuilder::list(&other));
    }

    #[test]
    fn prop_country_key_ignores_case(name in "[A-Za-z ]{1,20}") {
        prop_assert_eq!(
            CacheKeyBuilder::country(&name),
            CacheKeyBuilder::country(&name.to_uppercase())
        );
    }

    #[test]
    fn prop_rollup_keys_ascending(countries in proptest::collection::vec(country(), 0..40)) {
        let mut reversed = countries.clone();
        reversed.reverse();

        let regions: Vec<String> = build_regions(&countries).into_keys().collect();
        let languages: Vec<String> = build_languages(&countries).into_keys().collect();
        prop_assert!(is_ascending(&regions));
        prop_assert!(is_ascending(&languages));

        let regions_rev: Vec<String> = build_regions(&reversed).into_keys().collect();
        prop_assert_eq!(regions, regions_rev);
    }

    #[test]
    fn prop_region_totals_add_up(countries in proptest::collection::vec(country(), 0..40)) {
        let regions = build_regions(&countries);

        let members: usize = regions.values().map(|r| r.countries.len()).sum();
        let population: u64 = regions.values().map(|r| r.total_population).sum();
        prop_assert_eq!(members, countries.len());
        prop_assert_eq!(population, countries.iter().map(|c| c.population).sum::<u64>());
    }
}
