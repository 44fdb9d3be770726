//! Performance benchmarks for country-cache
//!
//! This benchmark suite measures:
//! - Region/language rollups and statistics over growing datasets
//! - Cache-first region reads (hit path) through the query service
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use country_cache::aggregate::{build_languages, build_regions, compute_statistics};
use country_cache::backend::InMemoryBackend;
use country_cache::observability::NoOpMetrics;
use country_cache::repository::{CountryRepository, InMemoryCountryStore};
use country_cache::{CacheGateway, Country, CountryService};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

const REGIONS: [&str; 5] = ["Africa", "Americas", "Asia", "Europe", "Oceania"];
const LANGUAGES: [&str; 8] = [
    "Arabic", "English", "French", "Hindi", "Mandarin", "Portuguese", "Spanish", "Swahili",
];

fn dataset(size: usize) -> Vec<Country> {
    (0..size)
        .map(|i| Country {
            name: format!("Country {:05}", i),
            region: REGIONS[i % REGIONS.len()].to_string(),
            languages: vec![
                LANGUAGES[i % LANGUAGES.len()].to_string(),
                LANGUAGES[(i * 7 + 3) % LANGUAGES.len()].to_string(),
            ],
            population: (i as u64 * 7_919) % 1_000_000_000,
            area: ((i * 131) % 17_000_000) as f64,
            ..Country::default()
        })
        .collect()
}

fn bench_aggregates(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [250usize, 1_000, 10_000].iter() {
        let countries = dataset(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("regions", size), &countries, |b, countries| {
            b.iter(|| build_regions(black_box(countries)));
        });

        group.bench_with_input(
            BenchmarkId::new("languages", size),
            &countries,
            |b, countries| {
                b.iter(|| build_languages(black_box(countries)));
            },
        );

        let languages = build_languages(&countries);
        group.bench_with_input(
            BenchmarkId::new("statistics", size),
            &countries,
            |b, countries| {
                b.iter(|| compute_statistics(black_box(countries), black_box(&languages)));
            },
        );
    }

    group.finish();
}

fn bench_cached_regions(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    let service = rt.block_on(async {
        let store = Arc::new(InMemoryCountryStore::new());
        store
            .insert_many(dataset(250))
            .await
            .expect("Failed to seed store");

        let service = CountryService::new(CacheGateway::new(InMemoryBackend::new()), store)
            .with_metrics(Arc::new(NoOpMetrics));
        service.regions().await.expect("Failed to warm cache");
        service
    });

    c.bench_function("service/regions_hit", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(service.regions().await.expect("Failed to read regions"));
        });
    });
}

criterion_group!(benches, bench_aggregates, bench_cached_regions);
criterion_main!(benches);
