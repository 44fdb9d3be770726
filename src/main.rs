use country_cache::backend::{CacheBackend, InMemoryBackend};
use country_cache::config::{AppConfig, CacheKind, StoreKind};
use country_cache::http::{router, AppState};
use country_cache::observability::AtomicMetrics;
use country_cache::repository::{CountryRepository, InMemoryCountryStore};
use country_cache::upstream::HttpUpstream;
use country_cache::{CacheGateway, CountryService, RefreshJob};
use log::{error, info, warn};
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("✗ country-cache stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = AppConfig::from_env()?;
    info!(
        "Starting country-cache v{} (cache: {:?}, store: {:?})",
        country_cache::VERSION,
        config.cache_backend,
        config.store_backend
    );

    match config.cache_backend {
        CacheKind::Memory => with_store(config, InMemoryBackend::new()).await,
        CacheKind::Redis => with_redis(config).await,
    }
}

#[cfg(feature = "redis")]
async fn with_redis(config: AppConfig) -> Result<(), BoxError> {
    let backend = country_cache::backend::RedisBackend::new(config.redis.clone()).await?;
    let stats = backend.pool_stats();
    log::debug!(
        "Redis pool: {} connections, {} idle",
        stats.connections, stats.idle_connections
    );
    with_store(config, backend).await
}

#[cfg(not(feature = "redis"))]
async fn with_redis(_config: AppConfig) -> Result<(), BoxError> {
    Err("CACHE_BACKEND=redis requires the 'redis' feature".into())
}

async fn with_store<B: CacheBackend>(config: AppConfig, backend: B) -> Result<(), BoxError> {
    match config.store_backend {
        StoreKind::Memory => serve(config, backend, InMemoryCountryStore::new()).await,
        StoreKind::Postgres => with_postgres(config, backend).await,
    }
}

#[cfg(feature = "postgres")]
async fn with_postgres<B: CacheBackend>(config: AppConfig, backend: B) -> Result<(), BoxError> {
    let url = config
        .database_url
        .clone()
        .ok_or("DATABASE_URL must be set when STORE_BACKEND=postgres")?;
    let store = country_cache::repository::PgCountryStore::connect(&url).await?;
    serve(config, backend, store).await
}

#[cfg(not(feature = "postgres"))]
async fn with_postgres<B: CacheBackend>(_config: AppConfig, _backend: B) -> Result<(), BoxError> {
    Err("STORE_BACKEND=postgres requires the 'postgres' feature".into())
}

async fn serve<B, R>(config: AppConfig, backend: B, store: R) -> Result<(), BoxError>
where
    B: CacheBackend,
    R: CountryRepository,
{
    let cache = CacheGateway::new(backend).with_ttl(config.cache_ttl);
    let store = Arc::new(store);
    let upstream = Arc::new(HttpUpstream::new(
        config.upstream_base_url.clone(),
        config.upstream_path.clone(),
    ));

    let service = CountryService::new(cache.clone(), store.clone())
        .with_metrics(Arc::new(AtomicMetrics::new()));
    let refresh = RefreshJob::new(cache, store, upstream);

    if config.refresh_on_startup {
        match refresh.refresh_all().await {
            Ok(inserted) => info!("✓ Startup refresh stored {} countries", inserted.len()),
            Err(e) => warn!("Startup refresh failed: {}", e),
        }
    }

    let scheduler = config.schedule.spawn(refresh.clone());
    info!("Country refresh runs {}", config.schedule);

    let app = router(AppState::new(service, refresh), &config.api_prefix);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("✓ Listening on http://{}{}", listener.local_addr()?, config.api_prefix);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
