//! HTTP surface: axum router, handlers and request logging.
//!
//! Handlers never return errors to axum. Every failure is rendered as an
//! error envelope by [`ServiceResponse`].

use crate::backend::CacheBackend;
use crate::refresh::RefreshJob;
use crate::repository::CountryRepository;
use crate::response::ServiceResponse;
use crate::service::{CountryService, ListParams};
use crate::upstream::UpstreamSource;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::time::Instant;

/// Shared handler state.
pub struct AppState<B: CacheBackend, R: CountryRepository, U: UpstreamSource> {
    pub service: CountryService<B, R>,
    pub refresh: RefreshJob<B, R, U>,
}

impl<B: CacheBackend, R: CountryRepository, U: UpstreamSource> Clone for AppState<B, R, U> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

impl<B: CacheBackend, R: CountryRepository, U: UpstreamSource> AppState<B, R, U> {
    pub fn new(service: CountryService<B, R>, refresh: RefreshJob<B, R, U>) -> Self {
        Self { service, refresh }
    }
}

/// Build the application router, optionally nested under `prefix`.
///
/// ```
/// use country_cache::backend::InMemoryBackend;
/// use country_cache::http::{router, AppState};
/// use country_cache::refresh::RefreshJob;
/// use country_cache::repository::InMemoryCountryStore;
/// use country_cache::upstream::StaticUpstream;
/// use country_cache::{CacheGateway, CountryService};
/// use std::sync::Arc;
///
/// let cache = CacheGateway::new(InMemoryBackend::new());
/// let store = Arc::new(InMemoryCountryStore::new());
/// let upstream = Arc::new(StaticUpstream::new(serde_json::json!([])));
///
/// let state = AppState::new(
///     CountryService::new(cache.clone(), store.clone()),
///     RefreshJob::new(cache, store, upstream),
/// );
/// let app = router(state, "/api");
/// ```
pub fn router<B, R, U>(state: AppState<B, R, U>, prefix: &str) -> Router
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    let routes = Router::new()
        .route("/", get(welcome))
        .route("/health", get(health::<B, R, U>))
        .route("/countries", get(list_countries::<B, R, U>))
        .route("/countries/{name}", get(get_country::<B, R, U>))
        .route("/regions", get(regions::<B, R, U>))
        .route("/languages", get(languages::<B, R, U>))
        .route("/statistics", get(statistics::<B, R, U>))
        .route("/job/allCountries", get(refresh_all::<B, R, U>))
        .with_state(state);

    let prefix = normalize_prefix(prefix);
    let app = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&prefix, routes)
    };

    app.fallback(not_found)
        .layer(middleware::from_fn(log_request))
}

/// `""`, `"/"` and `"api/"` become `""`, `""` and `"/api"`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Log method, path, status and latency of every request.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({:?})",
        method,
        uri,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

fn render(result: crate::Result<ServiceResponse>) -> ServiceResponse {
    result.unwrap_or_else(ServiceResponse::from)
}

async fn welcome() -> ServiceResponse {
    ServiceResponse::success("Welcome", None, None)
}

async fn not_found() -> ServiceResponse {
    ServiceResponse::error(
        None,
        Some("Resource not found".to_string()),
        Some(StatusCode::NOT_FOUND),
        None,
    )
}

async fn health<B, R, U>(State(state): State<AppState<B, R, U>>) -> ServiceResponse
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    let report = state.service.health().await;
    let data = serde_json::to_value(report).ok();

    if report.is_healthy() {
        ServiceResponse::success("Service healthy", data, None)
    } else {
        ServiceResponse::error(
            None,
            Some("Service unhealthy".to_string()),
            Some(StatusCode::SERVICE_UNAVAILABLE),
            data,
        )
    }
}

async fn list_countries<B, R, U>(
    State(state): State<AppState<B, R, U>>,
    Query(params): Query<ListParams>,
) -> ServiceResponse
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    render(state.service.list_countries(&params).await)
}

async fn get_country<B, R, U>(
    State(state): State<AppState<B, R, U>>,
    Path(name): Path<String>,
) -> ServiceResponse
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    render(state.service.get_country(&name).await)
}

async fn regions<B, R, U>(State(state): State<AppState<B, R, U>>) -> ServiceResponse
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    render(state.service.regions().await)
}

async fn languages<B, R, U>(State(state): State<AppState<B, R, U>>) -> ServiceResponse
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    render(state.service.languages().await)
}

async fn statistics<B, R, U>(State(state): State<AppState<B, R, U>>) -> ServiceResponse
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    render(state.service.statistics().await)
}

async fn refresh_all<B, R, U>(State(state): State<AppState<B, R, U>>) -> ServiceResponse
where
    B: CacheBackend,
    R: CountryRepository,
    U: UpstreamSource,
{
    render(state.refresh.trigger().await)
}
