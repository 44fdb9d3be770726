//! Application configuration from environment variables.
//!
//! `AppConfig::from_env` loads `.env` (if present) through `dotenv` and then
//! reads the process environment. `from_lookup` takes any key lookup so
//! configuration can be tested without touching global state.

use crate::error::{Error, Result};
use crate::gateway::DEFAULT_TTL;
use crate::schedule::{DailySchedule, DEFAULT_CRON, DEFAULT_UTC_OFFSET};
use crate::upstream::{DEFAULT_BASE_URL, DEFAULT_PATH};
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "redis")]
use crate::backend::RedisConfig;

/// Which cache backend to run with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheKind {
    #[default]
    Memory,
    Redis,
}

impl FromStr for CacheKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" => Ok(CacheKind::Memory),
            "redis" => Ok(CacheKind::Redis),
            other => Err(Error::Config(format!(
                "CACHE_BACKEND must be 'memory' or 'redis', got '{}'",
                other
            ))),
        }
    }
}

/// Which document store to run with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreKind {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" => Ok(StoreKind::Memory),
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            other => Err(Error::Config(format!(
                "STORE_BACKEND must be 'memory' or 'postgres', got '{}'",
                other
            ))),
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Route prefix; empty mounts routes at the root.
    pub api_prefix: String,
    pub cache_backend: CacheKind,
    #[cfg(feature = "redis")]
    pub redis: RedisConfig,
    pub cache_ttl: Duration,
    pub store_backend: StoreKind,
    pub database_url: Option<String>,
    pub upstream_base_url: String,
    pub upstream_path: String,
    pub schedule: DailySchedule,
    pub refresh_on_startup: bool,
}

impl AppConfig {
    /// Load `.env`, then read the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for malformed or inconsistent values.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for malformed or inconsistent values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let cache_backend: CacheKind = get("CACHE_BACKEND")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();
        let store_backend: StoreKind = get("STORE_BACKEND")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        if cfg!(not(feature = "redis")) && cache_backend == CacheKind::Redis {
            return Err(Error::Config(
                "CACHE_BACKEND=redis requires the 'redis' feature".to_string(),
            ));
        }
        if cfg!(not(feature = "postgres")) && store_backend == StoreKind::Postgres {
            return Err(Error::Config(
                "STORE_BACKEND=postgres requires the 'postgres' feature".to_string(),
            ));
        }

        let database_url = get("DATABASE_URL");
        if store_backend == StoreKind::Postgres && database_url.is_none() {
            return Err(Error::Config(
                "DATABASE_URL must be set when STORE_BACKEND=postgres".to_string(),
            ));
        }

        let schedule = DailySchedule::parse(
            &get("REFRESH_CRON").unwrap_or_else(|| DEFAULT_CRON.to_string()),
            &get("REFRESH_UTC_OFFSET").unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string()),
        )?;

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", get("PORT"), 3000)?,
            api_prefix: get("API_PREFIX").unwrap_or_default(),
            cache_backend,
            #[cfg(feature = "redis")]
            redis: redis_config(&get)?,
            cache_ttl: match get("CACHE_TTL_SECS") {
                Some(raw) => Duration::from_secs(parse_or("CACHE_TTL_SECS", Some(raw), 0)?),
                None => DEFAULT_TTL,
            },
            store_backend,
            database_url,
            upstream_base_url: get("REST_COUNTRIES_API_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            upstream_path: get("REST_COUNTRIES_PATH").unwrap_or_else(|| DEFAULT_PATH.to_string()),
            schedule,
            refresh_on_startup: parse_bool("REFRESH_ON_STARTUP", get("REFRESH_ON_STARTUP"))?,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(feature = "redis")]
fn redis_config(get: &impl Fn(&str) -> Option<String>) -> Result<RedisConfig> {
    let defaults = RedisConfig::default();
    Ok(RedisConfig {
        host: get("REDIS_HOST").unwrap_or(defaults.host),
        port: parse_or("REDIS_PORT", get("REDIS_PORT"), defaults.port)?,
        username: get("REDIS_USER"),
        password: get("REDIS_PASSWORD"),
        database: parse_or("REDIS_DATABASE", get("REDIS_DATABASE"), defaults.database)?,
        pool_size: parse_or("REDIS_POOL_SIZE", get("REDIS_POOL_SIZE"), defaults.pool_size)?,
    })
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<bool> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(Error::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
