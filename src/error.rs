//! Error types for the country cache service.

use thiserror::Error;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the country cache service.
///
/// Every variant carries a human-readable message; the HTTP layer turns
/// any of them into an error envelope (see [`crate::response`]).
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The upstream data provider could not be reached or returned a
    /// non-success status / unparsable body.
    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    /// An upstream record did not have the expected shape.
    ///
    /// Raised by the mapper when a required field is missing or a field has
    /// the wrong JSON type. Indicates malformed upstream data.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// The requested entity does not exist in the document store.
    ///
    /// The message is returned to the client verbatim.
    #[error("{0}")]
    NotFound(String),

    /// Query parameters could not be interpreted.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Document store operation failed.
    ///
    /// Common causes:
    /// - Database connection lost
    /// - Query or migration failure
    #[error("Store error: {0}")]
    Store(String),

    /// Cache backend operation failed.
    ///
    /// The cache gateway never swallows these; they propagate to the
    /// endpoint handler which reports them as a 500.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A value could not be encoded to or decoded from JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid or missing configuration.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Cache(e.to_string())
        } else {
            Error::Serialization(e.to_string())
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::UpstreamFetch(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Cache(format!("Redis error: {}", e))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Store(e.to_string())
    }
}
