//! Error types for the offline layer

use std::time::Duration;
use thiserror::Error;

/// Result type alias for offline-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Errors from the remote data service boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed. Sign in again to refresh your session token.")]
    Unauthorized,

    #[error("Access denied. You don't have permission to access this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Offline and no cached copy is available")]
    Offline,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl ApiError {
    /// Whether this failure is a connectivity problem rather than a
    /// server-side rejection. Connectivity failures are the ones the
    /// offline layer recovers from (cached fallback, queued delivery).
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Offline)
    }
}

/// Errors raised eagerly when staging a mutation into an outbox.
///
/// These are programmer errors in the calling code, not runtime failures,
/// so they surface at enqueue time instead of being swallowed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queued payload must carry an `id` field")]
    MissingId,

    #[error("HTTP method `{0}` is not allowed for queued delivery (use POST, PUT or PATCH)")]
    UnsupportedMethod(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
