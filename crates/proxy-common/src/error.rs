//! Error types for gibs-tile-proxy services.

use thiserror::Error;

/// Result type alias using ProxyError.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Primary error type for proxy operations.
#[derive(Debug, Error)]
pub enum ProxyError {
    // === Client input errors ===
    #[error("Invalid tile coordinates: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid time '{time}' for layer '{layer}'")]
    InvalidTime {
        layer: String,
        time: String,
        /// Number of timestamps the layer actually offers.
        available_count: usize,
        /// Most recent timestamp the layer actually offers.
        latest_available: Option<String>,
    },

    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    // === Data errors ===
    #[error("No timestamps available for layer: {0}")]
    NoTimestamps(String),

    // === Upstream errors ===
    #[error("Upstream fetch failed for {url}: {message}")]
    UpstreamFetch { url: String, message: String },

    // === Admission errors ===
    #[error("Rate limit exceeded for route: {0}")]
    RateLimited(String),

    // === Infrastructure errors ===
    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Capability document parse error: {0}")]
    CapabilityParse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Stable machine-readable reason code, used in JSON error bodies.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ProxyError::InvalidCoordinate(_) => "invalid_tile_coordinates",
            ProxyError::InvalidTime { .. } => "invalid_time_for_layer",
            ProxyError::HostNotAllowed(_) => "host_not_allowed",
            ProxyError::NoTimestamps(_) => "no_timestamps_available",
            ProxyError::UpstreamFetch { .. } => "upstream_fetch_failed",
            ProxyError::RateLimited(_) => "rate_limited",
            ProxyError::CacheError(_) => "cache_error",
            ProxyError::CapabilityParse(_) => "capabilities_parse_failed",
            ProxyError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status code this error surfaces as.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ProxyError::InvalidCoordinate(_)
            | ProxyError::InvalidTime { .. }
            | ProxyError::HostNotAllowed(_) => 400,

            ProxyError::NoTimestamps(_) => 404,

            ProxyError::RateLimited(_) => 429,

            ProxyError::UpstreamFetch { .. } => 502,

            ProxyError::CacheError(_)
            | ProxyError::CapabilityParse(_)
            | ProxyError::Internal(_) => 500,
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Internal(err.to_string())
    }
}
