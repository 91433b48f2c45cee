//! Error types for the spot price mirror

use thiserror::Error;

/// Reasons a single pair's fetch can fail during a polling cycle
///
/// Every variant is per-pair and non-fatal: the poller records it and
/// moves on to the next cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Upstream answered with HTTP 429
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Upstream answered with any other non-2xx status
    #[error("HTTP error: {0}")]
    Http(u16),

    /// No response within the request timeout
    #[error("Request timeout")]
    Timeout,

    /// 2xx response without a usable `data.amount`
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Transport-level failure (DNS, connection reset, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Short machine-readable reason, e.g. `rate_limited` or `http_503`
    pub fn reason(&self) -> String {
        match self {
            FetchError::RateLimited => "rate_limited".to_string(),
            FetchError::Http(status) => format!("http_{}", status),
            FetchError::Timeout => "timeout".to_string(),
            FetchError::MalformedResponse(_) => "malformed_response".to_string(),
            FetchError::Network(_) => "network_error".to_string(),
        }
    }

    /// Creates a MalformedResponse error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Errors raised while loading runtime configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("No currency pairs configured")]
    NoPairs,

    #[error("Invalid upstream base URL: {0}")]
    InvalidBaseUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(FetchError::RateLimited.reason(), "rate_limited");
        assert_eq!(FetchError::Http(503).reason(), "http_503");
        assert_eq!(FetchError::Timeout.reason(), "timeout");
        assert_eq!(FetchError::malformed("no amount").reason(), "malformed_response");
        assert_eq!(
            FetchError::Network("connection reset".into()).reason(),
            "network_error"
        );
    }

    #[test]
    fn test_network_error_keeps_message() {
        let err = FetchError::Network("dns lookup failed".into());
        assert_eq!(err.to_string(), "Network error: dns lookup failed");
    }
}
