//! Runtime configuration loaded from the environment
//!
//! Only deployment-specific values live here; poller timing is fixed in
//! [`crate::constants`].

use crate::{
    constants::{COINBASE_API_URL, DEFAULT_PAIRS, DEFAULT_PORT},
    error::ConfigError,
    types::CurrencyPair,
};
use std::net::{Ipv4Addr, SocketAddr};

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listening port, bound on all interfaces
    pub port: u16,
    /// Upstream base URL without trailing slash
    pub upstream_base_url: String,
    /// Pairs to mirror, normalized and de-duplicated
    pub pairs: Vec<CurrencyPair>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_base_url: COINBASE_API_URL.to_string(),
            pairs: DEFAULT_PAIRS.iter().map(|p| CurrencyPair::new(p)).collect(),
        }
    }
}

impl Config {
    /// Reads `PORT`, `UPSTREAM_BASE_URL` and `TRACKED_PAIRS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup
    ///
    /// Unset and blank variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get("PORT") {
            config.port = value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value, source })?;
        }

        if let Some(value) = get("UPSTREAM_BASE_URL") {
            config.upstream_base_url = validate_base_url(value.trim())?;
        }

        if let Some(value) = get("TRACKED_PAIRS") {
            config.pairs = parse_pairs(&value);
            if config.pairs.is_empty() {
                return Err(ConfigError::NoPairs);
            }
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

/// Splits a comma-separated pair list, dropping blanks and duplicates
pub fn parse_pairs(raw: &str) -> Vec<CurrencyPair> {
    let mut pairs: Vec<CurrencyPair> = Vec::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let pair = CurrencyPair::new(pair);
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(format!(
            "{}: unsupported scheme {}",
            raw,
            url.scheme()
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
