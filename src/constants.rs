//! Constants for the spot price mirror
//!
//! Timing behaviour of the poller and the serving layer is fixed here.
//! Only the port, upstream URL and tracked pairs are runtime configuration
//! (see [`crate::config`]).

/// Initial and minimum polling interval (in milliseconds)
pub const MIN_INTERVAL_MS: u64 = 2_500;

/// Upper bound for the polling interval under backoff (in milliseconds)
pub const MAX_INTERVAL_MS: u64 = 20_000;

/// Factor applied to the interval on each rate-limited or successful fetch
pub const BACKOFF_MULTIPLIER: u64 = 2;

/// Hard timeout for a single upstream request (in milliseconds)
pub const REQUEST_TIMEOUT_MS: u64 = 5_000;

/// How long before a cached quote is considered stale (in milliseconds)
pub const STALE_THRESHOLD_MS: u64 = 60_000;

/// Base asset assumed when upstream omits it
pub const DEFAULT_BASE: &str = "BTC";

/// Coinbase spot price API base URL
pub const COINBASE_API_URL: &str = "https://api.coinbase.com/v2/prices";

/// Pairs mirrored by default
pub const DEFAULT_PAIRS: &[&str] = &[
    "BTC-USD", "BTC-EUR", "BTC-CAD", "BTC-BRL", "BTC-MXP", "BTC-GBP", "BTC-CHF", "BTC-JPY",
    "BTC-AUD",
];

/// Default listening port
pub const DEFAULT_PORT: u16 = 8888;

/// User agent for upstream requests
pub const USER_AGENT: &str = concat!("spot-price-mirror/", env!("CARGO_PKG_VERSION"));

/// Per-IP request budget of the serving layer within one window
pub const CLIENT_RATE_LIMIT_MAX: u32 = 100;

/// Length of the per-IP rate limit window (in seconds)
pub const CLIENT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Forced exit deadline once shutdown has started (in seconds)
pub const SHUTDOWN_DEADLINE_SECS: u64 = 10;
