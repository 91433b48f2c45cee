//! # Spot Price Mirror
//!
//! Mirrors cryptocurrency spot prices from the Coinbase REST API into memory
//! and serves them back in the same response format, decoupling "when we ask
//! upstream" from "when clients ask us".
//!
//! ## Usage
//!
//! State is owned explicitly; nothing is global:
//!
//! ```no_run
//! use spot_price_mirror::{poller, CoinbaseSource, PriceCache, PriceFetcher};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(PriceCache::new());
//! let source = Arc::new(CoinbaseSource::new()?);
//! let fetcher = Arc::new(PriceFetcher::new(
//!     source,
//!     cache.clone(),
//!     vec!["BTC-USD".into(), "BTC-EUR".into()],
//! ));
//!
//! let cancel = CancellationToken::new();
//! let polling = poller::spawn(fetcher, cancel.clone());
//!
//! if let Some(lookup) = cache.get("btc-usd").await {
//!     println!("BTC-USD: {} (stale: {})", lookup.data.amount, lookup.is_stale);
//! }
//!
//! cancel.cancel();
//! polling.await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! poller::run (wait current interval, repeat)
//!     ↓
//! PriceFetcher::fetch_all_prices (one request per pair, concurrently)
//!     ↓                         ↘
//! SpotPriceSource (Coinbase)     PollerState (adaptive interval)
//!     ↓
//! PriceCache (latest quote per pair, staleness on read)
//!     ↓
//! server (GET /v2/prices/:pair/spot)
//! ```
//!
//! ## Adaptive interval
//!
//! Every 429 doubles the polling interval (up to 20 s) and every successful
//! fetch halves it (down to 2.5 s). Both steps are applied per pair, so a
//! cycle with several rate-limited pairs backs off several times at once.

pub mod backoff;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod poller;
pub mod server;
pub mod source;
pub mod sources;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use backoff::{next_interval, BackoffPolicy, PollerState};
pub use cache::PriceCache;
pub use config::Config;
pub use error::{ConfigError, FetchError};
pub use fetcher::PriceFetcher;
pub use metrics::MetricsSnapshot;
pub use source::SpotPriceSource;
pub use sources::CoinbaseSource;
pub use types::{CurrencyPair, CycleSummary, FetchOutcome, PriceLookup, SpotPrice};
