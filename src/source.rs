//! Source abstraction for fetching spot prices from upstream

use crate::{
    error::FetchError,
    types::{CurrencyPair, SpotPrice},
};
use async_trait::async_trait;

/// Trait for upstream spot price sources
///
/// An implementation issues exactly one request for one pair and maps the
/// response onto [`FetchError`]. Timeouts, backoff and caching are handled
/// by the [`PriceFetcher`](crate::fetcher::PriceFetcher).
#[async_trait]
pub trait SpotPriceSource: Send + Sync {
    /// Fetches the current spot price for `pair`
    async fn fetch_spot(&self, pair: &CurrencyPair) -> Result<SpotPrice, FetchError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}
