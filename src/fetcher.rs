//! Price fetcher
//!
//! Runs one polling cycle over all tracked pairs and maintains the adaptive
//! polling interval.

use crate::{
    backoff::{BackoffPolicy, PollerState},
    cache::PriceCache,
    constants::REQUEST_TIMEOUT_MS,
    error::FetchError,
    metrics::UpstreamMetrics,
    source::SpotPriceSource,
    types::{CurrencyPair, CycleSummary, FetchOutcome},
};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};

/// Fetches all tracked pairs from a [`SpotPriceSource`] into a [`PriceCache`]
///
/// # Example
/// ```no_run
/// use spot_price_mirror::{CoinbaseSource, PriceCache, PriceFetcher};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = Arc::new(PriceCache::new());
/// let source = Arc::new(CoinbaseSource::new()?);
/// let fetcher = PriceFetcher::new(source, cache.clone(), vec!["BTC-USD".into()]);
///
/// let summary = fetcher.fetch_all_prices().await;
/// println!("{} ok, {} failed", summary.success, summary.failed);
/// println!("next cycle in {:?}", fetcher.current_interval().await);
/// # Ok(())
/// # }
/// ```
pub struct PriceFetcher {
    source: Arc<dyn SpotPriceSource>,
    cache: Arc<PriceCache>,
    metrics: UpstreamMetrics,
    pairs: Vec<CurrencyPair>,
    state: Mutex<PollerState>,
    request_timeout: Duration,
}

impl PriceFetcher {
    /// Creates a fetcher with the default backoff policy and request timeout
    pub fn new(
        source: Arc<dyn SpotPriceSource>,
        cache: Arc<PriceCache>,
        pairs: Vec<CurrencyPair>,
    ) -> Self {
        Self {
            source,
            cache,
            metrics: UpstreamMetrics::new(),
            pairs,
            state: Mutex::new(PollerState::default()),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }

    /// Replaces the backoff policy, resetting the interval to its minimum
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.state = Mutex::new(PollerState::new(policy));
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Fetches one pair, updating the cache and the interval
    ///
    /// Never fails as a whole: every failure is reported in the outcome.
    pub async fn fetch_one(&self, pair: &CurrencyPair) -> FetchOutcome {
        let start = Instant::now();
        let result = match timeout(self.request_timeout, self.source.fetch_spot(pair)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };
        self.metrics
            .record(start.elapsed(), result.as_ref().map(|_| ()))
            .await;

        match result {
            Ok(price) => {
                self.handle_success().await;
                self.cache.set(pair.as_str(), price.clone()).await;
                FetchOutcome::success(pair.clone(), price)
            }
            Err(FetchError::RateLimited) => {
                self.handle_rate_limit().await;
                FetchOutcome::failure(pair.clone(), FetchError::RateLimited)
            }
            Err(err) => {
                tracing::debug!(pair = %pair, reason = %err.reason(), error = %err, "Fetch failed");
                FetchOutcome::failure(pair.clone(), err)
            }
        }
    }

    /// Runs one cycle: fetches every tracked pair concurrently and waits for
    /// all of them to settle
    ///
    /// A failing or panicking pair never affects the others; partial failure
    /// is reported through the summary, not as an error.
    pub async fn fetch_all_prices(&self) -> CycleSummary {
        let fetches = self
            .pairs
            .iter()
            .map(|pair| AssertUnwindSafe(self.fetch_one(pair)).catch_unwind());
        let settled = join_all(fetches).await;

        let mut summary = CycleSummary::default();
        for (pair, result) in self.pairs.iter().zip(settled) {
            match result {
                Ok(outcome) => summary.record(&outcome),
                Err(panic) => {
                    tracing::error!(pair = %pair, panic = %panic_message(&*panic), "Fetch task panicked");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Backs off after a rate-limited response
    async fn handle_rate_limit(&self) {
        let mut state = self.state.lock().await;
        if state.on_rate_limited() {
            tracing::warn!(
                interval_ms = state.current_interval_ms(),
                "Rate limit detected, increasing interval"
            );
        }
    }

    /// Steps the interval back down after a successful response
    async fn handle_success(&self) {
        let mut state = self.state.lock().await;
        if state.on_success() {
            tracing::info!(
                interval_ms = state.current_interval_ms(),
                "Rate limit cleared, reducing interval"
            );
        }
    }

    /// Delay to wait before starting the next cycle
    pub async fn current_interval(&self) -> Duration {
        self.state.lock().await.current_interval()
    }

    pub async fn current_interval_ms(&self) -> u64 {
        self.state.lock().await.current_interval_ms()
    }

    pub async fn is_rate_limited(&self) -> bool {
        self.state.lock().await.is_rate_limited()
    }

    pub fn tracked_pairs(&self) -> &[CurrencyPair] {
        &self.pairs
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &UpstreamMetrics {
        &self.metrics
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_PAIRS, MAX_INTERVAL_MS, MIN_INTERVAL_MS};
    use crate::source::mock::{MockReply, MockSource};
    use crate::types::SpotPrice;

    fn default_pairs() -> Vec<CurrencyPair> {
        DEFAULT_PAIRS.iter().map(|p| CurrencyPair::new(p)).collect()
    }

    fn fetcher_with(source: Arc<MockSource>) -> (PriceFetcher, Arc<PriceCache>) {
        let cache = Arc::new(PriceCache::new());
        let fetcher = PriceFetcher::new(source, cache.clone(), default_pairs());
        (fetcher, cache)
    }

    #[tokio::test]
    async fn test_successful_cycle_updates_cache() {
        let source = Arc::new(MockSource::new());
        for pair in DEFAULT_PAIRS {
            source.set_price(pair, "50000.00");
        }
        let (fetcher, cache) = fetcher_with(source.clone());

        let summary = fetcher.fetch_all_prices().await;

        assert_eq!(
            summary,
            CycleSummary {
                success: 9,
                failed: 0,
                rate_limited: false
            }
        );
        assert_eq!(source.call_count(), 9);
        let lookup = cache.get("btc-usd").await.unwrap();
        assert_eq!(lookup.data, SpotPrice::new("50000.00", "BTC", "USD"));
        assert!(!lookup.is_stale);
        assert_eq!(fetcher.current_interval_ms().await, MIN_INTERVAL_MS);
    }

    #[tokio::test]
    async fn test_all_rate_limited() {
        let source = Arc::new(MockSource::new());
        for pair in DEFAULT_PAIRS {
            source.set_error(pair, FetchError::RateLimited);
        }
        let (fetcher, cache) = fetcher_with(source);
        let before = fetcher.current_interval_ms().await;

        let summary = fetcher.fetch_all_prices().await;

        assert_eq!(
            summary,
            CycleSummary {
                success: 0,
                failed: 9,
                rate_limited: true
            }
        );
        assert!(fetcher.current_interval_ms().await > before);
        assert_eq!(fetcher.current_interval_ms().await, MAX_INTERVAL_MS);
        assert!(fetcher.is_rate_limited().await);
        assert!(!cache.has("BTC-USD").await);
    }

    #[tokio::test]
    async fn test_rate_limits_after_successes_compound() {
        let source = Arc::new(MockSource::new());
        // Evaluation follows pair order: six successes, then three 429s.
        for (idx, pair) in DEFAULT_PAIRS.iter().enumerate() {
            if idx < 6 {
                source.set_price(pair, "1.00");
            } else {
                source.set_error(pair, FetchError::RateLimited);
            }
        }
        let (fetcher, _cache) = fetcher_with(source);

        let summary = fetcher.fetch_all_prices().await;

        assert_eq!(summary.success, 6);
        assert_eq!(summary.failed, 3);
        assert!(summary.rate_limited);
        assert_eq!(
            fetcher.current_interval_ms().await,
            MAX_INTERVAL_MS.min(MIN_INTERVAL_MS * 2u64.pow(3))
        );
    }

    #[tokio::test]
    async fn test_successes_recover_interval() {
        let source = Arc::new(MockSource::new());
        for pair in DEFAULT_PAIRS {
            source.set_error(pair, FetchError::RateLimited);
        }
        let (fetcher, _cache) = fetcher_with(source.clone());
        fetcher.fetch_all_prices().await;
        assert_eq!(fetcher.current_interval_ms().await, MAX_INTERVAL_MS);

        for pair in DEFAULT_PAIRS {
            source.set_price(pair, "1.00");
        }
        let summary = fetcher.fetch_all_prices().await;

        assert!(!summary.rate_limited);
        assert!(!fetcher.is_rate_limited().await);
        assert_eq!(fetcher.current_interval_ms().await, MIN_INTERVAL_MS);
    }

    #[tokio::test]
    async fn test_mixed_failures_are_isolated() {
        let source = Arc::new(MockSource::new());
        source.set_price("BTC-USD", "50000.00");
        source.set_error("BTC-EUR", FetchError::Http(500));
        source.set_error("BTC-CAD", FetchError::malformed("missing `data.amount`"));
        source.set_error("BTC-BRL", FetchError::Network("connection reset".into()));
        source.set_reply("BTC-MXP", MockReply::Panic);
        source.set_price("BTC-GBP", "40000.00");
        // BTC-CHF, BTC-JPY, BTC-AUD unscripted: the mock answers 404
        let (fetcher, cache) = fetcher_with(source);

        let summary = fetcher.fetch_all_prices().await;

        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 7);
        assert_eq!(summary.total(), fetcher.tracked_pairs().len());
        assert!(!summary.rate_limited);
        assert!(cache.has("BTC-GBP").await);
        assert!(!cache.has("BTC-EUR").await);

        let metrics = fetcher.metrics().snapshot().await;
        assert_eq!(metrics.failures_by_reason.get("http_404"), Some(&3));
        assert_eq!(metrics.failures_by_reason.get("network_error"), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_serialize_cycle() {
        let source = Arc::new(MockSource::new());
        for pair in DEFAULT_PAIRS {
            source.set_reply(
                pair,
                MockReply::Delayed(
                    Duration::from_secs(30),
                    Box::new(MockReply::Price(SpotPrice::new("1", "BTC", "USD"))),
                ),
            );
        }
        source.set_price("BTC-USD", "50000.00");
        let (fetcher, cache) = fetcher_with(source);

        let start = Instant::now();
        let summary = fetcher.fetch_all_prices().await;
        let elapsed = start.elapsed();

        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 8);
        assert!(elapsed >= Duration::from_millis(REQUEST_TIMEOUT_MS));
        assert!(elapsed < Duration::from_millis(REQUEST_TIMEOUT_MS + 100));
        assert!(cache.has("BTC-USD").await);

        let metrics = fetcher.metrics().snapshot().await;
        assert_eq!(metrics.failures_by_reason.get("timeout"), Some(&8));
    }

    #[tokio::test]
    async fn test_fetch_one_outcome() {
        let source = Arc::new(MockSource::new());
        source.set_error("BTC-USD", FetchError::Http(503));
        let (fetcher, _cache) = fetcher_with(source);

        let outcome = fetcher.fetch_one(&CurrencyPair::new("BTC-USD")).await;

        assert_eq!(outcome.pair.as_str(), "BTC-USD");
        assert_eq!(outcome.result.unwrap_err().reason(), "http_503");
    }

    #[tokio::test]
    async fn test_custom_policy_bounds() {
        let source = Arc::new(MockSource::new());
        source.set_error("BTC-USD", FetchError::RateLimited);
        let cache = Arc::new(PriceCache::new());
        let fetcher = PriceFetcher::new(source, cache, vec![CurrencyPair::new("BTC-USD")])
            .with_policy(BackoffPolicy {
                min_interval_ms: 100,
                max_interval_ms: 250,
                multiplier: 3,
            });

        assert_eq!(fetcher.current_interval_ms().await, 100);
        fetcher.fetch_all_prices().await;
        assert_eq!(fetcher.current_interval_ms().await, 250);
        fetcher.fetch_all_prices().await;
        assert_eq!(fetcher.current_interval_ms().await, 250);
    }
}
