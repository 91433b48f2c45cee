//! In-memory cache of the latest quote per pair

use crate::{
    constants::STALE_THRESHOLD_MS,
    types::{CurrencyPair, PriceLookup, SpotPrice},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A stored quote and when it was written
#[derive(Debug, Clone)]
struct CachedQuote {
    data: SpotPrice,
    written_at: Instant,
    updated_at: DateTime<Utc>,
}

impl CachedQuote {
    fn lookup(&self, stale_threshold: Duration) -> PriceLookup {
        let age = self.written_at.elapsed();
        PriceLookup {
            data: self.data.clone(),
            age,
            is_stale: age > stale_threshold,
        }
    }
}

/// Entry of a [`PriceCache::snapshot`]
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub pair: CurrencyPair,
    pub lookup: PriceLookup,
    pub updated_at: DateTime<Utc>,
}

/// Latest-value cache keyed by normalized pair
///
/// There is no eviction: the key space is the fixed set of tracked pairs.
/// Staleness is decided lazily on every read.
pub struct PriceCache {
    entries: RwLock<HashMap<CurrencyPair, CachedQuote>>,
    stale_threshold: Duration,
}

impl PriceCache {
    /// Creates an empty cache with the standard 60 s stale threshold
    pub fn new() -> Self {
        Self::with_stale_threshold(Duration::from_millis(STALE_THRESHOLD_MS))
    }

    pub fn with_stale_threshold(stale_threshold: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_threshold,
        }
    }

    /// Stores `data` for `pair`, replacing any previous entry
    pub async fn set(&self, pair: &str, data: SpotPrice) {
        let pair = CurrencyPair::new(pair);
        tracing::debug!(pair = %pair, amount = %data.amount, "Cached spot price");

        let quote = CachedQuote {
            data,
            written_at: Instant::now(),
            updated_at: Utc::now(),
        };
        self.entries.write().await.insert(pair, quote);
    }

    /// Reads the quote for `pair`
    ///
    /// Returns `None` when the pair has never been written; a stale entry is
    /// still returned, flagged through [`PriceLookup::is_stale`].
    pub async fn get(&self, pair: &str) -> Option<PriceLookup> {
        let pair = CurrencyPair::new(pair);
        let entries = self.entries.read().await;
        entries
            .get(&pair)
            .map(|quote| quote.lookup(self.stale_threshold))
    }

    /// True if the pair has ever been written (regardless of staleness)
    pub async fn has(&self, pair: &str) -> bool {
        let pair = CurrencyPair::new(pair);
        self.entries.read().await.contains_key(&pair)
    }

    /// All entries, sorted by pair
    pub async fn snapshot(&self) -> Vec<CacheEntry> {
        let entries = self.entries.read().await;
        let mut snapshot: Vec<CacheEntry> = entries
            .iter()
            .map(|(pair, quote)| CacheEntry {
                pair: pair.clone(),
                lookup: quote.lookup(self.stale_threshold),
                updated_at: quote.updated_at,
            })
            .collect();
        snapshot.sort_by(|a, b| a.pair.cmp(&b.pair));
        snapshot
    }

    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}
