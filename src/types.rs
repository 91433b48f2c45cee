//! Types for the spot price mirror

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Currency pair identifier such as `BTC-USD`
///
/// Always held in canonical uppercase form, so two pairs compare equal
/// regardless of how the caller spelled them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyPair(String);

impl CurrencyPair {
    /// Creates a pair, normalizing it to uppercase
    pub fn new(pair: &str) -> Self {
        Self(pair.trim().to_uppercase())
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quote half of the pair (`EUR` for `BTC-EUR`), if the pair has one
    pub fn quote_currency(&self) -> Option<&str> {
        self.0
            .split_once('-')
            .map(|(_, quote)| quote)
            .filter(|quote| !quote.is_empty())
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyPair {
    fn from(pair: &str) -> Self {
        Self::new(pair)
    }
}

/// A spot quote in the upstream wire shape
///
/// `amount` stays a string end to end; the mirror never does arithmetic on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotPrice {
    pub amount: String,
    pub base: String,
    pub currency: String,
}

impl SpotPrice {
    pub fn new(
        amount: impl Into<String>,
        base: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            base: base.into(),
            currency: currency.into(),
        }
    }
}

/// Result of a cache read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLookup {
    /// The cached quote
    pub data: SpotPrice,
    /// Time since the quote was written
    pub age: Duration,
    /// Whether `age` exceeds the stale threshold
    pub is_stale: bool,
}

/// Outcome of fetching one pair within a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub pair: CurrencyPair,
    pub result: Result<SpotPrice, FetchError>,
}

impl FetchOutcome {
    pub fn success(pair: CurrencyPair, price: SpotPrice) -> Self {
        Self {
            pair,
            result: Ok(price),
        }
    }

    pub fn failure(pair: CurrencyPair, error: FetchError) -> Self {
        Self {
            pair,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.result, Err(FetchError::RateLimited))
    }
}

/// Aggregate of one polling cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub success: usize,
    pub failed: usize,
    pub rate_limited: bool,
}

impl CycleSummary {
    /// Folds one pair's outcome into the summary
    pub fn record(&mut self, outcome: &FetchOutcome) {
        if outcome.is_success() {
            self.success += 1;
        } else {
            self.failed += 1;
            if outcome.is_rate_limited() {
                self.rate_limited = true;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}
