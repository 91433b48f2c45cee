//! Adaptive polling interval
//!
//! The interval doubles on every rate-limited fetch and halves on every
//! successful one, clamped to `[min, max]`. Adjustments are applied per
//! outcome, so a single cycle with several 429s compounds the backoff.

use crate::{
    constants::{BACKOFF_MULTIPLIER, MAX_INTERVAL_MS, MIN_INTERVAL_MS},
    types::FetchOutcome,
};
use std::time::Duration;

/// Bounds and step factor of the adaptive interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: MIN_INTERVAL_MS,
            max_interval_ms: MAX_INTERVAL_MS,
            multiplier: BACKOFF_MULTIPLIER,
        }
    }
}

impl BackoffPolicy {
    /// Interval after one rate-limited outcome
    pub fn backoff(&self, current_ms: u64) -> u64 {
        current_ms
            .saturating_mul(self.multiplier)
            .min(self.max_interval_ms)
    }

    /// Interval after one successful outcome
    pub fn recover(&self, current_ms: u64) -> u64 {
        if current_ms > self.min_interval_ms {
            (current_ms / self.multiplier.max(1)).max(self.min_interval_ms)
        } else {
            current_ms
        }
    }
}

/// Interval reached by applying `outcomes` in order, starting at `current_ms`
///
/// Failures other than rate limiting leave the interval untouched.
pub fn next_interval(policy: &BackoffPolicy, current_ms: u64, outcomes: &[FetchOutcome]) -> u64 {
    outcomes.iter().fold(current_ms, |interval, outcome| {
        if outcome.is_rate_limited() {
            policy.backoff(interval)
        } else if outcome.is_success() {
            policy.recover(interval)
        } else {
            interval
        }
    })
}

/// Mutable poller state owned by the fetcher
#[derive(Debug, Clone)]
pub struct PollerState {
    policy: BackoffPolicy,
    current_interval_ms: u64,
    rate_limited: bool,
}

impl PollerState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            current_interval_ms: policy.min_interval_ms,
            rate_limited: false,
        }
    }

    /// Records a rate-limited outcome; returns true on the false→true transition
    pub fn on_rate_limited(&mut self) -> bool {
        let entered = !self.rate_limited;
        self.rate_limited = true;
        self.current_interval_ms = self.policy.backoff(self.current_interval_ms);
        entered
    }

    /// Records a successful outcome; returns true on the true→false transition
    pub fn on_success(&mut self) -> bool {
        let cleared = self.rate_limited;
        self.rate_limited = false;
        self.current_interval_ms = self.policy.recover(self.current_interval_ms);
        cleared
    }

    pub fn current_interval_ms(&self) -> u64 {
        self.current_interval_ms
    }

    pub fn current_interval(&self) -> Duration {
        Duration::from_millis(self.current_interval_ms)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}

impl Default for PollerState {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}
