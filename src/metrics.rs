//! Upstream request metrics
//!
//! Tracks request latency and failure reasons for the spot price source.

use crate::error::FetchError;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

/// Maximum number of samples to keep for latency percentiles
const MAX_SAMPLES: usize = 100;

/// Point-in-time view of the upstream metrics
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    /// 50th percentile latency of successful requests in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful requests in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate over the lifetime of the process (0.0 to 1.0)
    pub success_rate: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
    /// Lifetime failure counts keyed by reason code
    pub failures_by_reason: BTreeMap<String, u64>,
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct MetricsState {
    samples: VecDeque<LatencySample>,
    total_requests: u64,
    failed_requests: u64,
    failures_by_reason: BTreeMap<String, u64>,
}

/// Collects per-request metrics for the upstream source
#[derive(Debug, Default)]
pub struct UpstreamMetrics {
    state: Mutex<MetricsState>,
}

impl UpstreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request with its duration and outcome
    pub async fn record(&self, duration: Duration, result: Result<(), &FetchError>) {
        let mut state = self.state.lock().await;
        state.total_requests += 1;

        if let Err(err) = result {
            state.failed_requests += 1;
            *state.failures_by_reason.entry(err.reason()).or_insert(0) += 1;
        }

        if state.samples.len() >= MAX_SAMPLES {
            state.samples.pop_front();
        }
        state.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success: result.is_ok(),
        });
    }

    /// Computes current metrics from collected samples
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().await;

        let mut latencies: Vec<f64> = state
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if state.total_requests > 0 {
            (state.total_requests - state.failed_requests) as f64 / state.total_requests as f64
        } else {
            1.0
        };

        MetricsSnapshot {
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: state.total_requests,
            failed_requests: state.failed_requests,
            failures_by_reason: state.failures_by_reason.clone(),
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
