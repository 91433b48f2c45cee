//! Background polling loop
//!
//! Drives [`PriceFetcher::fetch_all_prices`] forever, waiting the fetcher's
//! current interval between cycles, until the cancellation token fires.

use crate::{fetcher::PriceFetcher, types::CycleSummary};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns [`run`] onto the current runtime
pub fn spawn(fetcher: Arc<PriceFetcher>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run(fetcher, cancel))
}

/// Runs polling cycles until `cancel` is triggered
///
/// Cancellation is checked before each cycle and before each wait. A cycle
/// that is already in flight is allowed to settle; a pending wait is
/// abandoned immediately.
pub async fn run(fetcher: Arc<PriceFetcher>, cancel: CancellationToken) {
    tracing::info!(
        pairs = fetcher.tracked_pairs().len(),
        source = fetcher.source_name(),
        "Starting price polling"
    );

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match AssertUnwindSafe(fetcher.fetch_all_prices())
            .catch_unwind()
            .await
        {
            Ok(summary) => log_summary(&summary),
            Err(_) => tracing::error!("Error during price fetch, continuing with next cycle"),
        }

        if cancel.is_cancelled() {
            break;
        }

        let interval = fetcher.current_interval().await;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("Price polling stopped");
}

fn log_summary(summary: &CycleSummary) {
    if summary.rate_limited {
        tracing::warn!(
            success = summary.success,
            failed = summary.failed,
            "Rate limited during poll"
        );
    } else if summary.failed > 0 {
        tracing::warn!(
            success = summary.success,
            failed = summary.failed,
            "Poll completed with failures"
        );
    } else {
        tracing::info!(success = summary.success, "Successfully updated prices");
    }
}
