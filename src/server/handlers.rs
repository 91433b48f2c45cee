//! HTTP request handlers.

use crate::{cache::PriceCache, fetcher::PriceFetcher, metrics::MetricsSnapshot, types::SpotPrice};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<PriceCache>,
    pub fetcher: Arc<PriceFetcher>,
}

impl AppState {
    pub fn new(cache: Arc<PriceCache>, fetcher: Arc<PriceFetcher>) -> Self {
        Self { cache, fetcher }
    }
}

#[derive(Serialize)]
struct SpotResponse {
    data: SpotPrice,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SpotPrice>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    poller: PollerHealth,
    upstream: MetricsSnapshot,
}

#[derive(Serialize)]
struct PollerHealth {
    interval_ms: u64,
    rate_limited: bool,
    tracked_pairs: usize,
    stale_pairs: Vec<String>,
    missing_pairs: Vec<String>,
}

/// GET /health - Liveness plus poller state.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut stale_pairs = Vec::new();
    let mut missing_pairs = Vec::new();
    for pair in state.fetcher.tracked_pairs() {
        match state.cache.get(pair.as_str()).await {
            Some(lookup) if lookup.is_stale => stale_pairs.push(pair.to_string()),
            Some(_) => {}
            None => missing_pairs.push(pair.to_string()),
        }
    }

    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        poller: PollerHealth {
            interval_ms: state.fetcher.current_interval_ms().await,
            rate_limited: state.fetcher.is_rate_limited().await,
            tracked_pairs: state.fetcher.tracked_pairs().len(),
            stale_pairs,
            missing_pairs,
        },
        upstream: state.fetcher.metrics().snapshot().await,
    })
}

/// GET /v2/prices/:pair/spot - Cached spot price in the upstream format.
pub async fn spot_price(State(state): State<AppState>, Path(pair): Path<String>) -> Response {
    match state.cache.get(&pair).await {
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Currency pair not found",
                data: None,
            }),
        )
            .into_response(),
        Some(lookup) if lookup.is_stale => {
            tracing::debug!(pair = %pair, age_ms = lookup.age.as_millis() as u64, "Serving stale price");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Service temporarily unavailable - data too stale",
                    data: Some(lookup.data),
                }),
            )
                .into_response()
        }
        Some(lookup) => Json(SpotResponse { data: lookup.data }).into_response(),
    }
}
