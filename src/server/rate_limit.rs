//! Per-client rate limiting for the serving layer
//!
//! Fixed-window counter keyed by client IP. Every response from a limited
//! route carries `RateLimit-Limit`, `RateLimit-Remaining` and
//! `RateLimit-Reset` headers.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Body of a rejected request
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Expired windows are swept once the table grows past this size
const PRUNE_THRESHOLD: usize = 1024;

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Result of checking one request against the limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets
    pub reset: Duration,
}

impl RateDecision {
    fn apply_headers(&self, headers: &mut HeaderMap) {
        let reset_secs = self.reset.as_millis().div_ceil(1000) as u64;
        headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET.clone(), HeaderValue::from(reset_secs));
    }
}

/// Fixed-window request limiter keyed by client IP
pub struct ClientRateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl ClientRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request from `ip` and decides whether it may proceed
    pub async fn check(&self, ip: IpAddr) -> RateDecision {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;

        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = entry.count < self.max_requests;
        if allowed {
            entry.count += 1;
        }

        RateDecision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset: self.window.saturating_sub(now.duration_since(entry.started)),
        }
    }
}

/// Middleware rejecting clients that exceed their request budget
pub async fn limit_by_ip(
    State(limiter): State<Arc<ClientRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let decision = limiter.check(ip).await;
    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        tracing::debug!(client = %ip, path = %req.uri().path(), "Client rate limited");
        (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response()
    };
    decision.apply_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[tokio::test(start_paused = true)]
    async fn test_limits_per_client() {
        let limiter = ClientRateLimiter::new(3, Duration::from_secs(60));

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check(client(1)).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
        let rejected = limiter.check(client(1)).await;
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);

        assert!(limiter.check(client(2)).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = ClientRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(client(1)).await.allowed);

        tokio::time::advance(Duration::from_secs(20)).await;
        let rejected = limiter.check(client(1)).await;
        assert!(!rejected.allowed);
        assert_eq!(rejected.reset, Duration::from_secs(40));

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(limiter.check(client(1)).await.allowed);
    }

    #[test]
    fn test_headers() {
        let decision = RateDecision {
            allowed: true,
            limit: 100,
            remaining: 42,
            reset: Duration::from_millis(12_300),
        };
        let mut headers = HeaderMap::new();
        decision.apply_headers(&mut headers);

        assert_eq!(headers["ratelimit-limit"], "100");
        assert_eq!(headers["ratelimit-remaining"], "42");
        assert_eq!(headers["ratelimit-reset"], "13");
    }
}
