use anyhow::Context;
use spot_price_mirror::{
    constants::{CLIENT_RATE_LIMIT_MAX, CLIENT_RATE_LIMIT_WINDOW_SECS, SHUTDOWN_DEADLINE_SECS},
    poller,
    server::{self, AppState, ClientRateLimiter},
    telemetry, CoinbaseSource, Config, PriceCache, PriceFetcher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("info,tower_http=info");

    let config = Config::from_env()?;
    tracing::info!(
        upstream = %config.upstream_base_url,
        pairs = config.pairs.len(),
        "Loaded configuration"
    );

    let cache = Arc::new(PriceCache::new());
    let source = Arc::new(
        CoinbaseSource::with_base_url(&config.upstream_base_url)
            .context("failed to build upstream client")?,
    );
    let fetcher = Arc::new(PriceFetcher::new(source, cache.clone(), config.pairs.clone()));
    let limiter = Arc::new(ClientRateLimiter::new(
        CLIENT_RATE_LIMIT_MAX,
        Duration::from_secs(CLIENT_RATE_LIMIT_WINDOW_SECS),
    ));
    let app = server::router(AppState::new(cache, fetcher.clone()), limiter);

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    let cancel = CancellationToken::new();
    let polling = poller::spawn(fetcher, cancel.clone());

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            let signal = server::shutdown_signal().await;
            tracing::info!(signal, "Received signal, shutting down gracefully");
            cancel.cancel();

            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(SHUTDOWN_DEADLINE_SECS)).await;
                tracing::error!("Forced shutdown after timeout");
                std::process::exit(1);
            });
        }
    };

    server::serve(listener, app, shutdown).await?;
    tracing::info!("HTTP server closed");

    cancel.cancel();
    if let Err(e) = polling.await {
        tracing::error!(error = %e, "Polling task failed");
    }
    Ok(())
}
