//! Coinbase spot price source implementation

use crate::{
    constants::{COINBASE_API_URL, DEFAULT_BASE, REQUEST_TIMEOUT_MS, USER_AGENT},
    error::FetchError,
    source::SpotPriceSource,
    types::{CurrencyPair, SpotPrice},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Coinbase API response for `GET /{pair}/spot`
#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: Option<SpotResponseData>,
}

#[derive(Debug, Deserialize)]
struct SpotResponseData {
    amount: Option<String>,
    base: Option<String>,
    currency: Option<String>,
}

/// Coinbase spot price source
pub struct CoinbaseSource {
    client: Client,
    base_url: String,
}

impl CoinbaseSource {
    /// Creates a source against the public Coinbase API
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(COINBASE_API_URL)
    }

    /// Creates a source against any server exposing the same API shape
    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the spot price URL for a pair
    fn build_url(&self, pair: &CurrencyPair) -> String {
        format!("{}/{}/spot", self.base_url, pair)
    }

    /// Extracts the quote from a 2xx body
    fn parse_response(pair: &CurrencyPair, body: &str) -> Result<SpotPrice, FetchError> {
        let response: SpotResponse = serde_json::from_str(body).map_err(|e| {
            FetchError::malformed(format!("Failed to parse spot response: {}", e))
        })?;

        let data = response
            .data
            .ok_or_else(|| FetchError::malformed("missing `data` object"))?;

        let amount = data
            .amount
            .filter(|amount| !amount.is_empty())
            .ok_or_else(|| FetchError::malformed("missing `data.amount`"))?;

        let base = data
            .base
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE.to_string());

        let currency = data
            .currency
            .filter(|currency| !currency.is_empty())
            .or_else(|| pair.quote_currency().map(str::to_string))
            .unwrap_or_default();

        Ok(SpotPrice {
            amount,
            base,
            currency,
        })
    }
}

#[async_trait]
impl SpotPriceSource for CoinbaseSource {
    async fn fetch_spot(&self, pair: &CurrencyPair) -> Result<SpotPrice, FetchError> {
        let url = self.build_url(pair);
        tracing::trace!(pair = %pair, url = %url, "Fetching spot price");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        Self::parse_response(pair, &body)
    }

    fn source_name(&self) -> &'static str {
        "coinbase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC-EUR")
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let source = CoinbaseSource::with_base_url("http://localhost:9000/v2/prices/").unwrap();
        assert_eq!(
            source.build_url(&CurrencyPair::new("btc-usd")),
            "http://localhost:9000/v2/prices/BTC-USD/spot"
        );
    }

    #[test]
    fn test_parse_full_response() {
        let body = r#"{"data":{"amount":"43210.55","base":"BTC","currency":"EUR"}}"#;
        let price = CoinbaseSource::parse_response(&pair(), body).unwrap();
        assert_eq!(price, SpotPrice::new("43210.55", "BTC", "EUR"));
    }

    #[test]
    fn test_parse_defaults_base_and_currency() {
        let body = r#"{"data":{"amount":"43210.55"}}"#;
        let price = CoinbaseSource::parse_response(&pair(), body).unwrap();
        assert_eq!(price, SpotPrice::new("43210.55", "BTC", "EUR"));
    }

    #[test]
    fn test_parse_keeps_amount_verbatim() {
        let body = r#"{"data":{"amount":"0.000000012345678901","base":"SHIB","currency":"USD"}}"#;
        let price = CoinbaseSource::parse_response(&pair(), body).unwrap();
        assert_eq!(price.amount, "0.000000012345678901");
    }

    #[test]
    fn test_parse_rejects_missing_amount() {
        for body in [
            r#"{"data":{"base":"BTC","currency":"EUR"}}"#,
            r#"{"data":{"amount":"","base":"BTC","currency":"EUR"}}"#,
            r#"{"errors":[{"id":"not_found"}]}"#,
            "<html>bad gateway</html>",
        ] {
            let err = CoinbaseSource::parse_response(&pair(), body).unwrap_err();
            assert_eq!(err.reason(), "malformed_response", "body: {}", body);
        }
    }
}
