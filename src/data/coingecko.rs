//! CoinGecko API client for fetching price history
//!
//! This module provides an async client for the CoinGecko public API.
//! Requests are retried with a linear backoff before an error is surfaced.

use super::ingest::{coerce_number, parse_price_payload, required_field, DataError};
use super::types::PricePoint;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// CoinGecko API base URLs
pub mod endpoints {
    /// Public API endpoint
    pub const PUBLIC: &str = "https://api.coingecko.com/api/v3";
}

/// Environment variable holding an optional API key
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

/// Errors that can occur when interacting with the CoinGecko API
#[derive(Error, Debug)]
pub enum CoinGeckoError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(#[from] DataError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

/// Retry policy for HTTP requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts
    pub max_attempts: u32,
    /// Base delay, multiplied by the attempt number
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after a failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Read `{coin_id: {vs_currency: price}}` from a `simple/price` payload
pub fn parse_simple_price(payload: &Value, coin_id: &str, vs_currency: &str) -> Result<f64, DataError> {
    let prices = required_field(payload, coin_id)?;
    let price = required_field(prices, vs_currency)?;
    coerce_number(price).ok_or_else(|| DataError::InvalidShape {
        field: format!("{}.{}", coin_id, vs_currency),
        expected: "numeric price",
    })
}

/// CoinGecko API client
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    /// Create a new client for the public API, reading the API key from the environment
    pub fn new() -> Result<Self, CoinGeckoError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(Self::with_base_url(endpoints::PUBLIC)?.with_api_key(api_key))
    }

    /// Create a new client with a custom base URL
    pub fn with_base_url(base_url: &str) -> Result<Self, CoinGeckoError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the API key sent as `x-cg-pro-api-key`
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the `market_chart` endpoint
    pub fn market_chart_url(&self, coin_id: &str) -> String {
        format!("{}/coins/{}/market_chart", self.base_url, coin_id)
    }

    /// Fetch the raw `market_chart` payload (`prices`, `market_caps`, `total_volumes`)
    ///
    /// # Arguments
    /// * `coin_id` - CoinGecko coin id (e.g., "bitcoin")
    /// * `vs_currency` - Quote currency (e.g., "usd")
    /// * `days` - Number of days of history
    pub async fn market_chart(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Value, CoinGeckoError> {
        if days == 0 {
            return Err(CoinGeckoError::InvalidParams(
                "days must be at least 1".to_string(),
            ));
        }

        let url = self.market_chart_url(coin_id);
        let days = days.to_string();
        let params = [("vs_currency", vs_currency), ("days", days.as_str())];

        self.get_json(&url, &params).await
    }

    /// Fetch daily price history as price points
    pub async fn price_history(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, CoinGeckoError> {
        let payload = self.market_chart(coin_id, vs_currency, days).await?;
        let points = parse_price_payload(&payload)?;

        info!(
            "Fetched {} price points for {}/{} ({} days)",
            points.len(),
            coin_id,
            vs_currency,
            days
        );

        Ok(points)
    }

    /// Fetch spot prices from the `simple/price` endpoint
    pub async fn simple_price(&self, ids: &str, vs_currencies: &str) -> Result<Value, CoinGeckoError> {
        let url = format!("{}/simple/price", self.base_url);
        let params = [("ids", ids), ("vs_currencies", vs_currencies)];

        self.get_json(&url, &params).await
    }

    /// Spot price of one coin in one quote currency
    pub async fn spot_price(&self, coin_id: &str, vs_currency: &str) -> Result<f64, CoinGeckoError> {
        let payload = self.simple_price(coin_id, vs_currency).await?;
        let price = parse_simple_price(&payload, coin_id, vs_currency)?;

        info!("Spot price {}/{}: {}", coin_id, vs_currency, price);
        Ok(price)
    }

    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, CoinGeckoError> {
        let mut attempt = 1;

        loop {
            debug!("GET {} (attempt {}/{})", url, attempt, self.retry.max_attempts);

            match self.send(url, params).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!("Request to {} failed: {}; retrying in {:?}", url, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn send(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, reqwest::Error> {
        let mut request = self.client.get(url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", key);
        }

        request.send().await?.error_for_status()?.json().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_chart_url() {
        let client = CoinGeckoClient::with_base_url("https://example.test/api/v3/").unwrap();
        assert_eq!(
            client.market_chart_url("bitcoin"),
            "https://example.test/api/v3/coins/bitcoin/market_chart"
        );
    }

    #[test]
    fn test_parse_simple_price() {
        let payload = serde_json::json!({"bitcoin": {"usd": 67012.5, "eur": "61000"}});

        assert_eq!(parse_simple_price(&payload, "bitcoin", "usd").unwrap(), 67012.5);
        assert_eq!(parse_simple_price(&payload, "bitcoin", "eur").unwrap(), 61000.0);
        assert!(matches!(
            parse_simple_price(&payload, "ethereum", "usd"),
            Err(DataError::MissingField(field)) if field == "ethereum"
        ));
        assert!(matches!(
            parse_simple_price(&payload, "bitcoin", "gbp"),
            Err(DataError::MissingField(field)) if field == "gbp"
        ));
    }

    #[tokio::test]
    async fn test_spot_price() {
        let client = CoinGeckoClient::with_base_url(endpoints::PUBLIC)
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 1,
                backoff: Duration::from_millis(0),
            });

        // Note: This test requires network access
        if let Ok(price) = client.spot_price("bitcoin", "usd").await {
            assert!(price > 0.0);
        }
    }

    #[test]
    fn test_retry_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_zero_days_rejected() {
        let client = CoinGeckoClient::with_base_url(endpoints::PUBLIC).unwrap();
        let result = client.market_chart("bitcoin", "usd", 0).await;
        assert!(matches!(result, Err(CoinGeckoError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_price_history() {
        let client = CoinGeckoClient::with_base_url(endpoints::PUBLIC)
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 1,
                backoff: Duration::from_millis(0),
            });

        // Note: This test requires network access
        if let Ok(points) = client.price_history("bitcoin", "usd", 2).await {
            assert!(!points.is_empty());
        }
    }
}
