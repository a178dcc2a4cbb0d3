//! Blockchain.com Query API client
//!
//! The Query API answers each metric with a bare plain-text number, e.g.
//! `GET https://blockchain.info/q/getdifficulty` -> `155973032196072.0`.
//! Requests share the retry policy of the CoinGecko client.

use super::coingecko::RetryPolicy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Query API base URL
pub const QUERY_API: &str = "https://blockchain.info/q";

/// Metric names understood by the Query API
pub mod metrics {
    pub const DIFFICULTY: &str = "getdifficulty";
    pub const BLOCK_COUNT: &str = "getblockcount";
    pub const UNCONFIRMED_COUNT: &str = "unconfirmedcount";
}

/// Errors that can occur when querying Blockchain.com
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Metric '{metric}' returned a non-numeric body: {body:?}")]
    NotNumeric { metric: String, body: String },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

/// A numeric Query API answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Integer(i64),
    Float(f64),
}

impl QueryValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            QueryValue::Integer(v) => v as f64,
            QueryValue::Float(v) => v,
        }
    }

    /// The value as an integer, if it was answered as one
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            QueryValue::Integer(v) => Some(v),
            QueryValue::Float(_) => None,
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Integer(v) => write!(f, "{}", v),
            QueryValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Parse a plain-text answer: a float if it contains '.', an integer otherwise.
pub fn parse_query_value(text: &str) -> Option<QueryValue> {
    let text = text.trim();
    if text.contains('.') {
        text.parse::<f64>().ok().map(QueryValue::Float)
    } else {
        text.parse::<i64>().ok().map(QueryValue::Integer)
    }
}

/// Snapshot of the headline network metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub difficulty: QueryValue,
    pub height: QueryValue,
    pub unconfirmed: QueryValue,
}

/// Blockchain.com Query API client
#[derive(Debug, Clone)]
pub struct BlockchainClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl BlockchainClient {
    /// Create a new client for the public Query API
    pub fn new() -> Result<Self, BlockchainError> {
        Self::with_base_url(QUERY_API)
    }

    /// Create a new client with a custom base URL
    pub fn with_base_url(base_url: &str) -> Result<Self, BlockchainError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn metric_url(&self, metric: &str) -> String {
        format!("{}/{}", self.base_url, metric)
    }

    /// Fetch one metric, e.g. [`metrics::DIFFICULTY`]
    pub async fn fetch_metric(&self, metric: &str) -> Result<QueryValue, BlockchainError> {
        if metric.is_empty() || metric.contains('/') {
            return Err(BlockchainError::InvalidParams(format!(
                "invalid metric name {:?}",
                metric
            )));
        }

        let body = self.get_text(&self.metric_url(metric)).await?;
        let value = parse_query_value(&body).ok_or_else(|| BlockchainError::NotNumeric {
            metric: metric.to_string(),
            body: body.trim().to_string(),
        })?;

        info!("{} = {}", metric, value);
        Ok(value)
    }

    pub async fn difficulty(&self) -> Result<QueryValue, BlockchainError> {
        self.fetch_metric(metrics::DIFFICULTY).await
    }

    pub async fn block_count(&self) -> Result<QueryValue, BlockchainError> {
        self.fetch_metric(metrics::BLOCK_COUNT).await
    }

    pub async fn unconfirmed_count(&self) -> Result<QueryValue, BlockchainError> {
        self.fetch_metric(metrics::UNCONFIRMED_COUNT).await
    }

    /// Difficulty, block height and mempool size in one call
    pub async fn snapshot(&self) -> Result<NetworkSnapshot, BlockchainError> {
        Ok(NetworkSnapshot {
            difficulty: self.difficulty().await?,
            height: self.block_count().await?,
            unconfirmed: self.unconfirmed_count().await?,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, BlockchainError> {
        let mut attempt = 1;

        loop {
            debug!("GET {} (attempt {}/{})", url, attempt, self.retry.max_attempts);

            match self.send(url).await {
                Ok(body) => return Ok(body),
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

    async fn send(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client.get(url).send().await?.error_for_status()?.text().await
    }
}
