//! Data module for loading and fetching input data
//!
//! This module provides:
//! - Data types for pool block counts, price points and training datasets
//! - Parsing of loosely typed JSON payloads
//! - CoinGecko API client for fetching price history and spot prices
//! - Blockchain.com Query API client for network metrics
//! - Network metrics CSV loading with prioritized column lookup
//! - JSON/CSV storage of inputs and forecasts

pub mod blockchain;
pub mod coingecko;
pub mod ingest;
pub mod metrics;
pub mod storage;
pub mod types;

pub use blockchain::{
    parse_query_value, BlockchainClient, BlockchainError, NetworkSnapshot, QueryValue,
};
pub use coingecko::{parse_simple_price, CoinGeckoClient, CoinGeckoError, RetryPolicy};
pub use ingest::{
    coerce_number, parse_date, parse_market_payload, parse_pool_counts, parse_price_payload,
    parse_price_series, DataError,
};
pub use metrics::{
    load_network_metrics, pick_column, read_network_metrics, require_column,
    MetricsAvailability, NetworkMetrics, NetworkMetricsRow,
};
pub use storage::{
    load_json, load_market_payload, load_pool_counts, load_price_points, save_forecast_csv,
    save_json, write_points_csv, ForecastReport,
};
pub use types::{DailyPoolRecord, Dataset, PricePoint};
