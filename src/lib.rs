//! Mining Pool Concentration and Price Forecasting
//!
//! This library measures how concentrated bitcoin block production is across
//! mining pools (Herfindahl-Hirschman Index) and forecasts both the index and
//! the BTC price with recursive gradient boosting over lag features.
//!
//! # Modules
//!
//! - [`data`] - Input types, JSON/CSV loading, CoinGecko and Blockchain.com clients, network metrics
//! - [`concentration`] - Pool share aggregation and HHI
//! - [`series`] - Dense daily series and resampling
//! - [`features`] - Lag and calendar features
//! - [`models`] - Gradient Boosting Machine regressor
//! - [`forecast`] - Recursive multi-step forecasting
//! - [`pipeline`] - Configuration and end-to-end orchestration
//! - [`revenue`] - Expected miner revenue from network metrics
//!
//! # Example
//!
//! ```rust,no_run
//! use rust_hhi_forecast::data::{load_pool_counts, CoinGeckoClient};
//! use rust_hhi_forecast::pipeline::{Pipeline, PipelineConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load pool block counts and fetch prices
//!     let pools = load_pool_counts(Path::new("data/pools.json"))?;
//!     let prices = CoinGeckoClient::new()?.price_history("bitcoin", "usd", 365).await?;
//!
//!     // 2. Train and forecast both series
//!     let pipeline = Pipeline::new(PipelineConfig::default())?;
//!     let hhi = pipeline.run_hhi(&pools)?;
//!     let price = pipeline.run_price(&prices)?;
//!
//!     println!("HHI forecast days: {}", hhi.forecast.horizon_len());
//!     println!("Price forecast days: {}", price.forecast.horizon_len());
//!     Ok(())
//! }
//! ```

pub mod concentration;
pub mod data;
pub mod features;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod revenue;
pub mod series;

// Re-export commonly used items at the crate level
pub use concentration::{herfindahl, Aggregator, PoolShareTable};
pub use data::{BlockchainClient, CoinGeckoClient, DailyPoolRecord, DataError, Dataset, PricePoint};
pub use features::LagFeatureBuilder;
pub use forecast::{ForecastSeries, RecursiveForecaster};
pub use models::{GbmParams, GbmRegressor, ModelError, ModelMetrics};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, Target, TargetForecast};
pub use revenue::{estimate_revenue, RevenueEstimate, RevenueParams};
pub use series::DailySeries;
