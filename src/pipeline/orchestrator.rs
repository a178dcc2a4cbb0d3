//! End-to-end pipeline
//!
//! Each target runs resample, features, train and forecast on its own data.
//! The HHI target is first aggregated from raw pool records.

use super::config::{ConfigError, PipelineConfig};
use crate::concentration::{Aggregator, ConcentrationError, PoolShareTable};
use crate::data::{DailyPoolRecord, DataError, PricePoint};
use crate::features::LagFeatureBuilder;
use crate::forecast::{ForecastError, ForecastSeries, RecursiveForecaster};
use crate::models::{GbmRegressor, ModelError, ModelMetrics};
use crate::series::{forward_fill, interpolate_daily, DailySeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Errors raised by any pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Concentration(#[from] ConcentrationError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No usable {0} data on or after the start date")]
    NoData(Target),
}

/// Series the pipeline forecasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Hhi,
    Price,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Hhi => "hhi",
            Target::Price => "price",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one target run
#[derive(Debug, Clone, Serialize)]
pub struct TargetForecast {
    pub target: Target,
    pub forecast: ForecastSeries,
    pub model: GbmRegressor,
    /// In-sample metrics on the training table
    pub metrics: ModelMetrics,
    /// Daily pool shares, HHI target only
    pub share_table: Option<PoolShareTable>,
}

/// Raw inputs for a full run
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub pools: Vec<DailyPoolRecord>,
    pub prices: Vec<PricePoint>,
}

/// Both target results
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub hhi: TargetForecast,
    pub price: TargetForecast,
}

/// Runs the forecasting pipeline with a fixed configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    features: LagFeatureBuilder,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            features: LagFeatureBuilder::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Aggregate pool records into an HHI series and forecast it
    pub fn run_hhi(&self, records: &[DailyPoolRecord]) -> Result<TargetForecast, PipelineError> {
        let aggregator = Aggregator::new(self.config.start_date, &self.config.major_pools)?;
        let share_table = aggregator.share_table(records);
        let hhi = share_table.hhi();

        let series = forward_fill(&hhi).ok_or(PipelineError::NoData(Target::Hhi))?;
        let mut result = self.train_and_forecast(Target::Hhi, &series)?;
        result.share_table = Some(share_table);
        Ok(result)
    }

    /// Resample price points onto a daily calendar and forecast them
    pub fn run_price(&self, points: &[PricePoint]) -> Result<TargetForecast, PipelineError> {
        let start = self.config.start_date;
        let points: Vec<PricePoint> = points
            .iter()
            .filter(|p| p.date().is_some_and(|d| d >= start))
            .copied()
            .collect();

        let series = interpolate_daily(&points).ok_or(PipelineError::NoData(Target::Price))?;
        self.train_and_forecast(Target::Price, &series)
    }

    /// Run both targets
    pub fn run(&self, input: &PipelineInput) -> Result<PipelineOutput, PipelineError> {
        let hhi = self.run_hhi(&input.pools)?;
        let price = self.run_price(&input.prices)?;
        Ok(PipelineOutput { hhi, price })
    }

    fn train_and_forecast(
        &self,
        target: Target,
        series: &DailySeries,
    ) -> Result<TargetForecast, PipelineError> {
        info!(
            "{}: {} daily values from {:?} to {:?}",
            target,
            series.len(),
            series.first_date(),
            series.last_date()
        );

        let dataset = self.features.build_dataset(target.name(), series);
        let model = GbmRegressor::fit_with_params(&dataset, self.config.gbm.clone())?;
        let metrics = model.training_metrics().clone();

        info!(
            "{}: trained {} trees on {} rows, in-sample RMSE {:.6}",
            target,
            model.n_trees(),
            model.n_samples(),
            metrics.rmse.unwrap_or(f64::NAN)
        );

        let forecast = RecursiveForecaster::new(&model).forecast(series, self.config.horizon_end)?;

        Ok(TargetForecast {
            target,
            forecast,
            model,
            metrics,
            share_table: None,
        })
    }
}
