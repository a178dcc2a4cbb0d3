//! Gradient Boosting Machine implementation
//!
//! Squared-error gradient boosting over shallow regression trees, with seeded
//! row and column subsampling. A model only exists once fitting succeeded and
//! is immutable afterwards.

use super::tree::{RegressionTree, TreeParams};
use crate::data::Dataset;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur with the model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Insufficient history: no training rows with a complete lag window")]
    InsufficientHistory,

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Feature mismatch: model expects {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// GBM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Number of boosting iterations (trees)
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each tree
    pub subsample: f64,
    /// Fraction of feature columns drawn for each tree
    pub colsample: f64,
    /// Seed for row/column sampling
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: 3,
            learning_rate: 0.05,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample: 0.8,
            seed: 42,
        }
    }
}

impl GbmParams {
    /// Check that the parameters describe a trainable ensemble
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParams("n_estimators must be at least 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ModelError::InvalidParams("max_depth must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParams(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample", self.colsample)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ModelError::InvalidParams(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Number of items to draw for a sampling ratio, at least one
fn sample_size(n: usize, ratio: f64) -> usize {
    ((n as f64 * ratio).round() as usize).clamp(1, n)
}

/// Model evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Mean squared error
    pub mse: Option<f64>,
    /// Root mean squared error
    pub rmse: Option<f64>,
    /// R-squared score
    pub r2: Option<f64>,
    /// Mean absolute error
    pub mae: Option<f64>,
}

impl ModelMetrics {
    /// Calculate regression metrics
    pub fn regression(y_true: &[f64], y_pred: &[f64]) -> Self {
        let n = y_true.len();
        if n == 0 || n != y_pred.len() {
            return Self {
                mse: None,
                rmse: None,
                r2: None,
                mae: None,
            };
        }

        let mse_val: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum::<f64>()
            / n as f64;

        let mae_val: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).abs())
            .sum::<f64>()
            / n as f64;

        let mean_true: f64 = y_true.iter().sum::<f64>() / n as f64;
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean_true).powi(2)).sum();
        let ss_res = mse_val * n as f64;

        let r2_val = if ss_tot != 0.0 {
            1.0 - ss_res / ss_tot
        } else {
            0.0
        };

        Self {
            mse: Some(mse_val),
            rmse: Some(mse_val.sqrt()),
            r2: Some(r2_val),
            mae: Some(mae_val),
        }
    }
}

/// Fitted gradient boosting regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmRegressor {
    params: GbmParams,
    base_score: f64,
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
    feature_importance: Vec<f64>,
    training_metrics: ModelMetrics,
    n_samples: usize,
}

impl GbmRegressor {
    /// Train a model on a dataset with default parameters
    pub fn fit(dataset: &Dataset) -> Result<Self, ModelError> {
        Self::fit_with_params(dataset, GbmParams::default())
    }

    /// Train a model on a dataset
    pub fn fit_with_params(dataset: &Dataset, params: GbmParams) -> Result<Self, ModelError> {
        params.validate()?;

        if dataset.is_empty() {
            return Err(ModelError::InsufficientHistory);
        }

        let n_samples = dataset.len();
        let n_features = dataset.num_features();

        if n_features == 0 {
            return Err(ModelError::InvalidData("Dataset has no features".to_string()));
        }
        if dataset.targets.len() != n_samples {
            return Err(ModelError::InvalidData(format!(
                "{} feature rows but {} targets",
                n_samples,
                dataset.targets.len()
            )));
        }
        if let Some(row) = dataset.features.iter().find(|row| row.len() != n_features) {
            return Err(ModelError::FeatureMismatch {
                expected: n_features,
                got: row.len(),
            });
        }
        if dataset.targets.iter().any(|t| !t.is_finite()) {
            return Err(ModelError::InvalidData("Non-finite target value".to_string()));
        }

        info!(
            "Training GBM regressor on '{}' with {} samples and {} features",
            dataset.series, n_samples, n_features
        );
        info!("Parameters: {:?}", params);

        let targets = &dataset.targets;
        let base_score = targets.iter().sum::<f64>() / n_samples as f64;
        let mut predictions = vec![base_score; n_samples];
        let mut importance = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let tree_params = params.tree_params();
        let n_rows = sample_size(n_samples, params.subsample);
        let n_cols = sample_size(n_features, params.colsample);
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut all_columns: Vec<usize> = (0..n_features).collect();

        for round in 0..params.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(predictions.iter())
                .map(|(t, p)| t - p)
                .collect();

            let mut rows = index::sample(&mut rng, n_samples, n_rows).into_vec();
            rows.sort_unstable();

            all_columns.shuffle(&mut rng);
            let mut columns = all_columns[..n_cols].to_vec();
            columns.sort_unstable();

            let tree = RegressionTree::fit(
                &dataset.features,
                &residuals,
                &rows,
                &columns,
                &tree_params,
                &mut importance,
            );

            for (pred, x) in predictions.iter_mut().zip(dataset.features.iter()) {
                *pred += params.learning_rate * tree.predict_one(x);
            }

            if (round + 1) % 100 == 0 {
                let metrics = ModelMetrics::regression(targets, &predictions);
                debug!("Round {}: train RMSE={:.6}", round + 1, metrics.rmse.unwrap_or(f64::NAN));
            }

            trees.push(tree);
        }

        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in importance.iter_mut() {
                *v /= total;
            }
        }

        let training_metrics = ModelMetrics::regression(targets, &predictions);

        info!(
            "Model training completed: {} trees, in-sample RMSE={:.6}, R2={:.4}",
            trees.len(),
            training_metrics.rmse.unwrap_or(f64::NAN),
            training_metrics.r2.unwrap_or(f64::NAN)
        );

        Ok(Self {
            params,
            base_score,
            trees,
            feature_names: dataset.feature_names.clone(),
            feature_importance: importance,
            training_metrics,
            n_samples,
        })
    }

    /// Predict for a single sample
    pub fn predict_one(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != self.feature_names.len() {
            return Err(ModelError::FeatureMismatch {
                expected: self.feature_names.len(),
                got: x.len(),
            });
        }

        // Same accumulation order as during training
        let learning_rate = self.params.learning_rate;
        Ok(self
            .trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + learning_rate * tree.predict_one(x)))
    }

    /// Make predictions on new data
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        features.iter().map(|x| self.predict_one(x)).collect()
    }

    /// Predict on a dataset
    pub fn predict_dataset(&self, dataset: &Dataset) -> Result<Vec<f64>, ModelError> {
        self.predict(&dataset.features)
    }

    /// Evaluate the model on a dataset
    pub fn evaluate(&self, dataset: &Dataset) -> Result<ModelMetrics, ModelError> {
        let predictions = self.predict_dataset(dataset)?;
        Ok(ModelMetrics::regression(&dataset.targets, &predictions))
    }

    /// Get model parameters
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Mean of the training targets, the prediction before any tree
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of rows the model was trained on
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Normalised split-gain importance per feature
    pub fn feature_importance(&self) -> Vec<(&str, f64)> {
        self.feature_names
            .iter()
            .map(|n| n.as_str())
            .zip(self.feature_importance.iter().copied())
            .collect()
    }

    /// Fit on the training rows themselves (no held-out data)
    pub fn training_metrics(&self) -> &ModelMetrics {
        &self.training_metrics
    }

    /// Save model to JSON
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load model from JSON.
    ///
    /// Rejects models whose trees split on features the model does not have.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(json)?;
        model.check_structure()?;
        Ok(model)
    }

    fn check_structure(&self) -> Result<(), ModelError> {
        let n_features = self.feature_names.len();

        if self.feature_importance.len() != n_features {
            return Err(ModelError::InvalidData(format!(
                "{} feature names but {} importances",
                n_features,
                self.feature_importance.len()
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            if let Some(idx) = tree.max_feature_idx().filter(|&idx| idx >= n_features) {
                return Err(ModelError::InvalidData(format!(
                    "tree {} splits on feature {} but the model has {} features",
                    i, idx, n_features
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    fn create_test_dataset(n: usize) -> Dataset {
        let mut dataset = Dataset::new(
            "TEST".to_string(),
            vec!["feature1".to_string(), "feature2".to_string()],
        );
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        for i in 0..n {
            let x1 = i as f64;
            let x2 = (i as f64 * 0.5).sin();
            let target = x1 * 0.5 + x2 * 2.0 + 0.1;
            dataset.add_sample(vec![x1, x2], target, start + Duration::days(i as i64));
        }

        dataset
    }

    #[test]
    fn test_gbm_regressor() {
        let dataset = create_test_dataset(200);

        let model = GbmRegressor::fit(&dataset).unwrap();
        let metrics = model.evaluate(&dataset).unwrap();

        assert_eq!(model.n_trees(), GbmParams::default().n_estimators);
        assert!(metrics.r2.unwrap() > 0.9);
        assert_eq!(&metrics, model.training_metrics());
    }

    #[test]
    fn test_empty_dataset_is_insufficient_history() {
        let dataset = Dataset::new("TEST".to_string(), vec!["feature1".to_string()]);
        let result = GbmRegressor::fit(&dataset);
        assert!(matches!(result, Err(ModelError::InsufficientHistory)));
    }

    #[test]
    fn test_training_is_reproducible() {
        let dataset = create_test_dataset(120);

        let a = GbmRegressor::fit(&dataset).unwrap();
        let b = GbmRegressor::fit(&dataset).unwrap();

        let pa = a.predict_dataset(&dataset).unwrap();
        let pb = b.predict_dataset(&dataset).unwrap();
        for (x, y) in pa.iter().zip(pb.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_constant_target() {
        let mut dataset = Dataset::new("CONST".to_string(), vec!["x".to_string()]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..50 {
            dataset.add_sample(vec![i as f64], 100.0, start + Duration::days(i));
        }

        let model = GbmRegressor::fit(&dataset).unwrap();

        assert_eq!(model.predict_one(&[1000.0]).unwrap(), 100.0);
    }

    #[test]
    fn test_feature_mismatch() {
        let model = GbmRegressor::fit(&create_test_dataset(50)).unwrap();
        let err = model.predict_one(&[1.0]).unwrap_err();
        assert!(matches!(err, ModelError::FeatureMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_invalid_params() {
        let dataset = create_test_dataset(50);
        for params in [
            GbmParams { n_estimators: 0, ..Default::default() },
            GbmParams { learning_rate: 0.0, ..Default::default() },
            GbmParams { subsample: 1.5, ..Default::default() },
            GbmParams { colsample: 0.0, ..Default::default() },
        ] {
            let result = GbmRegressor::fit_with_params(&dataset, params);
            assert!(matches!(result, Err(ModelError::InvalidParams(_))));
        }
    }

    #[test]
    fn test_feature_importance_normalised() {
        let model = GbmRegressor::fit(&create_test_dataset(100)).unwrap();
        let total: f64 = model.feature_importance().iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_serialization() {
        let dataset = create_test_dataset(60);
        let model = GbmRegressor::fit_with_params(
            &dataset,
            GbmParams { n_estimators: 10, ..Default::default() },
        )
        .unwrap();

        let json = model.to_json().unwrap();
        let loaded = GbmRegressor::from_json(&json).unwrap();

        assert_eq!(loaded.n_trees(), model.n_trees());
        assert_abs_diff_eq!(
            loaded.predict_one(&[3.0, 0.2]).unwrap(),
            model.predict_one(&[3.0, 0.2]).unwrap(),
            epsilon = 1e-9
        );
    }

    /// Point every split at feature `idx`
    fn redirect_splits(value: &mut serde_json::Value, idx: usize) {
        match value {
            serde_json::Value::Object(map) => {
                if let Some(feature) = map.get_mut("feature_idx") {
                    *feature = serde_json::json!(idx);
                }
                for child in map.values_mut() {
                    redirect_splits(child, idx);
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    redirect_splits(item, idx);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_from_json_rejects_unknown_split_feature() {
        let dataset = create_test_dataset(60);
        let model = GbmRegressor::fit_with_params(
            &dataset,
            GbmParams { n_estimators: 5, ..Default::default() },
        )
        .unwrap();
        assert!(model.trees.iter().any(|t| t.max_feature_idx().is_some()));

        let mut value: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
        redirect_splits(&mut value, 7);

        let result = GbmRegressor::from_json(&value.to_string());
        assert!(matches!(result, Err(ModelError::InvalidData(_))));

        // In-range indices still load
        redirect_splits(&mut value, 1);
        assert!(GbmRegressor::from_json(&value.to_string()).is_ok());
    }
}
