//! Machine learning models module
//!
//! This module provides:
//! - Gradient Boosting Machine regressor
//! - Regression trees used as its base learners
//! - Regression metrics

pub mod gbm;
pub mod tree;

pub use gbm::{GbmParams, GbmRegressor, ModelError, ModelMetrics};
pub use tree::{RegressionTree, TreeNode, TreeParams};
