//! Pipeline configuration

use crate::concentration::OTHERS;
use crate::models::{GbmParams, ModelError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Invalid model parameters: {0}")]
    Model(#[from] ModelError),
}

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records and price points before this date are ignored
    pub start_date: NaiveDate,
    /// Pools tracked individually, in output order; the rest form "Others"
    pub major_pools: Vec<String>,
    /// Last forecast date, inclusive
    pub horizon_end: NaiveDate,
    /// Model hyperparameters shared by both targets
    pub gbm: GbmParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            major_pools: [
                "Foundry USA",
                "AntPool",
                "ViaBTC",
                "F2Pool",
                "MARA Pool",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            horizon_end: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap_or_default(),
            gbm: GbmParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file; absent fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(pool) = self.major_pools.iter().find(|p| p.as_str() == OTHERS) {
            return Err(ConfigError::Invalid(format!(
                "major pool label {:?} is reserved",
                pool
            )));
        }
        if self.major_pools.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "major pool labels must not be empty".to_string(),
            ));
        }
        self.gbm.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.start_date < config.horizon_end);
        assert_eq!(config.major_pools.len(), 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"start_date": "2023-06-01", "major_pools": ["A", "B"], "gbm": {{"n_estimators": 50}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert_eq!(config.major_pools, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(config.horizon_end, PipelineConfig::default().horizon_end);
        assert_eq!(config.gbm.n_estimators, 50);
        assert_eq!(config.gbm.max_depth, GbmParams::default().max_depth);
    }

    #[test]
    fn test_reserved_label_rejected() {
        let config = PipelineConfig {
            major_pools: vec!["A".to_string(), OTHERS.to_string()],
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let config = PipelineConfig::default();

        config.to_json_file(file.path()).unwrap();
        let loaded = PipelineConfig::from_json_file(file.path()).unwrap();

        assert_eq!(loaded, config);
    }
}
