//! Pipeline orchestration module
//!
//! This module provides:
//! - Pipeline configuration (JSON file with defaults)
//! - The orchestrator running the HHI and price targets independently

pub mod config;
pub mod orchestrator;

pub use config::{ConfigError, PipelineConfig};
pub use orchestrator::{
    Pipeline, PipelineError, PipelineInput, PipelineOutput, Target, TargetForecast,
};
