//! Application state.

use std::sync::Arc;

use veo_pipeline::{Pipeline, PipelineConfig, PipelineResult, VideoProcessor};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub processor: Arc<dyn VideoProcessor>,
}

impl AppState {
    pub fn new(config: ApiConfig, processor: Arc<dyn VideoProcessor>) -> Self {
        Self { config, processor }
    }

    /// Build the production pipeline from environment variables.
    pub async fn from_env(config: ApiConfig) -> PipelineResult<Self> {
        let pipeline_config = PipelineConfig::from_env()?;
        let pipeline = Pipeline::from_config(pipeline_config).await?;
        Ok(Self::new(config, Arc::new(pipeline)))
    }
}
