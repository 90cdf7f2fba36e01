//! Pipeline configuration.

use veo_ai::{
    GeminiConfig, GenerationConfig, OpenRouterConfig, VertexConfig, VisionConfig, VisionStrategy,
};
use veo_storage::StorageConfig;

use crate::error::{PipelineError, PipelineResult};

/// Where uploaded videos are kept.
#[derive(Debug, Clone)]
pub enum StorageSettings {
    /// S3-compatible bucket (GCS interop, R2, S3).
    S3(StorageConfig),
    /// In-process store for local development.
    Memory { bucket: String },
}

/// Configuration for every pipeline component, read once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub storage: StorageSettings,
    pub vision_strategy: VisionStrategy,
    /// Present for the upload-and-poll strategy.
    pub gemini: Option<GeminiConfig>,
    /// Present for the direct-reference strategy.
    pub vertex: Option<VertexConfig>,
    pub vision: VisionConfig,
    pub openrouter: OpenRouterConfig,
    pub generation: GenerationConfig,
    /// Delete the stored video after each run.
    pub cleanup: bool,
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Missing credentials or storage settings are reported here rather
    /// than on the first request.
    pub fn from_env() -> PipelineResult<Self> {
        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StorageSettings::Memory {
                bucket: std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "local".to_string()),
            },
            "s3" | "gcs" | "r2" => StorageSettings::S3(
                StorageConfig::from_env().map_err(|e| PipelineError::config_error(e.to_string()))?,
            ),
            other => {
                return Err(PipelineError::config_error(format!(
                    "Unknown STORAGE_BACKEND '{}', expected 's3' or 'memory'",
                    other
                )))
            }
        };

        let vision_strategy = match std::env::var("VISION_STRATEGY") {
            Ok(value) if !value.trim().is_empty() => value.parse().map_err(PipelineError::setup)?,
            _ => VisionStrategy::UploadAndPoll,
        };

        let (gemini, vertex) = match vision_strategy {
            VisionStrategy::UploadAndPoll => {
                let gemini = GeminiConfig::from_env().map_err(PipelineError::setup)?;
                (Some(gemini), None)
            }
            VisionStrategy::DirectReference => {
                let vertex = VertexConfig::from_env().map_err(PipelineError::setup)?;
                (None, Some(vertex))
            }
        };

        Ok(Self {
            storage,
            vision_strategy,
            gemini,
            vertex,
            vision: VisionConfig::from_env().map_err(PipelineError::setup)?,
            openrouter: OpenRouterConfig::from_env().map_err(PipelineError::setup)?,
            generation: GenerationConfig::from_env(),
            cleanup: std::env::var("PIPELINE_CLEANUP")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(true),
        })
    }
}
