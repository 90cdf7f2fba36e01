//! Shared data models for the Veo prompt pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Uploaded video assets and their durable storage locators
//! - Pre-flight file validation
//! - Vision analysis results and the final Veo prompt object
//! - Pipeline state and caller-facing response schemas

pub mod analysis;
pub mod pipeline_state;
pub mod response;
pub mod validation;
pub mod veo_prompt;
pub mod video;

// Re-export common types
pub use analysis::AnalysisResult;
pub use pipeline_state::{InvalidTransition, PipelineState, RunId};
pub use response::{ErrorResponse, ProcessResponse};
pub use validation::{
    validate_video_file, FileValidationResult, MAX_FILE_SIZE, SUPPORTED_MIME_TYPES,
};
pub use veo_prompt::{VeoPrompt, REQUIRED_FIELDS};
pub use video::{StoredVideoLocator, VideoAsset, DEFAULT_FILENAME, DEFAULT_MIME_TYPE};
