//! AI provider clients for the Veo prompt pipeline.
//!
//! This crate provides:
//! - Vision analysis over Gemini (Files API upload-and-poll) or Vertex AI
//!   (direct object-store reference), with per-model retry and model fallback
//! - The fixed generation prompt template
//! - A JSON generation client for OpenRouter chat completions
//! - Validation of the generated Veo prompt JSON
//! - A reusable retry policy

pub mod error;
pub mod generation;
pub mod metrics;
pub mod retry;
pub mod template;
pub mod validation;
pub mod vision;

pub use error::{AiError, AiResult};
pub use generation::{
    CompletionBackend, GenerationConfig, JsonGenerationClient, OpenRouterApi, OpenRouterConfig,
};
pub use retry::{retry_async, Backoff, RetryPolicy, RetryResult};
pub use template::{build_generation_prompt, PromptTemplate, DEFAULT_TEMPLATE};
pub use validation::{parse_veo_prompt, strip_code_fence, PromptValidationError};
pub use vision::{
    FileReference, FileState, FileStore, GeminiApi, GeminiConfig, RemoteFile, VertexApi,
    VertexConfig, VisionAnalyzer, VisionConfig, VisionModel, VisionStrategy,
};
