//! Pipeline error types.

use thiserror::Error;

use veo_ai::AiError;
use veo_storage::StorageError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Terminal outcome of a failed run.
///
/// Component errors already carry user-facing messages and are passed
/// through unchanged; only `Unexpected` wraps something foreign.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InputValidation(String),

    #[error("Could not store the video ({0}). Please try again later.")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Analysis(AiError),

    #[error("{0}")]
    Generation(AiError),

    #[error("The generated prompt is not valid Veo JSON: {message}. Please try again.")]
    SchemaValidation { message: String, raw: String },

    #[error("Processing was cancelled.")]
    Cancelled,

    #[error("An unexpected error occurred. Please try again.")]
    Unexpected { detail: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn input_validation(msg: impl Into<String>) -> Self {
        Self::InputValidation(msg.into())
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::Unexpected {
            detail: detail.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Startup failure while building a provider client.
    pub fn setup(e: AiError) -> Self {
        match e {
            AiError::Config(msg) => Self::Config(msg),
            other => Self::Config(other.to_string()),
        }
    }

    /// HTTP status for this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::InputValidation(_) => 400,
            PipelineError::Storage(e) if e.is_config_error() => 500,
            PipelineError::Storage(_) => 502,
            PipelineError::Analysis(AiError::Config(_))
            | PipelineError::Generation(AiError::Config(_)) => 500,
            PipelineError::Analysis(_) | PipelineError::Generation(_) => 502,
            PipelineError::SchemaValidation { .. } => 500,
            PipelineError::Cancelled => 499,
            PipelineError::Unexpected { .. } | PipelineError::Config(_) => 500,
        }
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Raw model output, for schema validation failures.
    pub fn raw(&self) -> Option<&str> {
        match self {
            PipelineError::SchemaValidation { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Diagnostic detail for unexpected failures.
    pub fn details(&self) -> Option<&str> {
        match self {
            PipelineError::Unexpected { detail } => Some(detail),
            _ => None,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InputValidation(_) => "input_validation",
            PipelineError::Storage(_) => "storage",
            PipelineError::Analysis(_) => "analysis",
            PipelineError::Generation(_) => "generation",
            PipelineError::SchemaValidation { .. } => "schema_validation",
            PipelineError::Cancelled => "cancelled",
            PipelineError::Unexpected { .. } => "unexpected",
            PipelineError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PipelineError::input_validation("too big").status_code(), 400);
        assert_eq!(
            PipelineError::Analysis(AiError::QuotaExceeded("wait".into())).status_code(),
            502
        );
        assert_eq!(
            PipelineError::Generation(AiError::InvalidCredentials("key".into())).status_code(),
            502
        );
        assert_eq!(
            PipelineError::SchemaValidation {
                message: "Missing required fields: audio".into(),
                raw: "{}".into()
            }
            .status_code(),
            500
        );
        assert_eq!(PipelineError::unexpected("panic").status_code(), 500);
        assert_eq!(PipelineError::Cancelled.status_code(), 499);
    }

    #[test]
    fn test_component_messages_pass_through() {
        let err = PipelineError::Analysis(AiError::ServiceUnavailable(
            "The analysis service is busy. Please try again in a little while.".into(),
        ));
        assert_eq!(
            err.user_message(),
            "The analysis service is busy. Please try again in a little while."
        );
    }

    #[test]
    fn test_raw_and_details() {
        let err = PipelineError::SchemaValidation {
            message: "JSON parsing failed: EOF".into(),
            raw: "```json\n{".into(),
        };
        assert_eq!(err.raw(), Some("```json\n{"));
        assert_eq!(err.details(), None);

        let err = PipelineError::unexpected("task panicked");
        assert_eq!(err.details(), Some("task panicked"));
        assert_eq!(err.raw(), None);
    }
}
