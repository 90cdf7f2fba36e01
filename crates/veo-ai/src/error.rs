//! AI provider error types.

use thiserror::Error;

/// Result type for AI provider operations.
pub type AiResult<T> = Result<T, AiError>;

/// Errors from the vision and generation providers.
///
/// `Provider` carries the raw upstream failure before classification; the
/// remaining variants are user-facing and display a remediation message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{provider} API error ({}): {message}", status_label(.status))]
    Provider {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    InsufficientCredits(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    MalformedRequest(String),

    #[error("{0}")]
    UpstreamFailure(String),

    #[error("{0}")]
    Connectivity(String),

    #[error("{0}")]
    UploadFailed(String),

    #[error("{0}")]
    FileProcessing(String),

    #[error("{0}")]
    FileExpired(String),

    #[error("{0}")]
    FileTooLarge(String),

    #[error("{0}")]
    EmptyResponse(String),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Failed(String),
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "network".to_string(), |s| s.to_string())
}

impl AiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn provider(provider: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Map an OpenRouter HTTP status and body to a classified error.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 => Self::InvalidCredentials(
                "Invalid OpenRouter API key. Check the OPENROUTER_API_KEY setting.".to_string(),
            ),
            402 => Self::InsufficientCredits(
                "Insufficient OpenRouter credits. Top up the account balance and try again."
                    .to_string(),
            ),
            429 => Self::RateLimited(
                "API rate limit reached. Please wait a moment and try again.".to_string(),
            ),
            400 => Self::MalformedRequest(format!("Invalid request to OpenRouter: {}", body)),
            500 | 502 | 503 => Self::UpstreamFailure(
                "The OpenRouter server returned an error. Please try again later.".to_string(),
            ),
            _ => Self::Failed(format!("OpenRouter API error ({}): {}", status, body)),
        }
    }

    /// Check if a generation call should be retried after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AiError::Config(_)
                | AiError::InvalidCredentials(_)
                | AiError::InsufficientCredits(_)
                | AiError::MalformedRequest(_)
                | AiError::UnsupportedFormat(_)
                | AiError::FileTooLarge(_)
        )
    }

    /// User-facing message for this error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Raw HTTP status, if the error came straight from a provider response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AiError::Provider { status, .. } => *status,
            _ => None,
        }
    }
}
