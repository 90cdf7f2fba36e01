//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use veo_models::{ErrorResponse, FileValidationResult, MAX_FILE_SIZE};
use veo_pipeline::PipelineError;

use crate::config::ApiConfig;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Could not read the upload: {}", .0.body_text())]
    Multipart(MultipartError),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Pipeline(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Render with internal details shown outside production.
    pub fn into_response_for(self, config: &ApiConfig) -> Response {
        let body = self.body(!config.is_production());
        (self.status_code(), Json(body)).into_response()
    }

    fn body(&self, expose_details: bool) -> ErrorResponse {
        match self {
            ApiError::Pipeline(e) => {
                let mut body = ErrorResponse::new(e.user_message());
                if let Some(raw) = e.raw() {
                    body = body.with_raw(raw);
                }
                if let Some(details) = e.details().filter(|_| expose_details) {
                    body = body.with_details(details);
                }
                body
            }
            other => ErrorResponse::new(other.to_string()),
        }
    }
}

/// A body over the configured limit gets the same message as an oversized file.
impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            let reason = FileValidationResult::TooLarge(MAX_FILE_SIZE + 1)
                .reason()
                .unwrap_or_else(|| e.body_text());
            return ApiError::PayloadTooLarge(reason);
        }
        ApiError::Multipart(e)
    }
}

/// Details are never exposed without a config to check.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body(false))).into_response()
    }
}
