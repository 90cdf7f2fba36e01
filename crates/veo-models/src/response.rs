//! Caller-facing response schemas.

use serde::{Deserialize, Serialize};

use crate::veo_prompt::VeoPrompt;

/// Successful pipeline response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    /// Validated Veo prompt
    #[serde(rename = "final")]
    pub final_prompt: VeoPrompt,
    /// Vision model description the prompt was generated from
    pub gemini_text: String,
}

/// Failed pipeline response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// User-facing message with a remediation step
    pub error: String,
    /// Raw model output, for schema validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Diagnostic detail for unexpected failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            raw: None,
            details: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
