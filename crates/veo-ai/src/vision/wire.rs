//! `generateContent` request and response shapes.
//!
//! Responses vary by endpoint and API version, so they are modelled as an
//! untagged union and text is extracted from whichever shape arrived.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AiError, AiResult};

use super::FileReference;

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub file_uri: String,
    pub mime_type: String,
}

impl GenerateContentRequest {
    /// A single user turn: the instruction, then the video.
    pub fn describe_video(instruction: &str, file: &FileReference) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: instruction.to_string(),
                    },
                    Part::FileData {
                        file_data: FileData {
                            file_uri: file.uri.clone(),
                            mime_type: file.mime_type.clone(),
                        },
                    },
                ],
            }],
        }
    }
}

/// Any `generateContent` response shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GenerateContentResponse {
    /// Flattened SDK-style shape with a top-level `text`.
    Text { text: String },
    Candidates {
        candidates: Vec<Candidate>,
        #[serde(default, rename = "promptFeedback")]
        prompt_feedback: Option<PromptFeedback>,
    },
    /// Prompt rejected before any candidate was produced.
    Blocked {
        #[serde(rename = "promptFeedback")]
        prompt_feedback: PromptFeedback,
    },
    Other(Value),
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Response text, trimmed, if any non-blank text is present.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            GenerateContentResponse::Text { text } => Some(text.clone()),
            GenerateContentResponse::Candidates { candidates, .. } => {
                candidates.iter().find_map(candidate_text)
            }
            GenerateContentResponse::Blocked { .. } => None,
            GenerateContentResponse::Other(value) => value_text(value),
        }?;

        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn block_reason(&self) -> Option<&str> {
        match self {
            GenerateContentResponse::Candidates {
                prompt_feedback: Some(feedback),
                ..
            }
            | GenerateContentResponse::Blocked {
                prompt_feedback: feedback,
            } => feedback.block_reason.as_deref(),
            _ => None,
        }
    }

    /// Extract the text or fail with an empty-response error.
    pub fn into_text(self, provider: &str) -> AiResult<String> {
        if let Some(text) = self.text() {
            return Ok(text);
        }
        let message = match self.block_reason() {
            Some(reason) => format!(
                "{} returned an empty response (blocked: {}). Try a different video.",
                provider, reason
            ),
            None => format!(
                "{} returned an empty response. Please try again.",
                provider
            ),
        };
        Err(AiError::EmptyResponse(message))
    }
}

fn candidate_text(candidate: &Candidate) -> Option<String> {
    let parts = &candidate.content.as_ref()?.parts;
    let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
    (!text.trim().is_empty()).then_some(text)
}

fn value_text(value: &Value) -> Option<String> {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    if let Some(inner) = value.get("response") {
        return value_text(inner);
    }
    value
        .get("candidates")?
        .as_array()?
        .iter()
        .find_map(|candidate| {
            let text: String = candidate
                .pointer("/content/parts")?
                .as_array()?
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            (!text.trim().is_empty()).then_some(text)
        })
}
