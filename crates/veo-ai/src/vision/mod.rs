//! Vision analysis of uploaded videos.
//!
//! Two provider shapes sit behind the same [`VisionAnalyzer`]:
//! - upload-and-poll: the video is uploaded to the Gemini Files API and
//!   polled until `ACTIVE` before generation
//! - direct-reference: the object-store locator is passed straight to
//!   Vertex AI

mod analyzer;
mod gemini;
mod vertex;
pub mod wire;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::AiResult;

pub use analyzer::{
    classify_upload_error, classify_vision_error, is_transient_vision_error, VisionAnalyzer,
    VisionConfig, VisionStrategy, ANALYSIS_INSTRUCTION,
};
pub use gemini::{GeminiApi, GeminiConfig, DEFAULT_GEMINI_BASE_URL};
pub use vertex::{VertexApi, VertexConfig};

/// A video the vision model can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub uri: String,
    pub mime_type: String,
}

/// Processing state of a provider-side file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[default]
    StateUnspecified,
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileStatus {
    #[serde(default)]
    pub message: Option<String>,
}

/// A file held in the provider's file store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, `files/{id}`
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub state: FileState,
    #[serde(default)]
    pub error: Option<FileStatus>,
}

impl RemoteFile {
    /// Reference for generation once the file is active.
    pub fn reference(&self, fallback_mime: &str) -> FileReference {
        FileReference {
            uri: self.uri.clone().unwrap_or_else(|| self.name.clone()),
            mime_type: self
                .mime_type
                .clone()
                .unwrap_or_else(|| fallback_mime.to_string()),
        }
    }
}

/// A model that can describe a referenced video.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider name for logs and metrics.
    fn provider(&self) -> &'static str;

    /// Run one generation call and return the response text.
    async fn generate(&self, model: &str, instruction: &str, file: &FileReference)
        -> AiResult<String>;
}

/// A provider-side file store with asynchronous activation.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, data: Bytes, mime_type: &str, display_name: &str)
        -> AiResult<RemoteFile>;

    async fn get(&self, name: &str) -> AiResult<RemoteFile>;

    /// Delete by resource name or full URI.
    async fn delete(&self, name_or_uri: &str) -> AiResult<()>;
}

/// Normalise a file name or URI to a `files/{id}` resource name.
pub fn normalize_file_name(name_or_uri: &str) -> String {
    if name_or_uri.starts_with("files/") {
        return name_or_uri.to_string();
    }
    match name_or_uri.split_once("/files/") {
        Some((_, id)) => format!("files/{}", id),
        None => name_or_uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(normalize_file_name("files/abc123"), "files/abc123");
        assert_eq!(
            normalize_file_name("https://generativelanguage.googleapis.com/v1beta/files/abc123"),
            "files/abc123"
        );
        assert_eq!(normalize_file_name("abc123"), "abc123");
    }

    #[test]
    fn test_remote_file_deserialize() {
        let file: RemoteFile = serde_json::from_str(
            r#"{
                "name": "files/abc",
                "uri": "https://example.com/v1beta/files/abc",
                "mimeType": "video/mp4",
                "state": "PROCESSING",
                "sizeBytes": "1024"
            }"#,
        )
        .unwrap();
        assert_eq!(file.state, FileState::Processing);
        assert_eq!(file.reference("video/webm").mime_type, "video/mp4");
    }

    #[test]
    fn test_unknown_state_tolerated() {
        let file: RemoteFile =
            serde_json::from_str(r#"{"name": "files/abc", "state": "ARCHIVED"}"#).unwrap();
        assert_eq!(file.state, FileState::Unknown);
        assert_eq!(file.reference("video/webm").uri, "files/abc");
    }
}
