//! Gemini API client (Files API + generateContent).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AiError, AiResult};
use crate::metrics::record_request;

use super::wire::{GenerateContentRequest, GenerateContentResponse};
use super::{normalize_file_name, FileReference, FileStore, RemoteFile, VisionModel};

const PROVIDER: &str = "Gemini";

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::config_error("GEMINI_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            if !base_url.is_empty() {
                config = config.with_base_url(base_url);
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiApi {
    client: Client,
    config: GeminiConfig,
}

impl GeminiApi {
    pub fn new(config: GeminiConfig) -> AiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AiError::config_error(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn start_upload(&self, size: usize, mime_type: &str, display_name: &str) -> AiResult<String> {
        let response = self
            .client
            .post(self.url("upload/v1beta/files"))
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;
        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AiError::provider(PROVIDER, None, "upload session response had no upload URL")
            })
    }
}

#[async_trait]
impl FileStore for GeminiApi {
    async fn upload(&self, data: Bytes, mime_type: &str, display_name: &str) -> AiResult<RemoteFile> {
        let start = Instant::now();
        let size = data.len();
        let upload_url = self.start_upload(size, mime_type, display_name).await?;

        let result = async {
            let response = self
                .client
                .post(&upload_url)
                .header("x-goog-api-key", &self.config.api_key)
                .header("X-Goog-Upload-Offset", "0")
                .header("X-Goog-Upload-Command", "upload, finalize")
                .body(data)
                .send()
                .await
                .map_err(|e| network_error(PROVIDER, e))?;

            let response = check_status(PROVIDER, response).await?;
            let body: UploadResponse = response.json().await.map_err(|e| {
                AiError::provider(PROVIDER, None, format!("invalid upload response: {}", e))
            })?;
            Ok::<_, AiError>(body.file)
        }
        .await;

        record_request(PROVIDER, "upload", result.is_ok(), start.elapsed().as_secs_f64() * 1000.0);
        let file = result?;
        info!(file = %file.name, bytes = size, "Uploaded video to Gemini Files API");
        Ok(file)
    }

    async fn get(&self, name: &str) -> AiResult<RemoteFile> {
        let response = self
            .client
            .get(self.url(&format!("v1beta/{}", name)))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::provider(PROVIDER, None, format!("invalid file response: {}", e)))
    }

    async fn delete(&self, name_or_uri: &str) -> AiResult<()> {
        let name = normalize_file_name(name_or_uri);
        debug!(file = %name, "Deleting Gemini file");

        let response = self
            .client
            .delete(self.url(&format!("v1beta/{}", name)))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        check_status(PROVIDER, response).await?;
        Ok(())
    }
}

#[async_trait]
impl VisionModel for GeminiApi {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, model: &str, instruction: &str, file: &FileReference) -> AiResult<String> {
        let start = Instant::now();
        let request = GenerateContentRequest::describe_video(instruction, file);

        let result = async {
            let response = self
                .client
                .post(self.url(&format!("v1beta/models/{}:generateContent", model)))
                .header("x-goog-api-key", &self.config.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| network_error(PROVIDER, e))?;

            let body: GenerateContentResponse =
                check_status(PROVIDER, response).await?.json().await.map_err(|e| {
                    AiError::provider(PROVIDER, None, format!("invalid generateContent response: {}", e))
                })?;
            body.into_text(PROVIDER)
        }
        .await;

        record_request(PROVIDER, "generate", result.is_ok(), start.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

pub(super) fn network_error(provider: &'static str, e: reqwest::Error) -> AiError {
    let e = e.without_url();
    let message = if e.is_timeout() {
        format!("request timeout: {}", e)
    } else {
        e.to_string()
    };
    AiError::provider(provider, None, message)
}

/// Pass successful responses through; turn failures into raw provider errors.
pub(super) async fn check_status(provider: &'static str, response: Response) -> AiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{}: {}", code, envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) if body.is_empty() => status.canonical_reason().unwrap_or("error").to_string(),
        Err(_) => body,
    };

    Err(AiError::provider(provider, Some(status.as_u16()), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::FileState;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> GeminiApi {
        GeminiApi::new(GeminiConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_resumable_upload() {
        let server = MockServer::start().await;
        let upload_url = format!("{}/upload/session/xyz", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .and(header("X-Goog-Upload-Command", "start"))
            .and(header("X-Goog-Upload-Header-Content-Type", "video/mp4"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-goog-upload-url", upload_url.as_str()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/upload/session/xyz"))
            .and(header("X-Goog-Upload-Command", "upload, finalize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": {
                    "name": "files/xyz",
                    "uri": "https://generativelanguage.googleapis.com/v1beta/files/xyz",
                    "mimeType": "video/mp4",
                    "state": "PROCESSING"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = api(&server)
            .upload(Bytes::from_static(b"fake video"), "video/mp4", "clip.mp4")
            .await
            .unwrap();
        assert_eq!(file.name, "files/xyz");
        assert_eq!(file.state, FileState::Processing);
    }

    #[tokio::test]
    async fn test_generate_sends_file_reference() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(body_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "Describe." },
                        { "fileData": { "fileUri": "https://host/v1beta/files/xyz", "mimeType": "video/mp4" } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "A cat jumps SCREEN-LEFT." }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = FileReference {
            uri: "https://host/v1beta/files/xyz".to_string(),
            mime_type: "video/mp4".to_string(),
        };
        let text = api(&server)
            .generate("gemini-2.5-flash", "Describe.", &file)
            .await
            .unwrap();
        assert_eq!(text, "A cat jumps SCREEN-LEFT.");
    }

    #[tokio::test]
    async fn test_error_envelope_keeps_status_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            })))
            .mount(&server)
            .await;

        let file = FileReference {
            uri: "files/xyz".to_string(),
            mime_type: "video/mp4".to_string(),
        };
        let err = api(&server)
            .generate("gemini-2.5-flash", "Describe.", &file)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AiError::provider(PROVIDER, Some(503), "UNAVAILABLE: The model is overloaded.")
        );
    }

    #[tokio::test]
    async fn test_delete_normalizes_uri() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1beta/files/xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .delete("https://generativelanguage.googleapis.com/v1beta/files/xyz")
            .await
            .unwrap();
    }
}
