//! Vertex AI client for direct object-store references.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gcp_auth::TokenProvider;
use reqwest::Client;

use crate::error::{AiError, AiResult};
use crate::metrics::record_request;

use super::gemini::{check_status, network_error};
use super::wire::{GenerateContentRequest, GenerateContentResponse};
use super::{FileReference, VisionModel};

pub(super) const PROVIDER: &str = "Vertex AI";

/// OAuth scope for Vertex AI.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Vertex AI configuration.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    /// Override for the regional endpoint.
    pub endpoint: Option<String>,
    pub request_timeout: Duration,
}

impl VertexConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: "us-central1".to_string(),
            endpoint: None,
            request_timeout: Duration::from_secs(600),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let project_id = std::env::var("GOOGLE_CLOUD_PROJECT")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AiError::config_error("GOOGLE_CLOUD_PROJECT not set"))?;

        let mut config = Self::new(project_id);
        if let Ok(location) = std::env::var("GOOGLE_CLOUD_LOCATION") {
            if !location.is_empty() {
                config.location = location;
            }
        }
        config.endpoint = std::env::var("VERTEX_ENDPOINT").ok().filter(|e| !e.is_empty());
        Ok(config)
    }

    /// `generateContent` URL for `model`.
    pub fn generate_url(&self, model: &str) -> String {
        let base = self
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location));
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            base.trim_end_matches('/'),
            self.project_id,
            self.location,
            model
        )
    }
}

/// Vertex AI Gemini client authenticated with application-default credentials.
pub struct VertexApi {
    client: Client,
    config: VertexConfig,
    auth: Arc<dyn TokenProvider>,
}

impl VertexApi {
    /// Create a client, resolving Google credentials.
    pub async fn new(config: VertexConfig) -> AiResult<Self> {
        let auth = gcp_auth::provider().await.map_err(|e| {
            AiError::config_error(format!("Google application credentials unavailable: {}", e))
        })?;
        Self::with_token_provider(config, auth)
    }

    pub fn with_token_provider(config: VertexConfig, auth: Arc<dyn TokenProvider>) -> AiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AiError::config_error(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            auth,
        })
    }

    async fn call(&self, model: &str, request: &GenerateContentRequest) -> AiResult<String> {
        let token = self
            .auth
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| AiError::provider(PROVIDER, Some(401), format!("access token unavailable: {}", e)))?;

        let response = self
            .client
            .post(self.config.generate_url(model))
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let body: GenerateContentResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| {
                AiError::provider(PROVIDER, None, format!("invalid generateContent response: {}", e))
            })?;

        body.into_text(PROVIDER)
    }
}

#[async_trait]
impl VisionModel for VertexApi {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, model: &str, instruction: &str, file: &FileReference) -> AiResult<String> {
        let start = Instant::now();
        let request = GenerateContentRequest::describe_video(instruction, file);
        let result = self.call(model, &request).await;
        record_request(PROVIDER, "generate", result.is_ok(), start.elapsed().as_secs_f64() * 1000.0);
        result
    }
}
