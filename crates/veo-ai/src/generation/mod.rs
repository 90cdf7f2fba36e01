//! JSON generation from the filled prompt template.

mod openrouter;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{AiError, AiResult};
use crate::retry::{retry_async, RetryPolicy};

pub use openrouter::{
    OpenRouterApi, OpenRouterConfig, APP_TITLE, DEFAULT_OPENROUTER_BASE_URL,
    DEFAULT_OPENROUTER_MODEL, DEFAULT_SITE_URL,
};

/// A chat completion endpoint that can be forced to emit JSON.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn provider(&self) -> &'static str;

    /// One completion call, returning the raw message content.
    async fn complete_json(&self, prompt: &str, model: &str, temperature: f32) -> AiResult<String>;
}

/// Generation settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub default_model: String,
    pub temperature: f32,
    pub retry: RetryPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_OPENROUTER_MODEL.to_string(),
            temperature: 0.2,
            retry: RetryPolicy::linear("json_generate"),
        }
    }
}

impl GenerationConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            if !model.trim().is_empty() {
                config.default_model = model.trim().to_string();
            }
        }
        if let Some(retries) = std::env::var("OPENROUTER_MAX_RETRIES")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.retry = config.retry.with_max_retries(retries);
        }
        config
    }
}

/// JSON Generation Client.
pub struct JsonGenerationClient {
    backend: Arc<dyn CompletionBackend>,
    config: GenerationConfig,
}

impl JsonGenerationClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: GenerationConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate raw JSON text for `prompt`.
    ///
    /// Terminal errors (credentials, credits, malformed request) are returned
    /// on the first attempt; everything else is retried with linear backoff.
    pub async fn generate(&self, prompt: &str, model_override: Option<&str>) -> AiResult<String> {
        let model = model_override
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.config.default_model.as_str());
        let temperature = self.config.temperature;

        info!(model, provider = self.backend.provider(), "Requesting JSON generation");

        retry_async(&self.config.retry, AiError::is_retryable, |_attempt| {
            self.backend.complete_json(prompt, model, temperature)
        })
        .await
        .into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> JsonGenerationClient {
        let api = OpenRouterApi::new(OpenRouterConfig::new("sk-test").with_base_url(server.uri())).unwrap();
        let config = GenerationConfig {
            retry: RetryPolicy::linear("test").with_base_delay(Duration::from_millis(1)),
            ..GenerationConfig::default()
        };
        JsonGenerationClient::new(Arc::new(api), config)
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).generate("PROMPT", None).await.unwrap_err();
        assert!(matches!(err, AiError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn test_service_unavailable_retries_to_max() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).generate("PROMPT", None).await.unwrap_err();
        assert!(matches!(err, AiError::UpstreamFailure(_)));
    }

    #[tokio::test]
    async fn test_bad_request_carries_body_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("response_format unsupported"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).generate("PROMPT", None).await.unwrap_err();
        assert!(err.to_string().contains("response_format unsupported"));
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "{}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(client(&server).generate("PROMPT", None).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_model_override() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(wiremock::matchers::body_partial_json(json!({ "model": "openai/gpt-4o" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "{}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .generate("PROMPT", Some("openai/gpt-4o"))
            .await
            .unwrap();
    }
}
