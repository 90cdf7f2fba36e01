//! OpenRouter chat completions client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AiError, AiResult};
use crate::metrics::record_request;

use super::CompletionBackend;

const PROVIDER: &str = "OpenRouter";

pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-3.5-sonnet";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const APP_TITLE: &str = "Veo 3 Prompt Generator";

/// OpenRouter configuration.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution.
    pub site_url: String,
    pub app_title: String,
    pub request_timeout: Duration,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            app_title: APP_TITLE.to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::config_error("OPENROUTER_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            if !base_url.is_empty() {
                config = config.with_base_url(base_url);
            }
        }
        if let Ok(site_url) = std::env::var("SITE_URL") {
            if !site_url.is_empty() {
                config.site_url = site_url;
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<Value>,
}

/// OpenRouter API client.
#[derive(Clone)]
pub struct OpenRouterApi {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterApi {
    pub fn new(config: OpenRouterConfig) -> AiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AiError::config_error(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(OpenRouterConfig::from_env()?)
    }

    /// Models available to this key. Failures are logged and yield an empty list.
    pub async fn list_models(&self) -> Vec<Value> {
        let result = async {
            let response = self
                .client
                .get(format!("{}/models", self.config.base_url))
                .bearer_auth(&self.config.api_key)
                .send()
                .await?
                .error_for_status()?;
            response.json::<ModelList>().await
        }
        .await;

        match result {
            Ok(list) => list.data,
            Err(e) => {
                warn!("Failed to fetch OpenRouter models: {}", e.without_url());
                Vec::new()
            }
        }
    }

    async fn call(&self, prompt: &str, model: &str, temperature: f32) -> AiResult<String> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat { kind: "json_object" },
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.app_title)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() || e.is_request() {
                    AiError::Connectivity(
                        "Could not connect to OpenRouter. Check the network connection.".to_string(),
                    )
                } else {
                    AiError::failed(format!("Prompt generation failed: {}", e.without_url()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "OpenRouter error body: {}", body);
            return Err(AiError::from_http_status(status.as_u16(), &body));
        }

        let data: ChatResponse = response.json().await.map_err(|e| {
            AiError::InvalidResponse(format!("OpenRouter returned an unreadable response: {}", e))
        })?;

        let choice = data.choices.into_iter().next().ok_or_else(|| {
            AiError::EmptyResponse("OpenRouter returned no completion. Please try again.".to_string())
        })?;

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(AiError::EmptyResponse(
                "OpenRouter returned an empty response. Please try again.".to_string(),
            )),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterApi {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn complete_json(&self, prompt: &str, model: &str, temperature: f32) -> AiResult<String> {
        let start = Instant::now();
        let result = self.call(prompt, model, temperature).await;
        record_request(PROVIDER, "complete_json", result.is_ok(), start.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> OpenRouterApi {
        OpenRouterApi::new(OpenRouterConfig::new("sk-test").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_request_shape_and_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("HTTP-Referer", DEFAULT_SITE_URL))
            .and(header("X-Title", APP_TITLE))
            .and(body_partial_json(json!({
                "model": "anthropic/claude-3.5-sonnet",
                "messages": [{ "role": "user", "content": "PROMPT" }],
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"version\":\"1\"}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let content = api(&server)
            .complete_json("PROMPT", DEFAULT_OPENROUTER_MODEL, 0.2)
            .await
            .unwrap();
        assert_eq!(content, "{\"version\":\"1\"}");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(402).set_body_string("no credits"))
            .mount(&server)
            .await;

        let err = api(&server)
            .complete_json("PROMPT", DEFAULT_OPENROUTER_MODEL, 0.2)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::InsufficientCredits(_)));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = api(&server)
            .complete_json("PROMPT", DEFAULT_OPENROUTER_MODEL, 0.2)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_connectivity() {
        let config = OpenRouterConfig::new("sk-test").with_base_url("http://127.0.0.1:9");
        let err = OpenRouterApi::new(config)
            .unwrap()
            .complete_json("PROMPT", DEFAULT_OPENROUTER_MODEL, 0.2)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Connectivity(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "anthropic/claude-3.5-sonnet" }, { "id": "openai/gpt-4o" }]
            })))
            .mount(&server)
            .await;

        assert_eq!(api(&server).list_models().await.len(), 2);
    }

    #[tokio::test]
    async fn test_list_models_failure_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(api(&server).list_models().await.is_empty());
    }
}
