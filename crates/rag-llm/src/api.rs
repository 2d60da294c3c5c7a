//! HTTP language model using OpenAI-compatible or Anthropic endpoints.

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, warn};

use rag_types::LlmSettings;

use crate::error::LlmError;
use crate::LanguageModel;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Wire protocol spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `POST {base}/chat/completions`
    OpenAi,
    /// `POST {base}/messages`
    Anthropic,
}

impl Provider {
    fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_BASE_URL,
            Provider::Anthropic => ANTHROPIC_BASE_URL,
        }
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(LlmError::Config(format!("unknown provider '{}'", other))),
        }
    }
}

/// Configuration for [`ApiLanguageModel`].
#[derive(Debug, Clone)]
pub struct ApiLlmConfig {
    pub provider: Provider,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion length cap (Anthropic requires one)
    pub max_tokens: u32,

    /// Request timeout
    pub timeout: Duration,

    /// Attempts per completion, including the first
    pub max_retries: u32,
}

impl ApiLlmConfig {
    fn with_provider(
        provider: Provider,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            temperature: 0.2,
            max_tokens: 1024,
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Create config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_provider(Provider::OpenAi, api_key, model)
    }

    /// Create config for the Anthropic API.
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_provider(Provider::Anthropic, api_key, model)
    }

    /// Build from loaded settings. The API key must already be resolved.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let provider: Provider = settings.provider.parse()?;
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::Config("no API key configured".to_string()))?;

        let mut config = Self::with_provider(provider, api_key, settings.model.clone());
        if let Some(base_url) = &settings.api_base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.temperature = settings.temperature;
        config.timeout = Duration::from_secs(settings.timeout_secs);
        config.max_retries = settings.max_retries.max(1);
        Ok(config)
    }

    /// Point at a different endpoint (proxies, compatible servers, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }
}

/// Language model backed by a remote completion API.
pub struct ApiLanguageModel {
    client: Client,
    config: ApiLlmConfig,
}

impl ApiLanguageModel {
    pub fn new(config: ApiLlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiLlmConfig {
        &self.config
    }

    /// Call the API with retry logic.
    async fn call_api(&self, prompt: &str) -> Result<String, LlmError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(
                attempt = attempts,
                model = %self.config.model,
                prompt_len = prompt.len(),
                "Calling completion API"
            );

            let result = match self.config.provider {
                Provider::OpenAi => self.make_openai_request(prompt).await,
                Provider::Anthropic => self.make_anthropic_request(prompt).await,
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, attempts, "Completion failed, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, attempts, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Completion failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Send a request and map transport and HTTP failures.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let response = request
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        if response.status() == 429 {
            return Err(LlmError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn make_openai_request(&self, prompt: &str) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: Option<String>,
        }

        let request = OpenAIRequest {
            model: &self.config.model,
            messages: vec![Message::user(prompt)],
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .send(
                self.client
                    .post(&url)
                    .bearer_auth(self.config.api_key.expose_secret())
                    .json(&request),
            )
            .await?;

        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or(LlmError::EmptyResponse)
    }

    async fn make_anthropic_request(&self, prompt: &str) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct AnthropicRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            messages: Vec<Message<'a>>,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: Option<String>,
        }

        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![Message::user(prompt)],
        };

        let url = format!("{}/messages", self.config.base_url);
        let response = self
            .send(
                self.client
                    .post(&url)
                    .header("x-api-key", self.config.api_key.expose_secret())
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&request),
            )
            .await?;

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        body.content
            .into_iter()
            .find_map(|c| c.text)
            .map(|text| text.trim().to_string())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> Message<'a> {
    fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[async_trait]
impl LanguageModel for ApiLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.call_api(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn openai_reply(text: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
    }

    #[test]
    fn test_openai_config() {
        let config = ApiLlmConfig::openai("test-key", "gpt-4o-mini");
        assert_eq!(config.provider, Provider::OpenAi);
        assert!(config.base_url.contains("openai"));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.2);
    }

    #[test]
    fn test_anthropic_config() {
        let config = ApiLlmConfig::anthropic("test-key", "claude-3-haiku-20240307");
        assert_eq!(config.provider, Provider::Anthropic);
        assert!(config.base_url.contains("anthropic"));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("claude".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!(matches!(
            "gemini".parse::<Provider>(),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = LlmSettings::default();
        assert!(matches!(
            ApiLlmConfig::from_settings(&settings),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_from_settings_applies_overrides() {
        let settings = LlmSettings {
            api_key: Some("key".to_string()),
            api_base_url: Some("http://localhost:8080/v1/".to_string()),
            temperature: 0.5,
            max_retries: 0,
            ..Default::default()
        };
        let config = ApiLlmConfig::from_settings(&settings).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_retries, 1);
    }

    #[tokio::test]
    async fn test_openai_completion_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [{ "role": "user", "content": "What is Rust?" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(
                "  A systems language.\n",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let llm = ApiLanguageModel::new(
            ApiLlmConfig::openai("test-key", "gpt-4o-mini").with_base_url(server.uri()),
        )
        .unwrap();

        let text = llm.complete("What is Rust?").await.unwrap();
        assert_eq!(text, "A systems language.");
    }

    #[tokio::test]
    async fn test_anthropic_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "Hello there" }]
            })))
            .mount(&server)
            .await;

        let llm = ApiLanguageModel::new(
            ApiLlmConfig::anthropic("test-key", "claude-3-haiku-20240307")
                .with_base_url(server.uri()),
        )
        .unwrap();

        assert_eq!(llm.complete("Hi").await.unwrap(), "Hello there");
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let llm = ApiLanguageModel::new(
            ApiLlmConfig::openai("k", "m")
                .with_base_url(server.uri())
                .with_max_retries(1),
        )
        .unwrap();

        assert!(matches!(
            llm.complete("x").await,
            Err(LlmError::RateLimitExceeded)
        ));
    }

    #[tokio::test]
    async fn test_server_error_then_success_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("ok")))
            .mount(&server)
            .await;

        let llm = ApiLanguageModel::new(
            ApiLlmConfig::openai("k", "m")
                .with_base_url(server.uri())
                .with_max_retries(2),
        )
        .unwrap();

        assert_eq!(llm.complete("x").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let llm = ApiLanguageModel::new(
            ApiLlmConfig::openai("k", "m")
                .with_base_url(server.uri())
                .with_max_retries(1),
        )
        .unwrap();

        assert!(matches!(
            llm.complete("x").await,
            Err(LlmError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let llm = ApiLanguageModel::new(
            ApiLlmConfig::openai("bad-key", "m")
                .with_base_url(server.uri())
                .with_max_retries(3),
        )
        .unwrap();

        assert!(matches!(
            llm.complete("x").await,
            Err(LlmError::Http { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let llm = ApiLanguageModel::new(
            ApiLlmConfig::openai("k", "m")
                .with_base_url(server.uri())
                .with_max_retries(3),
        )
        .unwrap();

        assert!(matches!(llm.complete("x").await, Err(LlmError::Parse(_))));
    }
}
