//! OpenAI Provider - Implementation of CompletionProvider for OpenAI's API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("gpt-4-turbo-preview")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! # Streaming
//!
//! Uses Server-Sent Events (SSE) with `stream_options.include_usage`. Lines
//! are decoded by [`super::sse`] until the `[DONE]` marker is received.
//!
//! Requests are never retried: every failure is classified and returned.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::sse::{decode_stream, OpenAIErrorDetail, OpenAIUsage};
use crate::ports::{
    CompletionError, CompletionProvider, CompletionRequest, CompletionResponse, CompletionStream,
    FinishReason,
};

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Retry hint used when the provider gives none.
const DEFAULT_RETRY_AFTER_SECS: u32 = 30;

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Default model (e.g., "gpt-4-turbo-preview").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Default request timeout.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4-turbo-preview".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True when a non-blank API key is configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new OpenAI provider with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url)
    }

    fn timeout_for(&self, request: &CompletionRequest) -> Duration {
        request.options.timeout.unwrap_or(self.config.timeout)
    }

    /// Converts our request to OpenAI's format.
    fn to_openai_request(&self, request: &CompletionRequest, stream: bool) -> OpenAIRequest {
        let messages = request
            .prompt
            .turns()
            .iter()
            .map(|turn| OpenAIMessage {
                role: turn.role().as_str().to_string(),
                content: turn.content().to_string(),
            })
            .collect();

        OpenAIRequest {
            model: request
                .options
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
            stream: Some(stream),
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, CompletionError> {
        if !self.config.has_api_key() {
            return Err(CompletionError::AuthenticationFailed);
        }
        Ok(builder.bearer_auth(self.config.api_key()))
    }

    fn map_send_error(e: reqwest::Error, timeout: Duration) -> CompletionError {
        if e.is_timeout() {
            CompletionError::timeout(timeout)
        } else if e.is_connect() {
            CompletionError::network(format!("Connection failed: {}", e))
        } else {
            CompletionError::network(e.to_string())
        }
    }

    /// Classifies a non-success status.
    async fn handle_response_status(response: Response) -> Result<Response, CompletionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let header_retry = Self::retry_after_header(response.headers());
        let error_body = response.text().await.unwrap_or_default();
        let message = Self::error_message(&error_body);

        tracing::warn!(status = status.as_u16(), error = %message, "OpenAI request rejected");

        match status.as_u16() {
            401 => Err(CompletionError::AuthenticationFailed),
            429 => Err(CompletionError::rate_limited(
                header_retry.unwrap_or_else(|| Self::parse_retry_after(&message)),
            )),
            code => Err(CompletionError::upstream(code, message)),
        }
    }

    /// Extracts `error.message` from an error body, falling back to the raw body.
    fn error_message(body: &str) -> String {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: OpenAIErrorDetail,
        }

        serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| body.trim().to_string())
    }

    fn retry_after_header(headers: &HeaderMap) -> Option<u32> {
        headers
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u32>()
            .ok()
    }

    /// Parses "try again in 20s" / "try again in 1.5s" / "try again in 500ms".
    fn parse_retry_after(message: &str) -> u32 {
        const MARKER: &str = "try again in ";

        let Some(idx) = message.find(MARKER) else {
            return DEFAULT_RETRY_AFTER_SECS;
        };
        let rest = &message[idx + MARKER.len()..];
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());

        match rest[..num_end].parse::<f64>() {
            Ok(value) if rest[num_end..].starts_with("ms") => ((value / 1000.0).ceil() as u32).max(1),
            Ok(value) => (value.ceil() as u32).max(1),
            Err(_) => DEFAULT_RETRY_AFTER_SECS,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        let timeout = self.timeout_for(&request);
        let body = self.to_openai_request(&request, false);

        tracing::debug!(trace_id = %request.trace_id, model = %body.model, "OpenAI completion request");

        let response = self
            .authorized(self.client.post(self.completions_url()))?
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;
        let response = Self::handle_response_status(response).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::timeout(timeout)
            } else {
                CompletionError::parse(format!("Failed to parse response: {}", e))
            }
        })?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::parse("No choices in response"))?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: openai_response.usage.map(Into::into).unwrap_or_default(),
            model: openai_response.model,
            finish_reason: FinishReason::from_provider(choice.finish_reason.as_deref()),
        })
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<CompletionStream, CompletionError> {
        let timeout = self.timeout_for(&request);
        let body = self.to_openai_request(&request, true);

        tracing::debug!(trace_id = %request.trace_id, model = %body.model, "OpenAI streaming request");

        // Only the response head is bounded here; the body is bounded per read.
        let send = self
            .authorized(self.client.post(self.completions_url()))?
            .json(&body)
            .send();
        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| CompletionError::timeout(timeout))?
            .map_err(|e| Self::map_send_error(e, timeout))?;
        let response = Self::handle_response_status(response).await?;

        Ok(decode_stream(response.bytes_stream(), timeout))
    }

    async fn list_models(&self) -> Result<usize, CompletionError> {
        let timeout = self.config.timeout;

        let response = self
            .authorized(self.client.get(self.models_url()))?
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;
        let response = Self::handle_response_status(response).await?;

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| CompletionError::parse(format!("Failed to parse model list: {}", e)))?;

        Ok(models.data.len())
    }
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{build_prompt, Turn};
    use crate::ports::{CompletionOptions, ProviderFailure, TokenUsage};
    use axum::http::{HeaderMap as AxumHeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};

    fn test_request() -> CompletionRequest {
        let history = vec![Turn::user("Hi"), Turn::assistant("Hello!")];
        CompletionRequest::new(build_prompt("system", &history, "What is KYC?").unwrap(), "trace-1")
    }

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider(base_url: &str) -> OpenAIProvider {
        OpenAIProvider::new(
            OpenAIConfig::new("sk-test")
                .with_base_url(base_url)
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap()
    }

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::new("test-key")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com/")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.api_key(), "test-key");
        assert!(config.has_api_key());
        assert!(!OpenAIConfig::new("  ").has_api_key());
    }

    #[test]
    fn config_debug_redacts_api_key() {
        let debug = format!("{:?}", OpenAIConfig::new("sk-very-secret"));
        assert!(!debug.contains("sk-very-secret"));
    }

    #[test]
    fn request_mapping_preserves_turn_order_and_options() {
        let provider = provider("http://localhost");
        let request = test_request().with_options(
            CompletionOptions::default()
                .with_model("gpt-4o")
                .with_max_tokens(1000)
                .with_temperature(0.7),
        );

        let body = provider.to_openai_request(&request, true);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["stream"], true);
        assert_eq!(json["stream_options"]["include_usage"], true);
        let roles: Vec<&str> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn request_mapping_falls_back_to_config_model() {
        let provider = provider("http://localhost");
        let body = provider.to_openai_request(&test_request(), false);

        assert_eq!(body.model, "gpt-4-turbo-preview");
        assert!(body.stream_options.is_none());
        assert!(body.max_tokens.is_none());
    }

    #[test]
    fn parse_retry_after_from_message() {
        assert_eq!(
            OpenAIProvider::parse_retry_after("Rate limit reached. Please try again in 20s."),
            20
        );
        assert_eq!(OpenAIProvider::parse_retry_after("Please try again in 1.5s"), 2);
        assert_eq!(OpenAIProvider::parse_retry_after("Please try again in 500ms"), 1);
    }

    #[test]
    fn parse_retry_after_default() {
        assert_eq!(OpenAIProvider::parse_retry_after("Something went wrong"), 30);
    }

    #[test]
    fn error_message_prefers_error_object() {
        assert_eq!(
            OpenAIProvider::error_message(r#"{"error":{"message":"Incorrect API key provided"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(OpenAIProvider::error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("").with_base_url("http://127.0.0.1:9")).unwrap();

        assert!(matches!(
            provider.list_models().await,
            Err(CompletionError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn complete_parses_batch_response() {
        let seen_auth = Arc::new(Mutex::new(String::new()));
        let seen = seen_auth.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move |headers: AxumHeaderMap| {
                let seen = seen.clone();
                async move {
                    *seen.lock().unwrap() = headers["authorization"].to_str().unwrap().to_string();
                    Json(serde_json::json!({
                        "model": "gpt-4-turbo-preview",
                        "choices": [{"message": {"role": "assistant", "content": "KYC means..."}, "finish_reason": "stop"}],
                        "usage": {"prompt_tokens": 5, "completion_tokens": 10, "total_tokens": 15}
                    }))
                }
            }),
        );
        let base = serve(router).await;

        let response = provider(&base).complete(test_request()).await.unwrap();

        assert_eq!(response.content, "KYC means...");
        assert_eq!(response.usage, TokenUsage::new(5, 10));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(*seen_auth.lock().unwrap(), "Bearer sk-test");
    }

    #[tokio::test]
    async fn classifies_error_statuses() {
        let router = Router::new()
            .route(
                "/chat/completions",
                post(|| async {
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        Json(serde_json::json!({"error": {"message": "Please try again in 7s."}})),
                    )
                }),
            )
            .route(
                "/models",
                get(|| async {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(serde_json::json!({"error": {"message": "Incorrect API key"}})),
                    )
                }),
            );
        let provider = provider(&serve(router).await);

        assert!(matches!(
            provider.complete(test_request()).await,
            Err(CompletionError::RateLimited { retry_after_secs: 7 })
        ));
        assert!(matches!(
            provider.list_models().await,
            Err(CompletionError::AuthenticationFailed)
        ));
    }

    fn slow_completions() -> Router {
        Router::new().route(
            "/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(serde_json::json!({"choices": []}))
            }),
        )
    }

    fn short_timeout_request() -> CompletionRequest {
        test_request().with_options(CompletionOptions::default().with_timeout(Duration::from_millis(200)))
    }

    #[tokio::test]
    async fn batch_request_is_bounded_end_to_end() {
        let provider = provider(&serve(slow_completions()).await);

        let started = std::time::Instant::now();
        let result = provider.complete(short_timeout_request()).await;

        assert!(matches!(
            result,
            Err(CompletionError::Provider(ProviderFailure::Timeout { timeout_ms: 200 }))
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn stream_request_is_bounded_until_response_head() {
        let provider = provider(&serve(slow_completions()).await);

        let started = std::time::Instant::now();
        let result = provider.stream_complete(short_timeout_request()).await;

        match result {
            Err(err) => {
                assert!(err.is_timeout());
                assert_eq!(err.to_string(), "provider error: request timed out after 200ms");
            }
            Ok(_) => panic!("expected the response head to time out"),
        }
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn server_errors_are_upstream_failures() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded").into_response() }),
        );
        let provider = provider(&serve(router).await);

        match provider.stream_complete(test_request()).await {
            Err(CompletionError::Provider(ProviderFailure::Upstream { status, message })) => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected upstream failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn stream_complete_decodes_sse_body() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"KY\"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"C \"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"means...\"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":3,\"total_tokens\":8}}\n\n",
            "data: [DONE]\n\n",
        );
        let router = Router::new().route(
            "/chat/completions",
            post(move || async move { ([("content-type", "text/event-stream")], body) }),
        );
        let provider = provider(&serve(router).await);

        let chunks: Vec<_> = provider
            .stream_complete(test_request())
            .await
            .unwrap()
            .collect()
            .await;
        let chunks: Vec<_> = chunks.into_iter().map(Result::unwrap).collect();

        let text: String = chunks.iter().map(|c| c.delta.as_str()).collect();
        assert_eq!(text, "KYC means...");
        assert_eq!(chunks.last().unwrap().usage, Some(TokenUsage::new(5, 3)));
    }

    #[tokio::test]
    async fn list_models_counts_entries() {
        let router = Router::new().route(
            "/models",
            get(|| async {
                Json(serde_json::json!({"object": "list", "data": [{"id": "gpt-4"}, {"id": "gpt-4o"}]}))
            }),
        );

        assert_eq!(provider(&serve(router).await).list_models().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_failure() {
        let provider = provider("http://127.0.0.1:9");

        assert!(matches!(
            provider.complete(test_request()).await,
            Err(CompletionError::Provider(ProviderFailure::Network(_)))
        ));
    }
}
