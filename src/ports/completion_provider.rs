//! Completion Provider Port - Interface for the LLM completion API.
//!
//! This port abstracts the single chat-completion provider the relay talks to,
//! so sessions and HTTP handlers can be exercised without network access.
//!
//! # Design
//!
//! - Batch (`complete`) and streaming (`stream_complete`) requests
//! - A cheap read-only call (`list_models`) used to validate the credential
//! - Failures classified as authentication, rate limiting, or provider errors
//! - No retries and no caching: every call is a fresh upstream request

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::domain::conversation::PromptRequest;
use crate::domain::errors::ValidationError;

/// Lazy, finite, non-restartable sequence of response fragments.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, CompletionError>> + Send>>;

/// Port for chat completion provider interactions.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a single completion (non-streaming).
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError>;

    /// Generate a streaming completion.
    ///
    /// Errors returned here happen before any fragment is produced; errors
    /// yielded by the stream happen mid-response.
    async fn stream_complete(&self, request: CompletionRequest) -> Result<CompletionStream, CompletionError>;

    /// Lists the models available to the configured credential.
    ///
    /// Returns the number of models. Succeeds only if the credential is accepted.
    async fn list_models(&self) -> Result<usize, CompletionError>;
}

/// Request for a chat completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Assembled prompt (system, history, user).
    pub prompt: PromptRequest,
    /// Sampling and limit options.
    pub options: CompletionOptions,
    /// Trace ID for log correlation.
    pub trace_id: String,
}

impl CompletionRequest {
    /// Creates a request with default options.
    pub fn new(prompt: PromptRequest, trace_id: impl Into<String>) -> Self {
        Self {
            prompt,
            options: CompletionOptions::default(),
            trace_id: trace_id.into(),
        }
    }

    /// Sets the completion options.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Options recognized by the completion provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    /// Backend model id; the provider default is used when unset.
    pub model: Option<String>,
    /// Hard cap on generated tokens.
    pub max_tokens: Option<u32>,
    /// Sampling randomness in `[0, 2]`.
    pub temperature: Option<f32>,
    /// Upper bound on the upstream call.
    pub timeout: Option<Duration>,
}

impl CompletionOptions {
    /// Lowest accepted temperature.
    pub const MIN_TEMPERATURE: f32 = 0.0;
    /// Highest accepted temperature.
    pub const MAX_TEMPERATURE: f32 = 2.0;

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Checks the option ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(temp) = self.temperature {
            if !(Self::MIN_TEMPERATURE..=Self::MAX_TEMPERATURE).contains(&temp) {
                return Err(ValidationError::out_of_range(
                    "temperature",
                    Self::MIN_TEMPERATURE as f64,
                    Self::MAX_TEMPERATURE as f64,
                    temp as f64,
                ));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(ValidationError::out_of_range("max_tokens", 1.0, u32::MAX as f64, 0.0));
        }
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ValidationError::empty_field("model"));
            }
        }
        Ok(())
    }
}

/// Response from a batch completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content.
    pub content: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// Why the model stopped generating.
    pub finish_reason: FinishReason,
}

/// Token usage attached to a completed response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates new token usage.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response).
    Stop,
    /// Hit max_tokens limit.
    Length,
    /// Content was filtered for safety.
    ContentFilter,
}

impl FinishReason {
    /// Maps the provider's finish reason string; unknown values count as `Stop`.
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

/// Streaming chunk from a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    /// New content in this chunk.
    pub delta: String,
    /// If present, generation is complete.
    pub finish_reason: Option<FinishReason>,
    /// Token usage (only present near the end of the stream).
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    /// Creates a content chunk.
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            finish_reason: None,
            usage: None,
        }
    }

    /// Creates a final chunk with a finish reason.
    pub fn finished(finish_reason: FinishReason) -> Self {
        Self {
            delta: String::new(),
            finish_reason: Some(finish_reason),
            usage: None,
        }
    }

    /// Creates a chunk carrying only usage.
    pub fn usage(usage: TokenUsage) -> Self {
        Self {
            delta: String::new(),
            finish_reason: None,
            usage: Some(usage),
        }
    }

    /// Returns true if this chunk ends generation.
    pub fn is_final(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Completion provider errors.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Credential rejected by the provider (HTTP 401 upstream).
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Provider throttling (HTTP 429 upstream).
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is sensible.
        retry_after_secs: u32,
    },

    /// Any other upstream failure.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderFailure),
}

/// Causes grouped under [`CompletionError::Provider`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderFailure {
    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider answered with an error status or error payload.
    #[error("upstream error {status}: {message}")]
    Upstream {
        /// HTTP status (0 when reported inside a stream).
        status: u16,
        /// Error details.
        message: String,
    },
}

impl CompletionError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Provider(ProviderFailure::Network(message.into()))
    }

    /// Creates a timeout error.
    pub fn timeout(timeout: Duration) -> Self {
        Self::Provider(ProviderFailure::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Provider(ProviderFailure::Parse(message.into()))
    }

    /// Creates an upstream error.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Provider(ProviderFailure::Upstream {
            status,
            message: message.into(),
        })
    }

    /// Returns true if the error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Provider(ProviderFailure::Timeout { .. }))
    }
}
