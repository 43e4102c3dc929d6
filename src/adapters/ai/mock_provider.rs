//! Mock Completion Provider for testing.
//!
//! Provides a scripted implementation of the `CompletionProvider` port so
//! sessions, relays and HTTP handlers can be tested without calling OpenAI.
//!
//! # Features
//!
//! - Pre-configured batch responses, consumed in order
//! - Fragment scripts for streaming, optionally failing mid-stream
//! - Error injection before any output
//! - Model listing results for credential checks
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockCompletionProvider::new()
//!     .with_stream(["KY", "C ", "means..."])
//!     .with_delay(Duration::from_millis(10));
//!
//! let stream = provider.stream_complete(request).await?;
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    CompletionError, CompletionProvider, CompletionRequest, CompletionResponse, CompletionStream,
    FinishReason, StreamChunk, TokenUsage,
};

/// Mock completion provider for testing.
#[derive(Debug, Clone)]
pub struct MockCompletionProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Result of `list_models`.
    models: Result<usize, MockError>,
    /// Model name reported on batch responses.
    model: String,
    /// Simulated latency per request and per streamed fragment.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A successful completion. Streamed word by word.
    Success {
        content: String,
        usage: TokenUsage,
        finish_reason: FinishReason,
    },
    /// An exact fragment script, optionally ending in a mid-stream failure.
    Stream {
        fragments: Vec<String>,
        then: Option<MockError>,
    },
    /// Fail before producing any output.
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Simulate a rejected credential.
    AuthenticationFailed,
    /// Simulate rate limiting.
    RateLimited { retry_after_secs: u32 },
    /// Simulate network error.
    Network { message: String },
    /// Simulate timeout.
    Timeout { timeout_secs: u64 },
    /// Simulate an upstream error status.
    Upstream { status: u16, message: String },
}

impl From<MockError> for CompletionError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::AuthenticationFailed => CompletionError::AuthenticationFailed,
            MockError::RateLimited { retry_after_secs } => {
                CompletionError::rate_limited(retry_after_secs)
            }
            MockError::Network { message } => CompletionError::network(message),
            MockError::Timeout { timeout_secs } => {
                CompletionError::timeout(Duration::from_secs(timeout_secs))
            }
            MockError::Upstream { status, message } => CompletionError::upstream(status, message),
        }
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletionProvider {
    /// Creates a new mock provider with default settings.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            models: Ok(3),
            model: "mock-model-1".to_string(),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.with_response_full(content, TokenUsage::new(5, 10), FinishReason::Stop)
    }

    /// Adds a successful response with full configuration.
    pub fn with_response_full(
        self,
        content: impl Into<String>,
        usage: TokenUsage,
        finish_reason: FinishReason,
    ) -> Self {
        self.push(MockResponse::Success {
            content: content.into(),
            usage,
            finish_reason,
        })
    }

    /// Adds a stream that yields exactly `fragments` and then ends.
    pub fn with_stream<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::Stream {
            fragments: fragments.into_iter().map(Into::into).collect(),
            then: None,
        })
    }

    /// Adds a stream that yields `fragments` and then fails with `error`.
    pub fn with_interrupted_stream<I, S>(self, fragments: I, error: MockError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::Stream {
            fragments: fragments.into_iter().map(Into::into).collect(),
            then: Some(error),
        })
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: MockError) -> Self {
        self.push(MockResponse::Error(error))
    }

    /// Sets the number of models reported by `list_models`.
    pub fn with_models(mut self, count: usize) -> Self {
        self.models = Ok(count);
        self
    }

    /// Makes `list_models` fail.
    pub fn with_model_error(mut self, error: MockError) -> Self {
        self.models = Err(error);
        self
    }

    /// Sets simulated latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of completion calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    /// Clears the call history.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn push(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    async fn record(&self, request: CompletionRequest) {
        lock(&self.calls).push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    /// Gets the next response or a default.
    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success {
                content: "Mock response".to_string(),
                usage: TokenUsage::new(5, 10),
                finish_reason: FinishReason::Stop,
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        self.record(request).await;

        match self.next_response() {
            MockResponse::Success {
                content,
                usage,
                finish_reason,
            } => Ok(CompletionResponse {
                content,
                usage,
                model: self.model.clone(),
                finish_reason,
            }),
            MockResponse::Stream { fragments, then } => match then {
                Some(err) => Err(err.into()),
                None => {
                    let content = fragments.concat();
                    Ok(CompletionResponse {
                        usage: TokenUsage::new(5, content.split_whitespace().count() as u32),
                        content,
                        model: self.model.clone(),
                        finish_reason: FinishReason::Stop,
                    })
                }
            },
            MockResponse::Error(err) => Err(err.into()),
        }
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<CompletionStream, CompletionError> {
        self.record(request).await;
        let delay = self.delay;

        let chunks: Vec<Result<StreamChunk, CompletionError>> = match self.next_response() {
            MockResponse::Success {
                content,
                usage,
                finish_reason,
            } => content
                .split_inclusive(' ')
                .map(|word| Ok(StreamChunk::content(word)))
                .chain([
                    Ok(StreamChunk::finished(finish_reason)),
                    Ok(StreamChunk::usage(usage)),
                ])
                .collect(),
            MockResponse::Stream { fragments, then } => {
                let tail = match then {
                    Some(err) => Err(err.into()),
                    None => Ok(StreamChunk::finished(FinishReason::Stop)),
                };
                fragments
                    .into_iter()
                    .map(|fragment| Ok(StreamChunk::content(fragment)))
                    .chain(std::iter::once(tail))
                    .collect()
            }
            MockResponse::Error(err) => return Err(err.into()),
        };

        let stream = stream::iter(chunks).then(move |chunk| async move {
            if !delay.is_zero() {
                sleep(delay / 10).await;
            }
            chunk
        });
        Ok(stream.boxed())
    }

    async fn list_models(&self) -> Result<usize, CompletionError> {
        self.models.clone().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::build_prompt;

    fn test_request() -> CompletionRequest {
        CompletionRequest::new(build_prompt("system", &[], "Hello").unwrap(), "trace-123")
    }

    async fn collect(stream: CompletionStream) -> Vec<Result<StreamChunk, CompletionError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn mock_provider_returns_configured_response() {
        let provider = MockCompletionProvider::new().with_response("Hello from mock!");

        let response = provider.complete(test_request()).await.unwrap();

        assert_eq!(response.content, "Hello from mock!");
        assert_eq!(response.model, "mock-model-1");
        assert_eq!(response.usage, TokenUsage::new(5, 10));
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn mock_provider_returns_responses_in_order() {
        let provider = MockCompletionProvider::new()
            .with_response("First")
            .with_response("Second");

        assert_eq!(provider.complete(test_request()).await.unwrap().content, "First");
        assert_eq!(provider.complete(test_request()).await.unwrap().content, "Second");
        assert_eq!(provider.complete(test_request()).await.unwrap().content, "Mock response");
    }

    #[tokio::test]
    async fn mock_provider_returns_configured_error() {
        let provider =
            MockCompletionProvider::new().with_error(MockError::RateLimited { retry_after_secs: 60 });

        let result = provider.complete(test_request()).await;

        assert!(matches!(
            result,
            Err(CompletionError::RateLimited { retry_after_secs: 60 })
        ));
    }

    #[tokio::test]
    async fn mock_provider_tracks_calls() {
        let provider = MockCompletionProvider::new();
        assert_eq!(provider.call_count(), 0);

        provider.complete(test_request()).await.unwrap();
        let _ = provider.stream_complete(test_request()).await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.get_calls()[0].trace_id, "trace-123");

        provider.clear_calls();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn success_streams_words_then_finish_and_usage() {
        let provider = MockCompletionProvider::new().with_response("KYC means know");

        let chunks = collect(provider.stream_complete(test_request()).await.unwrap()).await;
        let chunks: Vec<StreamChunk> = chunks.into_iter().map(Result::unwrap).collect();

        let text: String = chunks.iter().map(|c| c.delta.as_str()).collect();
        assert_eq!(text, "KYC means know");
        assert!(chunks[chunks.len() - 2].is_final());
        assert_eq!(chunks.last().unwrap().usage, Some(TokenUsage::new(5, 10)));
    }

    #[tokio::test]
    async fn stream_script_yields_exact_fragments() {
        let provider = MockCompletionProvider::new().with_stream(["KY", "C ", "means..."]);

        let chunks = collect(provider.stream_complete(test_request()).await.unwrap()).await;
        let deltas: Vec<String> = chunks
            .into_iter()
            .map(|c| c.unwrap().delta)
            .filter(|d| !d.is_empty())
            .collect();

        assert_eq!(deltas, vec!["KY", "C ", "means..."]);
    }

    #[tokio::test]
    async fn interrupted_stream_ends_with_error() {
        let provider = MockCompletionProvider::new().with_interrupted_stream(
            ["KY"],
            MockError::Network {
                message: "reset".to_string(),
            },
        );

        let chunks = collect(provider.stream_complete(test_request()).await.unwrap()).await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "KY");
        assert!(chunks[1].is_err());
    }

    #[tokio::test]
    async fn stream_error_fails_before_output() {
        let provider = MockCompletionProvider::new().with_error(MockError::AuthenticationFailed);

        let result = provider.stream_complete(test_request()).await;

        assert!(matches!(result, Err(CompletionError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn list_models_reports_configuration() {
        let provider = MockCompletionProvider::new().with_models(42);
        assert_eq!(provider.list_models().await.unwrap(), 42);

        let provider =
            MockCompletionProvider::new().with_model_error(MockError::AuthenticationFailed);
        assert!(matches!(
            provider.list_models().await,
            Err(CompletionError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn mock_error_converts_to_completion_error() {
        let err: CompletionError = MockError::Timeout { timeout_secs: 30 }.into();
        assert!(err.is_timeout());

        let err: CompletionError = MockError::Upstream {
            status: 503,
            message: "down".to_string(),
        }
        .into();
        assert!(matches!(err, CompletionError::Provider(_)));
    }
}
