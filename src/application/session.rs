//! Chat session - one conversation owned by one user-facing session.
//!
//! The session owns its [`HistoryBuffer`] exclusively. A `send` takes
//! `&mut self`, so at most one request per session is in flight.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::connectivity::ConnectivityMonitor;
use crate::application::errors::ChatError;
use crate::application::relay::{RelayEvent, RelayOutcome, StreamRelay};
use crate::domain::connectivity::ConnectivityStatus;
use crate::domain::conversation::{HistoryBuffer, PromptAssembler, Turn, DEFAULT_HISTORY_LIMIT};
use crate::ports::{CompletionOptions, CompletionProvider, CompletionRequest, TokenUsage};

/// How the response should be delivered.
#[derive(Debug)]
pub enum SendMode {
    /// Wait for the whole response.
    Batch,
    /// Push fragments into the sink as they are generated.
    Streaming(mpsc::Sender<RelayEvent>),
}

/// A complete batch response.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReply {
    pub text: String,
    pub usage: TokenUsage,
}

/// A streamed response after it finished.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedReply {
    pub text: String,
    /// Present when the provider reported usage on the stream.
    pub usage: Option<TokenUsage>,
}

/// Result of [`ChatSession::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Batch(BatchReply),
    Streamed(StreamedReply),
}

impl SendOutcome {
    /// Full assistant text.
    pub fn text(&self) -> &str {
        match self {
            SendOutcome::Batch(reply) => &reply.text,
            SendOutcome::Streamed(reply) => &reply.text,
        }
    }
}

/// Orchestrates prompt assembly, the completion call, relaying and history.
pub struct ChatSession {
    id: Uuid,
    provider: Arc<dyn CompletionProvider>,
    assembler: PromptAssembler,
    options: CompletionOptions,
    history: HistoryBuffer,
    status: ConnectivityStatus,
}

impl ChatSession {
    /// Creates a session with an empty history of the default capacity.
    pub fn new(provider: Arc<dyn CompletionProvider>, assembler: PromptAssembler) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            assembler,
            options: CompletionOptions::default(),
            history: HistoryBuffer::new(DEFAULT_HISTORY_LIMIT),
            status: ConnectivityStatus::default(),
        }
    }

    /// Sets the options sent with every request.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the history with an empty buffer of the given capacity.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = HistoryBuffer::new(limit);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.status
    }

    /// Overrides the connectivity status.
    pub fn set_status(&mut self, status: ConnectivityStatus) {
        self.status = status;
    }

    /// Re-runs the connectivity probes and stores the derived status.
    pub async fn refresh_connectivity(&mut self, monitor: &ConnectivityMonitor) -> ConnectivityStatus {
        self.status = monitor.check().await;
        self.status
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        tracing::debug!(session_id = %self.id, "History cleared");
    }

    /// Sends one user message.
    ///
    /// On success the user turn and the assistant turn are appended to the
    /// history. A failure before any output leaves the history untouched.
    ///
    /// # Errors
    ///
    /// - `NotReady` unless the status is `Connected`
    /// - `InvalidInput` for a blank message
    /// - `Auth`, `RateLimited` or `Provider` when the upstream call fails
    /// - `StreamInterrupted` when a stream fails after partial output; the
    ///   partial text is recorded as an interrupted assistant turn
    /// - `Cancelled` when the streaming sink is dropped
    pub async fn send(&mut self, message: &str, mode: SendMode) -> Result<SendOutcome, ChatError> {
        match mode {
            SendMode::Batch => self.send_batch(message).await.map(SendOutcome::Batch),
            SendMode::Streaming(sink) => self
                .send_streaming(message, sink)
                .await
                .map(SendOutcome::Streamed),
        }
    }

    /// Sends one user message and waits for the whole response.
    pub async fn send_batch(&mut self, message: &str) -> Result<BatchReply, ChatError> {
        let (request, user_turn) = self.prepare(message)?;

        let response = self.provider.complete(request).await.map_err(|e| {
            tracing::warn!(session_id = %self.id, error = %e, "Completion failed");
            ChatError::from(e)
        })?;

        self.record(user_turn, Turn::assistant(response.content.clone()));
        tracing::info!(
            session_id = %self.id,
            response_len = response.content.len(),
            total_tokens = response.usage.total_tokens,
            "Batch reply recorded"
        );

        Ok(BatchReply {
            text: response.content,
            usage: response.usage,
        })
    }

    /// Sends one user message and relays the response into `sink`.
    pub async fn send_streaming(
        &mut self,
        message: &str,
        sink: mpsc::Sender<RelayEvent>,
    ) -> Result<StreamedReply, ChatError> {
        let (request, user_turn) = self.prepare(message)?;

        let stream = self.provider.stream_complete(request).await.map_err(|e| {
            tracing::warn!(session_id = %self.id, error = %e, "Stream request failed");
            ChatError::from(e)
        })?;

        match StreamRelay::new(sink).relay(stream).await {
            RelayOutcome::Completed { text, usage } => {
                self.record(user_turn, Turn::assistant(text.clone()));
                tracing::info!(session_id = %self.id, response_len = text.len(), "Streamed reply recorded");
                Ok(StreamedReply { text, usage })
            }
            RelayOutcome::Interrupted { partial, error } if partial.is_empty() => Err(error.into()),
            RelayOutcome::Interrupted { partial, error } => {
                self.record(user_turn, Turn::interrupted_assistant(partial.clone()));
                tracing::warn!(
                    session_id = %self.id,
                    partial_len = partial.len(),
                    "Recorded interrupted reply"
                );
                Err(ChatError::StreamInterrupted {
                    partial,
                    source: error,
                })
            }
            RelayOutcome::Cancelled { partial } => {
                tracing::info!(session_id = %self.id, partial_len = partial.len(), "Send cancelled");
                Err(ChatError::Cancelled)
            }
        }
    }

    fn prepare(&self, message: &str) -> Result<(CompletionRequest, Turn), ChatError> {
        if !self.status.is_ready() {
            return Err(ChatError::NotReady {
                status: self.status,
            });
        }

        self.options.validate()?;
        let prompt = self.assembler.build(&self.history.snapshot(), message)?;
        let user_turn = prompt.user().clone();

        tracing::debug!(
            session_id = %self.id,
            history_len = self.history.len(),
            message = %user_turn.content(),
            "Sending message"
        );

        let request = CompletionRequest::new(prompt, Uuid::new_v4().to_string())
            .with_options(self.options.clone());
        Ok((request, user_turn))
    }

    fn record(&mut self, user: Turn, assistant: Turn) {
        self.history.append(user);
        self.history.append(assistant);
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}
