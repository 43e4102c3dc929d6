//! RelayMessage handler - stateless request/response orchestration.
//!
//! Used by the HTTP endpoints. Each request carries its own history, so the
//! handler holds only immutable, shareable state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::application::relay::{spawn_relay, RelayEvent, RelayOutcome};
use crate::application::session::BatchReply;
use crate::domain::conversation::{HistoryBuffer, PromptAssembler, Turn, DEFAULT_HISTORY_LIMIT};
use crate::ports::{CompletionOptions, CompletionProvider, CompletionRequest};

/// Default capacity of the outbound fragment channel.
pub const DEFAULT_RELAY_BUFFER: usize = 32;

/// Command carrying one user message and the client-held history.
#[derive(Debug, Clone, Default)]
pub struct RelayMessageCommand {
    pub message: String,
    pub history: Vec<Turn>,
}

impl RelayMessageCommand {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

/// A running relay: fragments to drain plus the eventual outcome.
#[derive(Debug)]
pub struct RelayStream {
    pub trace_id: String,
    pub events: mpsc::Receiver<RelayEvent>,
    pub outcome: JoinHandle<RelayOutcome>,
}

/// Handler for relaying one message to the completion provider.
#[derive(Clone)]
pub struct RelayMessageHandler {
    provider: Arc<dyn CompletionProvider>,
    assembler: PromptAssembler,
    options: CompletionOptions,
    history_limit: usize,
    relay_buffer: usize,
}

impl RelayMessageHandler {
    /// Creates a handler with default options and limits.
    pub fn new(provider: Arc<dyn CompletionProvider>, assembler: PromptAssembler) -> Self {
        Self {
            provider,
            assembler,
            options: CompletionOptions::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            relay_buffer: DEFAULT_RELAY_BUFFER,
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_relay_buffer(mut self, buffer: usize) -> Self {
        self.relay_buffer = buffer;
        self
    }

    /// The provider, for credential checks.
    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    /// Validates the command and assembles the upstream request.
    pub fn prepare(&self, cmd: RelayMessageCommand) -> Result<CompletionRequest, ChatError> {
        self.options.validate()?;

        let history = HistoryBuffer::from_turns(cmd.history, self.history_limit);
        let prompt = self.assembler.build(&history.snapshot(), &cmd.message)?;

        Ok(CompletionRequest::new(prompt, Uuid::new_v4().to_string())
            .with_options(self.options.clone()))
    }

    /// Relays one message and waits for the whole response.
    pub async fn complete(&self, cmd: RelayMessageCommand) -> Result<BatchReply, ChatError> {
        let request = self.prepare(cmd)?;
        let trace_id = request.trace_id.clone();
        let message_len = request.prompt.user().content().len();
        let history_len = request.prompt.history().len();

        let response = self.provider.complete(request).await.map_err(|e| {
            tracing::error!(trace_id = %trace_id, error = %e, "Completion request failed");
            ChatError::from(e)
        })?;

        tracing::info!(
            trace_id = %trace_id,
            message_len = message_len,
            history_len = history_len,
            response_len = response.content.len(),
            total_tokens = response.usage.total_tokens,
            "Completion relayed"
        );
        tracing::debug!(trace_id = %trace_id, response = %response.content, "Completion content");

        Ok(BatchReply {
            text: response.content,
            usage: response.usage,
        })
    }

    /// Starts relaying one message.
    ///
    /// The upstream request is issued before returning, so failures that
    /// happen before any output surface here as errors.
    pub async fn stream(&self, cmd: RelayMessageCommand) -> Result<RelayStream, ChatError> {
        let request = self.prepare(cmd)?;
        let trace_id = request.trace_id.clone();
        let message_len = request.prompt.user().content().len();
        let history_len = request.prompt.history().len();

        let stream = self.provider.stream_complete(request).await.map_err(|e| {
            tracing::error!(trace_id = %trace_id, error = %e, "Stream request failed");
            ChatError::from(e)
        })?;

        let (events, relay) = spawn_relay(stream, self.relay_buffer);

        let log_trace_id = trace_id.clone();
        let outcome = tokio::spawn(async move {
            let outcome = relay.await.unwrap_or_else(|join_err| {
                tracing::error!(trace_id = %log_trace_id, error = %join_err, "Relay task failed");
                RelayOutcome::Cancelled {
                    partial: String::new(),
                }
            });
            log_outcome(&log_trace_id, message_len, history_len, &outcome);
            outcome
        });

        Ok(RelayStream {
            trace_id,
            events,
            outcome,
        })
    }
}

fn log_outcome(trace_id: &str, message_len: usize, history_len: usize, outcome: &RelayOutcome) {
    let kind = match outcome {
        RelayOutcome::Completed { .. } => "completed",
        RelayOutcome::Interrupted { .. } => "interrupted",
        RelayOutcome::Cancelled { .. } => "cancelled",
    };

    tracing::info!(
        trace_id = %trace_id,
        message_len = message_len,
        history_len = history_len,
        response_len = outcome.text().len(),
        outcome = kind,
        "Stream relayed"
    );
    tracing::debug!(trace_id = %trace_id, response = %outcome.text(), "Stream content");
}

impl std::fmt::Debug for RelayMessageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayMessageHandler")
            .field("options", &self.options)
            .field("history_limit", &self.history_limit)
            .field("relay_buffer", &self.relay_buffer)
            .finish_non_exhaustive()
    }
}
