//! Stream relay - pipes an upstream completion stream into an outbound channel.
//!
//! One task reads fragments from the provider and pushes them into a
//! `tokio::sync::mpsc` sink that the response collaborator drains. End of
//! stream and mid-stream failure are signalled explicitly with
//! [`RelayEvent::Completed`] and [`RelayEvent::Interrupted`].

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ports::{CompletionError, CompletionStream, TokenUsage};

/// Event delivered to the consumer of a relayed response.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A non-empty piece of the response, in generation order.
    Fragment(String),
    /// The upstream stream finished normally.
    Completed { usage: Option<TokenUsage> },
    /// The upstream stream failed; no further fragments follow.
    Interrupted { reason: String },
}

/// How a relay ended.
#[derive(Debug)]
pub enum RelayOutcome {
    /// Every fragment was relayed.
    Completed {
        text: String,
        usage: Option<TokenUsage>,
    },
    /// The upstream failed after relaying `partial`.
    Interrupted {
        partial: String,
        error: CompletionError,
    },
    /// The consumer dropped its receiver.
    Cancelled { partial: String },
}

impl RelayOutcome {
    /// Text relayed so far, complete or not.
    pub fn text(&self) -> &str {
        match self {
            RelayOutcome::Completed { text, .. } => text,
            RelayOutcome::Interrupted { partial, .. } | RelayOutcome::Cancelled { partial } => {
                partial
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RelayOutcome::Completed { .. })
    }
}

/// Forwards fragments of one response to a sink while accumulating the text.
#[derive(Debug)]
pub struct StreamRelay {
    sink: mpsc::Sender<RelayEvent>,
}

impl StreamRelay {
    /// Creates a relay writing into `sink`.
    pub fn new(sink: mpsc::Sender<RelayEvent>) -> Self {
        Self { sink }
    }

    /// Drains `stream` into the sink.
    ///
    /// Stops as soon as the sink's receiver is dropped; the upstream stream is
    /// dropped with the relay, which releases its connection.
    pub async fn relay(self, mut stream: CompletionStream) -> RelayOutcome {
        let mut text = String::new();
        let mut usage = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.sink.closed() => {
                    tracing::debug!(relayed_bytes = text.len(), "Relay consumer went away");
                    return RelayOutcome::Cancelled { partial: text };
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    // Usage may arrive on a chunk after the finish reason.
                    if chunk.usage.is_some() {
                        usage = chunk.usage;
                    }
                    if chunk.delta.is_empty() {
                        continue;
                    }

                    let delivered = text.len();
                    text.push_str(&chunk.delta);
                    if self.sink.send(RelayEvent::Fragment(chunk.delta)).await.is_err() {
                        text.truncate(delivered);
                        tracing::debug!(relayed_bytes = text.len(), "Relay consumer went away");
                        return RelayOutcome::Cancelled { partial: text };
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!(
                        relayed_bytes = text.len(),
                        error = %error,
                        "Upstream stream failed mid-response"
                    );
                    let _ = self
                        .sink
                        .send(RelayEvent::Interrupted {
                            reason: error.to_string(),
                        })
                        .await;
                    return RelayOutcome::Interrupted {
                        partial: text,
                        error,
                    };
                }
                None => {
                    let _ = self.sink.send(RelayEvent::Completed { usage }).await;
                    return RelayOutcome::Completed { text, usage };
                }
            }
        }
    }
}

/// Runs a relay as its own task.
///
/// Returns the receiving half for the response writer and the handle that
/// resolves to the outcome once the relay ends.
pub fn spawn_relay(
    stream: CompletionStream,
    buffer: usize,
) -> (mpsc::Receiver<RelayEvent>, JoinHandle<RelayOutcome>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let handle = tokio::spawn(StreamRelay::new(tx).relay(stream));
    (rx, handle)
}
