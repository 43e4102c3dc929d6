//! Server-Sent Events decoding for OpenAI streaming completions.
//!
//! Network reads do not line up with SSE lines: a `data:` line may be split
//! across reads, and so may a multi-byte UTF-8 sequence inside it. The
//! decoder buffers raw bytes and only decodes complete lines.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use crate::ports::{CompletionError, CompletionStream, FinishReason, StreamChunk, TokenUsage};

type Decoded = Result<StreamChunk, CompletionError>;

/// Longest unterminated line the decoder buffers before giving up.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental decoder for `data:` lines of a chat completion stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` or an error was decoded. Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Buffers `bytes` and decodes every complete line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Decoded> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }

        self.buffer.extend_from_slice(bytes);
        while !self.done {
            let Some(end) = self.buffer.iter().position(|b| *b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.decode_line(&line[..end], &mut out);
        }

        if !self.done && self.buffer.len() > MAX_LINE_BYTES {
            let len = self.buffer.len();
            self.buffer = Vec::new();
            self.fail(
                &mut out,
                CompletionError::parse(format!("SSE line exceeds {} bytes ({} buffered)", MAX_LINE_BYTES, len)),
            );
        }
        out
    }

    /// Decodes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<Decoded> {
        let mut out = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut out);
        }
        self.done = true;
        out
    }

    fn decode_line(&mut self, line: &[u8], out: &mut Vec<Decoded>) {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(e) => {
                self.fail(out, CompletionError::parse(format!("Invalid UTF-8 in SSE line: {}", e)));
                return;
            }
        };

        // Comments, blank separators, and `event:`/`id:` fields carry no content.
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);
        if data.trim().is_empty() {
            return;
        }
        if data == "[DONE]" {
            self.done = true;
            return;
        }

        let chunk = match serde_json::from_str::<StreamResponseChunk>(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.fail(out, CompletionError::parse(format!("Failed to parse SSE chunk: {}", e)));
                return;
            }
        };

        if let Some(error) = chunk.error {
            self.fail(out, CompletionError::upstream(0, error.message));
            return;
        }

        if let Some(choice) = chunk.choices.into_iter().next() {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                out.push(Ok(StreamChunk::content(content)));
            }
            if let Some(reason) = choice.finish_reason {
                out.push(Ok(StreamChunk::finished(FinishReason::from_provider(Some(&reason)))));
            }
        }

        // With `include_usage` the usage arrives on its own chunk with no choices.
        if let Some(usage) = chunk.usage {
            out.push(Ok(StreamChunk::usage(usage.into())));
        }
    }

    fn fail(&mut self, out: &mut Vec<Decoded>, error: CompletionError) {
        self.done = true;
        out.push(Err(error));
    }
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Decoded>,
    idle_timeout: Duration,
    finished: bool,
}

/// Turns a response body into a [`CompletionStream`].
///
/// Each read from `bytes` is bounded by `idle_timeout`; a stalled body ends
/// the stream with a timeout error. The body is dropped after `[DONE]`.
pub fn decode_stream<S, B, E>(bytes: S, idle_timeout: Duration) -> CompletionStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        idle_timeout,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match tokio::time::timeout(state.idle_timeout, state.bytes.next()).await {
                Ok(Some(Ok(bytes))) => {
                    let decoded = state.decoder.feed(bytes.as_ref());
                    state.pending.extend(decoded);
                    state.finished = state.decoder.is_done();
                }
                Ok(Some(Err(e))) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(CompletionError::network(format!("Stream error: {}", e))));
                }
                Ok(None) => {
                    state.finished = true;
                    let decoded = state.decoder.finish();
                    state.pending.extend(decoded);
                }
                Err(_) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(CompletionError::timeout(state.idle_timeout)));
                }
            }
        }
    })
    .boxed()
}

// ----- OpenAI stream types -----

#[derive(Debug, Deserialize)]
struct StreamResponseChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<OpenAIUsage>,
    error: Option<OpenAIErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Token counts as reported by OpenAI.
#[derive(Debug, Deserialize)]
pub(super) struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl From<OpenAIUsage> for TokenUsage {
    fn from(usage: OpenAIUsage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

/// The `error` object OpenAI returns in error bodies and stream events.
#[derive(Debug, Deserialize)]
pub(super) struct OpenAIErrorDetail {
    #[serde(default)]
    pub message: String,
}
