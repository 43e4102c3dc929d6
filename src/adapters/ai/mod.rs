//! Completion Provider Adapters.
//!
//! Implementations of the CompletionProvider port.
//!
//! ## Available Adapters
//!
//! - `MockCompletionProvider` - Scripted mock for testing
//! - `OpenAIProvider` - OpenAI chat completions (batch and SSE streaming)

mod mock_provider;
mod openai_provider;
mod sse;

pub use mock_provider::{MockCompletionProvider, MockError, MockResponse};
pub use openai_provider::{OpenAIConfig, OpenAIProvider, DEFAULT_BASE_URL};
pub use sse::{decode_stream, SseDecoder};
