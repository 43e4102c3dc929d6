//! Ports - Interfaces to external systems.
//!
//! Ports define the contracts the application layer relies on. Adapters
//! implement them for concrete services (OpenAI, the backend HTTP API).

mod completion_provider;
mod connectivity_probe;

pub use completion_provider::{
    CompletionError, CompletionOptions, CompletionProvider, CompletionRequest,
    CompletionResponse, CompletionStream, FinishReason, ProviderFailure,
    StreamChunk, TokenUsage,
};
pub use connectivity_probe::ConnectivityProbe;
