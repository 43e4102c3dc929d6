//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `ai` - Completion providers (OpenAI, mock)
//! - `connectivity` - Reachability and credential probes
//! - `http` - axum REST API

pub mod ai;
pub mod connectivity;
pub mod http;

pub use ai::{MockCompletionProvider, OpenAIConfig, OpenAIProvider};
pub use connectivity::{HttpConnectivityProbe, ProviderConnectivityProbe};
