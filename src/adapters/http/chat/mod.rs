//! HTTP adapter for chat endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{ChatRequest, HistoryEntry, SimpleChatResponse};
pub use handlers::{ChatAppState, INCOMPLETE_MARKER};
pub use routes::chat_routes;
