//! HTTP routes for the chat endpoints.

use axum::{routing::post, Router};

use super::handlers::{chat, chat_simple, ChatAppState};

/// Creates the chat router.
///
/// # Routes
///
/// - `POST /chat` - Streamed plain-text reply
/// - `POST /chat/simple` - JSON reply with token usage
pub fn chat_routes(state: ChatAppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/simple", post(chat_simple))
        .with_state(state)
}
