//! HTTP handlers for the chat endpoints.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::stream;

use crate::adapters::http::error::ChatApiError;
use crate::application::{RelayEvent, RelayMessageCommand, RelayMessageHandler};

use super::dto::{ChatRequest, SimpleChatResponse};

/// Appended to a streamed body when the upstream fails mid-response.
pub const INCOMPLETE_MARKER: &str = "\n\n[response incomplete: upstream stream terminated early]";

// ════════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the chat endpoints.
#[derive(Clone)]
pub struct ChatAppState {
    pub handler: Arc<RelayMessageHandler>,
}

impl ChatAppState {
    pub fn new(handler: Arc<RelayMessageHandler>) -> Self {
        Self { handler }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/chat - Stream the reply as plain text
pub async fn chat(
    State(state): State<ChatAppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ChatApiError> {
    let cmd = into_command(body)?;

    let relay = state.handler.stream(cmd).await?;
    tracing::debug!(trace_id = %relay.trace_id, "Streaming response started");

    // Dropping the body (client disconnect) drops the receiver, which stops the relay.
    let body = stream::unfold(relay.events, |mut events| async move {
        loop {
            match events.recv().await? {
                RelayEvent::Fragment(fragment) => {
                    return Some((Ok::<_, Infallible>(fragment), events))
                }
                RelayEvent::Interrupted { .. } => {
                    return Some((Ok(INCOMPLETE_MARKER.to_string()), events))
                }
                RelayEvent::Completed { .. } => continue,
            }
        }
    });

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

/// POST /api/chat/simple - Return the whole reply with usage
pub async fn chat_simple(
    State(state): State<ChatAppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<SimpleChatResponse>, ChatApiError> {
    let cmd = into_command(body)?;

    let reply = state.handler.complete(cmd).await?;

    Ok(Json(SimpleChatResponse {
        response: reply.text,
        usage: reply.usage,
    }))
}

fn into_command(
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<RelayMessageCommand, ChatApiError> {
    let Json(req) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected chat request body");
        ChatApiError::message_required()
    })?;

    let history = req.history_turns();
    let message = req.message.ok_or_else(ChatApiError::message_required)?;

    Ok(RelayMessageCommand::new(message).with_history(history))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_message_is_rejected() {
        let err = into_command(Ok(Json(ChatRequest::default()))).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn command_carries_message_and_history() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"What is KYC?","conversationHistory":[{"role":"user","content":"Hi"}]}"#,
        )
        .unwrap();

        let cmd = into_command(Ok(Json(req))).unwrap();

        assert_eq!(cmd.message, "What is KYC?");
        assert_eq!(cmd.history.len(), 1);
    }
}
