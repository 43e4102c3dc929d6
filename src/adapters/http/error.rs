//! Error responses for the HTTP API.
//!
//! Bodies are always `{ "error": "<message>" }`. Internal details are logged,
//! never returned.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::application::ChatError;

pub const MESSAGE_REQUIRED: &str = "Message is required";
pub const INVALID_API_KEY: &str = "Invalid OpenAI API key. Please check your configuration.";
pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded. Please try again later.";
pub const PROCESSING_FAILED: &str = "Failed to process request. Please try again.";

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Wrapper for converting chat errors to HTTP responses.
#[derive(Debug)]
pub struct ChatApiError(pub ChatError);

impl From<ChatError> for ChatApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl ChatApiError {
    /// A request without a usable message.
    pub fn message_required() -> Self {
        Self(ChatError::InvalidInput(
            crate::domain::errors::ValidationError::empty_field("message"),
        ))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            ChatError::InvalidInput(e) if e.field() == "message" => {
                (StatusCode::BAD_REQUEST, MESSAGE_REQUIRED.to_string())
            }
            ChatError::Auth => (StatusCode::UNAUTHORIZED, INVALID_API_KEY.to_string()),
            ChatError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_EXCEEDED.to_string())
            }
            ChatError::NotReady { status } => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Chat is not ready: connectivity is {}", status),
            ),
            ChatError::InvalidInput(_)
            | ChatError::Provider(_)
            | ChatError::StreamInterrupted { .. }
            | ChatError::Cancelled => {
                (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED.to_string())
            }
        }
    }
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0, "Chat request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self.0, "Chat request rejected");
        }

        let mut response = (status, Json(ErrorResponse::new(message))).into_response();
        if let ChatError::RateLimited { retry_after_secs } = self.0 {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
