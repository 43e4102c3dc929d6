//! Error taxonomy surfaced by chat operations.

use thiserror::Error;

use crate::domain::connectivity::ConnectivityStatus;
use crate::domain::errors::ValidationError;
use crate::ports::{CompletionError, ProviderFailure};

/// Errors that can occur when sending a chat message.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Message (or configuration input) rejected before any upstream call.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Provider rejected the credential.
    #[error("Authentication with the completion provider failed")]
    Auth,

    /// Provider throttled the request.
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// Any other provider failure before output was produced.
    #[error("Provider error: {0}")]
    Provider(ProviderFailure),

    /// The response stream failed after partial output was relayed.
    #[error("Response stream interrupted after {} bytes: {source}", .partial.len())]
    StreamInterrupted {
        /// Text relayed before the failure.
        partial: String,
        source: CompletionError,
    },

    /// The consumer went away before the response finished.
    #[error("Response cancelled by the client")]
    Cancelled,

    /// The session is not connected.
    #[error("Chat is not ready: connectivity is {status}")]
    NotReady { status: ConnectivityStatus },
}

impl ChatError {
    /// Whether a later retry could plausibly succeed. Advisory only.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::RateLimited { .. } | ChatError::Provider(_) | ChatError::StreamInterrupted { .. }
        )
    }
}

impl From<CompletionError> for ChatError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::AuthenticationFailed => ChatError::Auth,
            CompletionError::RateLimited { retry_after_secs } => {
                ChatError::RateLimited { retry_after_secs }
            }
            CompletionError::Provider(failure) => ChatError::Provider(failure),
        }
    }
}
