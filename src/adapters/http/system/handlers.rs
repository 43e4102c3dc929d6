//! HTTP handlers for the health and credential endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::ports::{CompletionError, CompletionProvider};

use super::dto::{HealthResponse, ValidateKeyResponse};

/// Shared state for the system endpoints.
#[derive(Clone)]
pub struct SystemAppState {
    pub provider: Arc<dyn CompletionProvider>,
}

impl SystemAppState {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

/// GET /api/health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// GET /api/validate-key - Check the provider credential
///
/// Always answers 200; failures are reported in the body.
pub async fn validate_key(State(state): State<SystemAppState>) -> Json<ValidateKeyResponse> {
    match state.provider.list_models().await {
        Ok(count) => {
            tracing::info!(model_count = count, "API key validated");
            Json(ValidateKeyResponse::valid(count))
        }
        Err(e) => {
            tracing::warn!(error = %e, "API key validation failed");
            let error = match e {
                CompletionError::AuthenticationFailed => "Invalid OpenAI API key".to_string(),
                other => other.to_string(),
            };
            Json(ValidateKeyResponse::invalid(error))
        }
    }
}
