//! HTTP routes for the system endpoints.

use axum::{routing::get, Router};

use super::handlers::{health, validate_key, SystemAppState};

/// Creates the system router (`/health`, `/validate-key`).
pub fn system_routes(state: SystemAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/validate-key", get(validate_key))
        .with_state(state)
}
