//! Top-level API router.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::RelayMessageHandler;
use crate::config::AppConfig;
use crate::domain::conversation::PromptAssembler;
use crate::ports::CompletionProvider;

use super::chat::{chat_routes, ChatAppState};
use super::system::{system_routes, SystemAppState};

/// Creates the application router with every endpoint under `/api`.
///
/// CORS is permissive when `cors_origins` is empty.
pub fn api_router(handler: Arc<RelayMessageHandler>, cors_origins: &[String]) -> Router {
    let system_state = SystemAppState::new(handler.provider().clone());

    let api = Router::new()
        .merge(chat_routes(ChatAppState::new(handler)))
        .merge(system_routes(system_state));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// Wires a [`RelayMessageHandler`] from configuration and builds the router.
pub fn app_router(config: &AppConfig, provider: Arc<dyn CompletionProvider>) -> Router {
    let handler = RelayMessageHandler::new(
        provider,
        PromptAssembler::new(config.chat.system_instruction()),
    )
    .with_options(config.ai.completion_options())
    .with_history_limit(config.chat.history_limit)
    .with_relay_buffer(config.chat.relay_buffer);

    api_router(Arc::new(handler), &config.server.cors_origins_list())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
