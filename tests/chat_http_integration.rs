//! Integration tests for the chat relay HTTP API.
//!
//! These tests drive the full router with a mock completion provider:
//! 1. Streamed and batch chat replies
//! 2. Error status codes and bodies
//! 3. Health and credential endpoints

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use chat_relay::adapters::ai::{MockCompletionProvider, MockError};
use chat_relay::adapters::http::chat::INCOMPLETE_MARKER;
use chat_relay::adapters::http::{api_router, app_router};
use chat_relay::application::RelayMessageHandler;
use chat_relay::config::AppConfig;
use chat_relay::domain::conversation::{PromptAssembler, Role};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app(provider: MockCompletionProvider) -> Router {
    app_router(&AppConfig::default(), Arc::new(provider))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// POST /api/chat
// =============================================================================

#[tokio::test]
async fn chat_streams_plain_text_reply() {
    let provider = MockCompletionProvider::new().with_stream(["KYC ", "means ", "Know Your Customer."]);

    let response = app(provider)
        .oneshot(post_json("/api/chat", json!({ "message": "What is KYC?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(body_text(response).await, "KYC means Know Your Customer.");
}

#[tokio::test]
async fn chat_forwards_history_before_new_message() {
    let provider = MockCompletionProvider::new().with_stream(["Sure."]);
    let calls = provider.clone();

    let response = app(provider)
        .oneshot(post_json(
            "/api/chat",
            json!({
                "message": "And AML?",
                "conversationHistory": [
                    { "role": "user", "content": "What is KYC?" },
                    { "role": "assistant", "content": "Know Your Customer." }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(body_text(response).await, "Sure.");

    let requests = calls.get_calls();
    assert_eq!(requests.len(), 1);
    let turns = requests[0].prompt.turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role(), Role::System);
    assert_eq!(turns[1].content(), "What is KYC?");
    assert_eq!(turns[2].role(), Role::Assistant);
    assert_eq!(turns[3].content(), "And AML?");
}

#[tokio::test]
async fn chat_marks_body_incomplete_on_mid_stream_failure() {
    let provider = MockCompletionProvider::new().with_interrupted_stream(
        ["KYC ", "is "],
        MockError::Network {
            message: "connection reset".to_string(),
        },
    );

    let response = app(provider)
        .oneshot(post_json("/api/chat", json!({ "message": "What is KYC?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        format!("KYC is {}", INCOMPLETE_MARKER)
    );
}

#[tokio::test]
async fn chat_with_empty_reply_has_empty_body() {
    let provider = MockCompletionProvider::new().with_stream(Vec::<String>::new());

    let response = app(provider)
        .oneshot(post_json("/api/chat", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn chat_without_message_is_bad_request() {
    let provider = MockCompletionProvider::new();
    let calls = provider.clone();

    let response = app(provider)
        .oneshot(post_json("/api/chat", json!({ "conversationHistory": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Message is required" })
    );
    assert_eq!(calls.call_count(), 0);
}

#[tokio::test]
async fn chat_with_blank_message_is_bad_request() {
    let response = app(MockCompletionProvider::new())
        .oneshot(post_json("/api/chat", json!({ "message": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_with_malformed_body_is_bad_request() {
    let request = Request::post("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(MockCompletionProvider::new())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Message is required" })
    );
}

#[tokio::test]
async fn chat_with_rejected_key_is_unauthorized() {
    let provider = MockCompletionProvider::new().with_error(MockError::AuthenticationFailed);

    let response = app(provider)
        .oneshot(post_json("/api/chat", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid OpenAI API key. Please check your configuration." })
    );
}

#[tokio::test]
async fn chat_when_rate_limited_is_too_many_requests() {
    let provider =
        MockCompletionProvider::new().with_error(MockError::RateLimited { retry_after_secs: 12 });

    let response = app(provider)
        .oneshot(post_json("/api/chat", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "12");
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Rate limit exceeded. Please try again later." })
    );
}

#[tokio::test]
async fn chat_with_upstream_failure_is_internal_error() {
    let provider = MockCompletionProvider::new().with_error(MockError::Upstream {
        status: 503,
        message: "overloaded".to_string(),
    });

    let response = app(provider)
        .oneshot(post_json("/api/chat", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "error": "Failed to process request. Please try again." }));
    assert!(!body.to_string().contains("overloaded"));
}

// =============================================================================
// POST /api/chat/simple
// =============================================================================

#[tokio::test]
async fn simple_chat_returns_reply_and_usage() {
    let provider = MockCompletionProvider::new().with_response("KYC means Know Your Customer.");

    let response = app(provider)
        .oneshot(post_json("/api/chat/simple", json!({ "message": "What is KYC?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "response": "KYC means Know Your Customer.",
            "usage": { "promptTokens": 5, "completionTokens": 10, "totalTokens": 15 }
        })
    );
}

#[tokio::test]
async fn simple_chat_without_message_is_bad_request() {
    let response = app(MockCompletionProvider::new())
        .oneshot(post_json("/api/chat/simple", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn simple_chat_with_timeout_is_internal_error() {
    let provider = MockCompletionProvider::new().with_error(MockError::Timeout { timeout_secs: 60 });

    let response = app(provider)
        .oneshot(post_json("/api/chat/simple", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// System endpoints
// =============================================================================

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let response = app(MockCompletionProvider::new())
        .oneshot(get("/api/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn validate_key_reports_model_count() {
    let provider = MockCompletionProvider::new().with_models(42);

    let response = app(provider).oneshot(get("/api/validate-key")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "valid": true, "modelCount": 42 })
    );
}

#[tokio::test]
async fn validate_key_reports_invalid_key_in_body() {
    let provider = MockCompletionProvider::new().with_model_error(MockError::AuthenticationFailed);

    let response = app(provider).oneshot(get("/api/validate-key")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "valid": false, "error": "Invalid OpenAI API key" })
    );
}

#[tokio::test]
async fn custom_system_instruction_is_sent_first() {
    let provider = MockCompletionProvider::new().with_response("ok");
    let calls = provider.clone();
    let handler = RelayMessageHandler::new(
        Arc::new(provider),
        PromptAssembler::new("You are a test assistant."),
    );

    let response = api_router(Arc::new(handler), &[])
        .oneshot(post_json("/api/chat/simple", json!({ "message": "Hello" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let requests = calls.get_calls();
    assert_eq!(
        requests[0].prompt.turns()[0].content(),
        "You are a test assistant."
    );
}
