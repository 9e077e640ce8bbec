//! HTTP-level tests for the API contract: bearer authentication, request
//! validation and configuration errors. None of these reach a model or a
//! database.
//!
//! Run with: cargo test --test api_http

#![cfg(feature = "server")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pipeline_agent::api::{build_router, AppState, TaskResponse};
use pipeline_agent::config::AppConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

const TEST_API_KEY: &str = "test-api-key";

fn build_test_app() -> axum::Router {
    let config = AppConfig::from_lookup(|key| match key {
        "API_KEY" => Some(TEST_API_KEY.to_string()),
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        _ => None,
    })
    .expect("test config");
    let state = AppState::from_config(&config).expect("test state");
    build_router(Arc::new(state))
}

fn analyze_request(auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/analyze_db")
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn valid_body() -> Value {
    json!({
        "connection_url": "mongodb://localhost:27017",
        "database_name": "app",
        "collection_list": ["Users"],
        "query": "How many users are there?"
    })
}

async fn send(request: Request<Body>) -> (StatusCode, TaskResponse) {
    let response = build_test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: TaskResponse = serde_json::from_slice(&bytes).expect("TaskResponse body");
    (status, body)
}

#[tokio::test]
async fn test_health_is_public() {
    let response = build_test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_missing_token_is_forbidden() {
    let (status, body) = send(analyze_request(None, valid_body())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body.error.as_deref(), Some("HTTP Exception"));
    assert_eq!(body.error_data, Some(json!("Not authenticated")));
    assert_eq!(body.output, None);
}

#[tokio::test]
async fn test_malformed_header_is_forbidden() {
    let (status, _) = send(analyze_request(Some("Token abc"), valid_body())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_wrong_token_is_unauthorized() {
    let (status, body) = send(analyze_request(Some("Bearer nope"), valid_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.error.as_deref(), Some("HTTP Exception"));
    assert_eq!(body.error_data, Some(json!("Invalid API key")));
}

#[tokio::test]
async fn test_unknown_model_is_configuration_error() {
    let mut body = valid_body();
    body["llm_name"] = json!("llama-3");
    let (status, body) = send(analyze_request(Some("Bearer test-api-key"), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error.as_deref(), Some("Configuration Error"));
    assert!(body.error_data.unwrap().as_str().unwrap().contains("llama-3"));
}

#[tokio::test]
async fn test_missing_backend_key_is_configuration_error() {
    let mut body = valid_body();
    body["llm_name"] = json!("codestral-latest");
    let (status, body) = send(analyze_request(Some("Bearer test-api-key"), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body
        .error_data
        .unwrap()
        .as_str()
        .unwrap()
        .contains("MISTRALAI_API_KEY"));
}

#[tokio::test]
async fn test_unsupported_database_type() {
    let mut body = valid_body();
    body["database_type"] = json!("PostgreSQL");
    let (status, body) = send(analyze_request(Some("Bearer test-api-key"), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error.as_deref(), Some("Configuration Error"));
    assert!(body.error_data.unwrap().as_str().unwrap().contains("PostgreSQL"));
}

#[tokio::test]
async fn test_invalid_connection_url() {
    let mut body = valid_body();
    body["connection_url"] = json!("postgres://localhost/app");
    let (status, body) = send(analyze_request(Some("Bearer test-api-key"), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error.as_deref(), Some("Configuration Error"));
}

#[tokio::test]
async fn test_missing_field_is_invalid_request() {
    let (status, body) = send(analyze_request(
        Some("Bearer test-api-key"),
        json!({"connection_url": "mongodb://localhost:27017"}),
    ))
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body.error.as_deref(), Some("Invalid Request"));
}

#[tokio::test]
async fn test_unparseable_body_is_invalid_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze_db")
        .header("content-type", "application/json")
        .header("authorization", "Bearer test-api-key")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error.as_deref(), Some("Invalid Request"));
}
