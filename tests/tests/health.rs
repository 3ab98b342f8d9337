//! Tests for the unauthenticated endpoints.

use axum::http::StatusCode;
use integration_tests::setup::ApiContext;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_healthy() {
    let ctx = ApiContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body, serde_json::json!({ "status": "healthy" }));
}

/// Health does not touch the store.
#[tokio::test]
async fn test_health_ignores_store_failure() {
    let ctx = ApiContext::new();
    ctx.mart.set_should_fail(true);

    let response = ctx.server().get("/health").await;
    response.assert_status_ok();
    assert_eq!(ctx.mart.query_count(), 0);
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let ctx = ApiContext::new();

    let response = ctx.server().get("/").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Reports API");
    assert!(body["version"].is_string());
    assert_eq!(body["endpoints"]["health"], "/health");
    assert_eq!(body["endpoints"]["reports"], "/reports");
}

#[tokio::test]
async fn test_cors_allows_frontend_origin_with_credentials() {
    let ctx = ApiContext::new();

    let response = ctx
        .server()
        .get("/health")
        .add_header("Origin", "http://localhost:3000")
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header("Access-Control-Allow-Origin"),
        "http://localhost:3000"
    );
    assert_eq!(response.header("Access-Control-Allow-Credentials"), "true");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let ctx = ApiContext::new();

    let response = ctx
        .server()
        .get("/health")
        .add_header("Origin", "http://evil.example")
        .await;
    response.assert_status(StatusCode::OK);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
