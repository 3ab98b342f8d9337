//! Report endpoint behaviour over an in-memory mart.
//!
//! Uses the real router and extractors; only the store and the identity
//! provider are replaced. Does not need Docker.

use axum::http::StatusCode;
use integration_tests::fixtures::{self, ANNA_EMAIL};
use integration_tests::mocks::InMemoryMart;
use integration_tests::setup::{
    ApiContext, ANNA_OTHER_DOMAIN_TOKEN, ANNA_TOKEN, ANNA_USERNAME_TOKEN, ANONYMOUS_TOKEN,
    EXPIRED_TOKEN,
};
use reports_core::DailySummaryRow;
use serde_json::Value;

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

async fn get_report(ctx: &ApiContext, token: &str, query: &str) -> axum_test::TestResponse {
    ctx.server()
        .get(&format!("/reports{query}"))
        .add_header("Authorization", &bearer(token))
        .await
}

fn assert_close(actual: &Value, expected: f64) {
    let actual = actual.as_f64().expect("expected a number");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// No query parameters covers the trailing week ending at the newest mart date.
#[tokio::test]
async fn test_default_window_is_trailing_week() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_TOKEN, "").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["username"], ANNA_EMAIL);
    assert_eq!(body["report_data"]["from_date"], "2024-02-04");
    assert_eq!(body["report_data"]["to_date"], "2024-02-10");

    // 2024-02-05 and 2024-02-10 only
    assert_eq!(body["total_usage"], 4);
    assert_eq!(body["active_sessions"], 1);
    assert_eq!(body["last_activity"], "2024-02-10T19:05:00");

    let data = &body["report_data"];
    assert_eq!(data["client_id"], 1);
    assert_eq!(data["full_name"], "Anna Petrova");
    assert_eq!(data["email"], ANNA_EMAIL);
    assert_eq!(data["city"], "Kazan");
    assert_eq!(data["prosthesis_id"], 412);
    assert_close(&data["avg_reaction_ms"], 120.0);
    assert_close(&data["p95_reaction_ms"], 147.0);
    assert_close(&data["avg_battery_level"], 75.0);
}

/// Window aggregates are means of daily means and a p95 of daily p95s.
#[tokio::test]
async fn test_explicit_window_reaggregates_daily_rows() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_TOKEN, "?from_date=2024-02-01&to_date=2024-02-10").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["total_usage"], 7);
    assert_eq!(body["active_sessions"], 2);
    let data = &body["report_data"];
    assert_close(&data["avg_reaction_ms"], 120.0);
    // daily p95s 138, 109, 149
    assert_close(&data["p95_reaction_ms"], 147.9);
    assert_close(&data["avg_battery_level"], (85.0 + 65.0 + 85.0) / 3.0);
}

#[tokio::test]
async fn test_window_totals_sum_daily_counts() {
    let mut rows = InMemoryMart::from_sources(&fixtures::clients(), &fixtures::events()).rows();
    rows.retain(|r| r.client_id == 1);
    let template: DailySummaryRow = rows[0].clone();
    let day = |date, total_events, errors_count| DailySummaryRow {
        report_date: date,
        total_events,
        errors_count,
        ..template.clone()
    };
    let mart = InMemoryMart::new();
    mart.replace(vec![
        day(fixtures::date(3, 1), 10, 2),
        day(fixtures::date(3, 2), 5, 1),
    ]);
    let ctx = ApiContext::with_mart(mart);

    let response = get_report(&ctx, ANNA_TOKEN, "?from_date=2024-03-01").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["total_usage"], 15);
    assert_eq!(body["active_sessions"], 3);
}

#[tokio::test]
async fn test_inverted_window_rejected() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_TOKEN, "?from_date=2024-02-10&to_date=2024-02-01").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "WINDOW_001");
}

#[tokio::test]
async fn test_window_beyond_mart_names_max_date() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_TOKEN, "?to_date=2024-02-11").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "WINDOW_002");
    assert!(
        body["error"].as_str().unwrap().contains("2024-02-10"),
        "message should name the max date: {body}"
    );
    // Rejected before the aggregate query
    assert_eq!(ctx.mart.query_count(), 1);
}

#[tokio::test]
async fn test_malformed_date_rejected() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_TOKEN, "?from_date=not-a-date").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "WINDOW_003");
}

#[tokio::test]
async fn test_duplicated_bound_is_coded_rejection() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_TOKEN, "?from_date=2024-02-01&from_date=2024-02-02").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "WINDOW_003");
    assert!(body["error"].as_str().unwrap().contains("from_date"), "{body}");
    assert_eq!(ctx.mart.query_count(), 0);
}

/// The scheme name is case-insensitive.
#[tokio::test]
async fn test_lowercase_bearer_scheme_accepted() {
    let ctx = ApiContext::new();

    let response = ctx
        .server()
        .get("/reports")
        .add_header("Authorization", &format!("bearer {ANNA_TOKEN}"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["username"], ANNA_EMAIL);
}

/// An empty mart short-circuits before any window logic.
#[tokio::test]
async fn test_empty_mart_returns_zero_report() {
    let ctx = ApiContext::empty();

    for query in ["", "?from_date=2024-02-10&to_date=2024-02-01", "?to_date=2030-01-01"] {
        let response = get_report(&ctx, ANNA_TOKEN, query).await;
        response.assert_status_ok();
        let body: Value = response.json();

        assert_eq!(body["username"], ANNA_EMAIL);
        assert_eq!(body["total_usage"], 0);
        assert_eq!(body["active_sessions"], 0);
        assert!(body["last_activity"].is_null());
        assert_eq!(body["report_data"], serde_json::json!({}));
    }

    assert_eq!(ctx.mart.query_count(), 3);
}

#[tokio::test]
async fn test_window_without_rows_is_no_data() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_TOKEN, "?from_date=2024-02-02&to_date=2024-02-04").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["total_usage"], 0);
    assert_eq!(body["active_sessions"], 0);
    assert!(body["last_activity"].is_null());
    assert_eq!(body["report_data"]["from_date"], "2024-02-02");
    assert_eq!(body["report_data"]["to_date"], "2024-02-04");
    assert_eq!(body["report_data"]["message"], "No data for this period");
}

/// A bare username matches the stored address by local part.
#[tokio::test]
async fn test_username_identity_matches_local_part() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_USERNAME_TOKEN, "").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["username"], "anna.petrova");
    assert_eq!(body["total_usage"], 4);
    assert_eq!(body["report_data"]["email"], "anna.petrova");
}

/// A qualified email only matches exactly; the suffix pattern adds nothing.
#[tokio::test]
async fn test_other_domain_email_does_not_match() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANNA_OTHER_DOMAIN_TOKEN, "").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["total_usage"], 0);
    assert_eq!(body["report_data"]["message"], "No data for this period");
}

#[tokio::test]
async fn test_missing_credentials_unauthorized() {
    let ctx = ApiContext::new();

    let response = ctx.server().get("/reports").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("WWW-Authenticate"), "Bearer");
    let body: Value = response.json();
    assert_eq!(body["code"], "AUTH_001");
    assert_eq!(body["error"], "Invalid authentication credentials");
}

#[tokio::test]
async fn test_rejected_tokens_look_identical() {
    let ctx = ApiContext::new();
    let server = ctx.server();

    let mut bodies = Vec::new();
    for header in [
        bearer("unknown-token"),
        bearer(EXPIRED_TOKEN),
        "Basic YW5uYTpzZWNyZXQ=".to_string(),
        "Bearer ".to_string(),
    ] {
        let response = server.get("/reports").add_header("Authorization", &header).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("WWW-Authenticate"), "Bearer");
        bodies.push(response.text());
    }

    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(ctx.mart.query_count(), 0);
}

#[tokio::test]
async fn test_token_without_identity_is_bad_request() {
    let ctx = ApiContext::new();

    let response = get_report(&ctx, ANONYMOUS_TOKEN, "").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "AUTH_002");
    assert_eq!(ctx.mart.query_count(), 0);
}

#[tokio::test]
async fn test_store_failure_is_generic_500() {
    let ctx = ApiContext::new();
    ctx.mart.set_should_fail(true);

    let response = get_report(&ctx, ANNA_TOKEN, "").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DB_001");
    assert_eq!(body["error"], "Internal server error");
    assert!(!response.text().contains("mock store unavailable"));
}
