//! Per-user report endpoint.
//!
//! Two store round trips per request: the newest mart date, then the window
//! aggregate for the caller's identity.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use reports_core::error::WindowErrorCode;
use reports_core::{Error, IdentityFilter, ReportResponse, Result, VerifiedIdentity, WindowRequest};
use serde::Deserialize;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info};

use crate::extractors::CurrentUser;
use crate::response::ApiError;
use crate::state::AppState;

/// Raw query bounds. Parsed by hand so bad dates map to a coded 422.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

/// GET /reports - Aggregated usage for the caller over a date window.
pub async fn report_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: std::result::Result<Query<ReportQuery>, QueryRejection>,
) -> std::result::Result<Json<ReportResponse>, ApiError> {
    let start = Instant::now();

    // Malformed query strings get the same coded 422 as bad dates.
    let query = query
        .map(|Query(query)| query)
        .map_err(|rejection| Error::window(WindowErrorCode::Unparseable, rejection.body_text()));

    let result = build_report(&state, &user, query).await;

    metrics()
        .report_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    match &result {
        Ok(report) => {
            metrics().reports_served.inc();
            info!(
                username = %report.username,
                total_usage = report.total_usage,
                latency_ms = %start.elapsed().as_millis(),
                "Served report"
            );
        }
        Err(e) if e.is_rejection() => {
            metrics().report_rejections.inc();
            debug!(error = %e, "Rejected report request");
        }
        Err(_) => {
            metrics().report_failures.inc();
        }
    }

    result.map(Json).map_err(ApiError::from)
}

async fn build_report(
    state: &AppState,
    user: &VerifiedIdentity,
    query: Result<ReportQuery>,
) -> Result<ReportResponse> {
    let identity = user.require_identity()?;
    let query = query?;
    let request = WindowRequest::parse(query.from_date.as_deref(), query.to_date.as_deref())?;

    let Some(max_report_date) = state.mart.max_report_date().await? else {
        debug!(identity = identity, "Mart is empty");
        return Ok(ReportResponse::empty(identity));
    };

    let window = request.resolve(max_report_date)?;
    let filter = IdentityFilter::new(identity);

    let report = match state.mart.aggregate_window(&filter, &window).await? {
        Some(aggregate) => ReportResponse::from_aggregate(identity, window, aggregate),
        None => ReportResponse::no_data(identity, window),
    };

    Ok(report)
}
