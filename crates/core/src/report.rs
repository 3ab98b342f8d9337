//! Window aggregation of mart rows and the report payload.
//!
//! Aggregation over a window works on the daily rows only: averages are a
//! mean of the daily means and the p95 is a quantile over the daily p95
//! values, not figures recomputed from raw events.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::records::DailySummaryRow;
use crate::stats::{finite, mean, p95};
use crate::window::ReportWindow;

/// Marker placed in the payload when the window holds no rows.
pub const NO_DATA_MESSAGE: &str = "No data for this period";

/// One identity's mart rows collapsed over a window.
///
/// Float members may be NaN when the store aggregated an empty set.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAggregate {
    pub client_id: u64,
    pub full_name: String,
    pub country: String,
    pub city: String,
    pub prosthesis_id: u64,
    pub total_events: u64,
    pub avg_reaction_ms: f64,
    pub p95_reaction_ms: f64,
    pub avg_battery_level: f64,
    pub errors_count: u64,
    pub last_event_ts: Option<NaiveDateTime>,
}

/// Collapses matching daily rows. Returns `None` when there are none.
///
/// Client attributes are taken from the first row.
pub fn aggregate_window<'a, I>(rows: I) -> Option<WindowAggregate>
where
    I: IntoIterator<Item = &'a DailySummaryRow>,
{
    let rows: Vec<&DailySummaryRow> = rows.into_iter().collect();
    let first = rows.first()?;

    let daily_p95: Vec<f64> = rows.iter().map(|r| r.p95_reaction_ms).collect();

    Some(WindowAggregate {
        client_id: first.client_id,
        full_name: first.full_name.clone(),
        country: first.country.clone(),
        city: first.city.clone(),
        prosthesis_id: first.prosthesis_id,
        total_events: rows.iter().map(|r| u64::from(r.total_events)).sum(),
        avg_reaction_ms: mean(rows.iter().map(|r| r.avg_reaction_ms)),
        p95_reaction_ms: p95(&daily_p95),
        avg_battery_level: mean(rows.iter().map(|r| r.avg_battery_level)),
        errors_count: rows.iter().map(|r| u64::from(r.errors_count)).sum(),
        last_event_ts: rows.iter().map(|r| r.last_event_ts).max(),
    })
}

/// `GET /reports` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub username: String,
    pub total_usage: u64,
    /// Error count over the window, kept under its historical name.
    pub active_sessions: u64,
    pub last_activity: Option<NaiveDateTime>,
    pub report_data: ReportData,
}

/// Detail payload: a full report, a no-data marker, or nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportData {
    Full(FullReport),
    NoData(NoDataReport),
    Empty {},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub client_id: u64,
    pub full_name: String,
    /// The requesting identity, not the stored address.
    pub email: String,
    pub country: String,
    pub city: String,
    pub prosthesis_id: u64,
    pub total_events: u64,
    pub avg_reaction_ms: Option<f64>,
    pub p95_reaction_ms: Option<f64>,
    pub avg_battery_level: Option<f64>,
    pub errors_count: u64,
    pub last_event_ts: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoDataReport {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub message: String,
}

impl ReportResponse {
    /// The mart holds no rows at all.
    pub fn empty(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            total_usage: 0,
            active_sessions: 0,
            last_activity: None,
            report_data: ReportData::Empty {},
        }
    }

    /// The window is valid but nothing matched the identity in it.
    pub fn no_data(username: impl Into<String>, window: ReportWindow) -> Self {
        Self {
            username: username.into(),
            total_usage: 0,
            active_sessions: 0,
            last_activity: None,
            report_data: ReportData::NoData(NoDataReport {
                from_date: window.from_date,
                to_date: window.to_date,
                message: NO_DATA_MESSAGE.to_string(),
            }),
        }
    }

    pub fn from_aggregate(
        username: impl Into<String>,
        window: ReportWindow,
        agg: WindowAggregate,
    ) -> Self {
        let username = username.into();
        Self {
            total_usage: agg.total_events,
            active_sessions: agg.errors_count,
            last_activity: agg.last_event_ts,
            report_data: ReportData::Full(FullReport {
                from_date: window.from_date,
                to_date: window.to_date,
                client_id: agg.client_id,
                full_name: agg.full_name,
                email: username.clone(),
                country: agg.country,
                city: agg.city,
                prosthesis_id: agg.prosthesis_id,
                total_events: agg.total_events,
                avg_reaction_ms: finite(agg.avg_reaction_ms),
                p95_reaction_ms: finite(agg.p95_reaction_ms),
                avg_battery_level: finite(agg.avg_battery_level),
                errors_count: agg.errors_count,
                last_event_ts: agg.last_event_ts,
            }),
            username,
        }
    }
}
