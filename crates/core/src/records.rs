//! Staging and mart records.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A client from the CRM registry snapshot.
///
/// `client_id` is expected to be unique within one snapshot; staging does
/// not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_id: u64,
    pub full_name: String,
    pub email: String,
    pub country: String,
    pub city: String,
    pub prosthesis_id: u64,
    pub activation_date: NaiveDate,
}

/// A single device telemetry event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_ts: NaiveDateTime,
    /// References a [`ClientRecord`], unchecked at staging time.
    pub client_id: u64,
    pub prosthesis_id: u64,
    pub reaction_time_ms: i32,
    pub battery_level: i32,
    /// Error tag; `None` means no error.
    pub error_code: Option<String>,
}

impl TelemetryEvent {
    /// Calendar day the event belongs to.
    pub fn report_date(&self) -> NaiveDate {
        self.event_ts.date()
    }

    pub fn has_error(&self) -> bool {
        self.error_code.as_deref().is_some_and(|code| !code.is_empty())
    }
}

/// One mart row: a client's telemetry rolled up over one calendar day.
///
/// Client attributes are copied from the registry at rollup time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummaryRow {
    pub client_id: u64,
    pub report_date: NaiveDate,
    pub full_name: String,
    pub email: String,
    pub country: String,
    pub city: String,
    pub prosthesis_id: u64,
    pub activation_date: NaiveDate,
    pub total_events: u32,
    pub avg_reaction_ms: f64,
    pub p95_reaction_ms: f64,
    pub avg_battery_level: f64,
    pub errors_count: u32,
    pub last_event_ts: NaiveDateTime,
}
