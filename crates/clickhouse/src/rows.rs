//! RowBinary row types and chrono conversions.
//!
//! ClickHouse `Date` travels as days since the epoch (`u16`) and
//! `DateTime` as seconds since the epoch (`u32`).

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use clickhouse::Row;
use reports_core::{ClientRecord, DailySummaryRow, Error, Result, TelemetryEvent};
use serde::{Deserialize, Serialize};

/// 1970-01-01, the `Default` date.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

pub fn date_to_days(date: NaiveDate) -> Result<u16> {
    let days = date.signed_duration_since(epoch()).num_days();
    u16::try_from(days)
        .map_err(|_| Error::internal(format!("date {date} outside ClickHouse Date range")))
}

pub fn days_to_date(days: u16) -> NaiveDate {
    epoch() + Days::new(u64::from(days))
}

pub fn ts_to_secs(ts: NaiveDateTime) -> Result<u32> {
    u32::try_from(ts.and_utc().timestamp())
        .map_err(|_| Error::internal(format!("timestamp {ts} outside ClickHouse DateTime range")))
}

pub fn secs_to_ts(secs: u32) -> NaiveDateTime {
    DateTime::from_timestamp(i64::from(secs), 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

/// Row in `stg_crm_clients`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct ClientRow {
    pub client_id: u64,
    pub full_name: String,
    pub email: String,
    pub country: String,
    pub city: String,
    pub prosthesis_id: u64,
    pub activation_date: u16,
}

impl TryFrom<&ClientRecord> for ClientRow {
    type Error = Error;

    fn try_from(record: &ClientRecord) -> Result<Self> {
        Ok(Self {
            client_id: record.client_id,
            full_name: record.full_name.clone(),
            email: record.email.clone(),
            country: record.country.clone(),
            city: record.city.clone(),
            prosthesis_id: record.prosthesis_id,
            activation_date: date_to_days(record.activation_date)?,
        })
    }
}

/// Row in `stg_telemetry`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct TelemetryRow {
    pub event_ts: u32,
    pub client_id: u64,
    pub prosthesis_id: u64,
    pub reaction_time_ms: i32,
    pub battery_level: i32,
    pub error_code: Option<String>,
}

impl TryFrom<&TelemetryEvent> for TelemetryRow {
    type Error = Error;

    fn try_from(event: &TelemetryEvent) -> Result<Self> {
        Ok(Self {
            event_ts: ts_to_secs(event.event_ts)?,
            client_id: event.client_id,
            prosthesis_id: event.prosthesis_id,
            reaction_time_ms: event.reaction_time_ms,
            battery_level: event.battery_level,
            error_code: event.error_code.clone().filter(|code| !code.is_empty()),
        })
    }
}

/// Row in `mart_user_telemetry_daily`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct MartRow {
    pub client_id: u64,
    pub report_date: u16,
    pub full_name: String,
    pub email: String,
    pub country: String,
    pub city: String,
    pub prosthesis_id: u64,
    pub activation_date: u16,
    pub total_events: u32,
    pub avg_reaction_ms: f64,
    pub p95_reaction_ms: f64,
    pub avg_battery_level: f64,
    pub errors_count: u32,
    pub last_event_ts: u32,
}

impl From<MartRow> for DailySummaryRow {
    fn from(row: MartRow) -> Self {
        Self {
            client_id: row.client_id,
            report_date: days_to_date(row.report_date),
            full_name: row.full_name,
            email: row.email,
            country: row.country,
            city: row.city,
            prosthesis_id: row.prosthesis_id,
            activation_date: days_to_date(row.activation_date),
            total_events: row.total_events,
            avg_reaction_ms: row.avg_reaction_ms,
            p95_reaction_ms: row.p95_reaction_ms,
            avg_battery_level: row.avg_battery_level,
            errors_count: row.errors_count,
            last_event_ts: secs_to_ts(row.last_event_ts),
        }
    }
}
