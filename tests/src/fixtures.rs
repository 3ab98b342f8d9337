//! Registry and telemetry fixtures.
//!
//! Two known clients and one unknown one. Daily activity for Anna:
//!
//! | day        | events | errors |
//! |------------|--------|--------|
//! | 2024-02-01 | 3      | 1      |
//! | 2024-02-05 | 2      | 0      |
//! | 2024-02-10 | 2      | 1      |
//!
//! John has a single event on 2024-02-10. Client 99 has an event on
//! 2024-02-11 that the rollup drops, so the newest mart date is 2024-02-10.

use chrono::{NaiveDate, NaiveDateTime};
use reports_core::{ClientRecord, TelemetryEvent};
use std::path::{Path, PathBuf};

pub const ANNA_EMAIL: &str = "anna.petrova@example.com";
pub const JOHN_EMAIL: &str = "john.smith@gmail.com";

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

pub fn ts(month: u32, day: u32, hour: u32, min: u32) -> NaiveDateTime {
    date(month, day).and_hms_opt(hour, min, 0).unwrap()
}

/// Newest report date the fixtures produce.
pub fn max_report_date() -> NaiveDate {
    date(2, 10)
}

pub fn clients() -> Vec<ClientRecord> {
    vec![
        ClientRecord {
            client_id: 1,
            full_name: "Anna Petrova".into(),
            email: ANNA_EMAIL.into(),
            country: "RU".into(),
            city: "Kazan".into(),
            prosthesis_id: 412,
            activation_date: date(1, 5),
        },
        ClientRecord {
            client_id: 2,
            full_name: "John Smith".into(),
            email: JOHN_EMAIL.into(),
            country: "US".into(),
            city: "Chicago".into(),
            prosthesis_id: 508,
            activation_date: NaiveDate::from_ymd_opt(2023, 11, 30).unwrap(),
        },
    ]
}

fn event(
    at: NaiveDateTime,
    client_id: u64,
    reaction_time_ms: i32,
    battery_level: i32,
    error_code: Option<&str>,
) -> TelemetryEvent {
    TelemetryEvent {
        event_ts: at,
        client_id,
        prosthesis_id: match client_id {
            1 => 412,
            2 => 508,
            _ => 999,
        },
        reaction_time_ms,
        battery_level,
        error_code: error_code.map(String::from),
    }
}

pub fn events() -> Vec<TelemetryEvent> {
    vec![
        event(ts(2, 1, 8, 0), 1, 100, 90, None),
        event(ts(2, 1, 12, 30), 1, 140, 85, Some("ERR_SIGNAL")),
        event(ts(2, 1, 18, 15), 1, 120, 80, None),
        event(ts(2, 5, 9, 0), 1, 90, 70, None),
        event(ts(2, 5, 21, 45), 1, 110, 60, None),
        event(ts(2, 10, 7, 30), 1, 150, 95, Some("ERR_BATTERY")),
        event(ts(2, 10, 19, 5), 1, 130, 75, None),
        event(ts(2, 10, 11, 0), 2, 160, 50, None),
        event(ts(2, 11, 10, 0), 99, 80, 40, Some("ERR_SIGNAL")),
    ]
}

pub fn clients_csv() -> String {
    let mut csv =
        String::from("client_id,full_name,email,country,city,prosthesis_id,activation_date\n");
    for c in clients() {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            c.client_id,
            c.full_name,
            c.email,
            c.country,
            c.city,
            c.prosthesis_id,
            c.activation_date.format("%Y-%m-%d")
        ));
    }
    csv
}

pub fn telemetry_csv() -> String {
    let mut csv = String::from(
        "event_ts,client_id,prosthesis_id,reaction_time_ms,battery_level,error_code\n",
    );
    for e in events() {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            e.event_ts.format("%Y-%m-%dT%H:%M:%S"),
            e.client_id,
            e.prosthesis_id,
            e.reaction_time_ms,
            e.battery_level,
            e.error_code.as_deref().unwrap_or("")
        ));
    }
    csv
}

/// Writes both extracts into `dir` and returns their paths.
pub fn write_sources(dir: &Path) -> (PathBuf, PathBuf) {
    let clients = dir.join("crm_clients.csv");
    let telemetry = dir.join("telemetry.csv");
    std::fs::write(&clients, clients_csv()).unwrap();
    std::fs::write(&telemetry, telemetry_csv()).unwrap();
    (clients, telemetry)
}
