//! CSV source extracts for the client registry and device telemetry.

use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::records::{ClientRecord, TelemetryEvent};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Deserialize)]
struct RawClient {
    client_id: String,
    full_name: String,
    email: String,
    country: String,
    city: String,
    prosthesis_id: String,
    activation_date: String,
}

#[derive(Debug, Deserialize)]
struct RawTelemetry {
    event_ts: String,
    client_id: String,
    prosthesis_id: String,
    reaction_time_ms: String,
    battery_level: String,
    #[serde(default)]
    error_code: Option<String>,
}

fn parse_int<T: std::str::FromStr>(field: &str, value: &str) -> std::result::Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {field}: {value:?}"))
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| format!("invalid activation_date: {value:?}"))
}

fn parse_timestamp(value: &str) -> std::result::Result<NaiveDateTime, String> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value.trim(), fmt).ok())
        .ok_or_else(|| format!("invalid event_ts: {value:?}"))
}

impl TryFrom<RawClient> for ClientRecord {
    type Error = String;

    fn try_from(raw: RawClient) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            client_id: parse_int("client_id", &raw.client_id)?,
            full_name: raw.full_name,
            email: raw.email,
            country: raw.country,
            city: raw.city,
            prosthesis_id: parse_int("prosthesis_id", &raw.prosthesis_id)?,
            activation_date: parse_date(&raw.activation_date)?,
        })
    }
}

impl TryFrom<RawTelemetry> for TelemetryEvent {
    type Error = String;

    fn try_from(raw: RawTelemetry) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            event_ts: parse_timestamp(&raw.event_ts)?,
            client_id: parse_int("client_id", &raw.client_id)?,
            prosthesis_id: parse_int("prosthesis_id", &raw.prosthesis_id)?,
            reaction_time_ms: parse_int("reaction_time_ms", &raw.reaction_time_ms)?,
            battery_level: parse_int("battery_level", &raw.battery_level)?,
            error_code: raw.error_code.filter(|code| !code.trim().is_empty()),
        })
    }
}

/// Reads typed rows in file order. The first malformed row fails the read.
fn read_rows<R, Raw, T>(source_name: &str, reader: R) -> Result<Vec<T>>
where
    R: Read,
    Raw: for<'de> Deserialize<'de>,
    T: TryFrom<Raw, Error = String>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::source(source_name, 1, e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            Error::source(source_name, line, e.to_string())
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw: Raw = record
            .deserialize(Some(&headers))
            .map_err(|e| Error::source(source_name, line, e.to_string()))?;
        let row = T::try_from(raw).map_err(|msg| Error::source(source_name, line, msg))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Reads the client registry extract.
pub fn read_clients<R: Read>(source_name: &str, reader: R) -> Result<Vec<ClientRecord>> {
    read_rows::<R, RawClient, ClientRecord>(source_name, reader)
}

/// Reads the telemetry extract.
pub fn read_telemetry<R: Read>(source_name: &str, reader: R) -> Result<Vec<TelemetryEvent>> {
    read_rows::<R, RawTelemetry, TelemetryEvent>(source_name, reader)
}

pub fn read_clients_file(path: impl AsRef<Path>) -> Result<Vec<ClientRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    read_clients(&path.display().to_string(), file)
}

pub fn read_telemetry_file(path: impl AsRef<Path>) -> Result<Vec<TelemetryEvent>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    read_telemetry(&path.display().to_string(), file)
}
