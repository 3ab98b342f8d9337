//! ClickHouse table schemas.
//!
//! Two staging tables hold the latest source snapshots; the mart holds one
//! row per client and calendar day. Timestamps are pinned to UTC so that
//! `toDate(event_ts)` does not depend on the server timezone.

use crate::client::{db_error, ClickHouseClient};
use reports_core::Result;
use tracing::{debug, info};

/// Staging table for the client registry snapshot.
pub const CLIENTS_TABLE: &str = "stg_crm_clients";

/// Staging table for raw telemetry events.
pub const TELEMETRY_TABLE: &str = "stg_telemetry";

/// Daily per-client summary served to the report API.
pub const MART_TABLE: &str = "mart_user_telemetry_daily";

/// SQL for creating the client staging table.
pub const CREATE_CLIENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stg_crm_clients (
    client_id       UInt64,
    full_name       String,
    email           String,
    country         String,
    city            String,
    prosthesis_id   UInt64,
    activation_date Date
)
ENGINE = MergeTree
ORDER BY client_id
"#;

/// SQL for creating the telemetry staging table.
pub const CREATE_TELEMETRY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stg_telemetry (
    event_ts         DateTime('UTC'),
    client_id        UInt64,
    prosthesis_id    UInt64,
    reaction_time_ms Int32,
    battery_level    Int32,
    error_code       Nullable(String)
)
ENGINE = MergeTree
ORDER BY (client_id, event_ts)
"#;

/// SQL for creating the daily mart table.
pub const CREATE_MART_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mart_user_telemetry_daily (
    client_id         UInt64,
    report_date       Date,
    full_name         String,
    email             String,
    country           String,
    city              String,
    prosthesis_id     UInt64,
    activation_date   Date,
    total_events      UInt32,
    avg_reaction_ms   Float64,
    p95_reaction_ms   Float64,
    avg_battery_level Float64,
    errors_count      UInt32,
    last_event_ts     DateTime('UTC')
)
ENGINE = MergeTree
PARTITION BY toYYYYMM(report_date)
ORDER BY (client_id, report_date)
"#;

/// Get all table creation statements in order.
pub fn all_tables() -> Vec<&'static str> {
    vec![CREATE_CLIENTS_TABLE, CREATE_TELEMETRY_TABLE, CREATE_MART_TABLE]
}

/// Creates the staging and mart tables if they are missing.
///
/// Safe to run repeatedly.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    for ddl in all_tables() {
        client
            .inner()
            .query(ddl)
            .execute()
            .await
            .map_err(db_error("Failed to execute DDL"))?;
        debug!(ddl = ddl.trim().lines().next().unwrap_or_default(), "Applied DDL");
    }

    info!(
        database = %client.config().database,
        tables = all_tables().len(),
        "ClickHouse schema initialized"
    );
    Ok(())
}
