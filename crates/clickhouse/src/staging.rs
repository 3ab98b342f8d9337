//! Staging loaders: truncate the table, then bulk insert the snapshot.
//!
//! There is no upsert and no history. A failure after the truncate leaves
//! the table partially filled until the next successful load.

use crate::client::{db_error, ClickHouseClient};
use crate::rows::{ClientRow, TelemetryRow};
use crate::schema::{CLIENTS_TABLE, TELEMETRY_TABLE};
use clickhouse::Row;
use reports_core::{ClientRecord, Error, Result, TelemetryEvent};
use serde::Serialize;
use telemetry::metrics;
use tracing::{debug, info};

/// Empties a table. Missing tables are not an error.
pub async fn truncate(client: &ClickHouseClient, table: &str) -> Result<()> {
    client
        .inner()
        .query(&format!("TRUNCATE TABLE IF EXISTS {table}"))
        .execute()
        .await
        .map_err(db_error("Truncate error"))?;
    debug!(table = table, "Truncated table");
    Ok(())
}

/// Writes all rows in one insert.
pub(crate) async fn bulk_insert<T>(
    client: &ClickHouseClient,
    table: &str,
    rows: &[T],
) -> Result<usize>
where
    T: Row + Serialize,
{
    if rows.is_empty() {
        return Ok(0);
    }

    let start = std::time::Instant::now();

    let mut insert = client.inner().insert(table).map_err(|e| {
        metrics().clickhouse_insert_errors.inc();
        Error::database(format!("Insert error: {e}"))
    })?;

    for row in rows {
        insert.write(row).await.map_err(|e| {
            metrics().clickhouse_insert_errors.inc();
            Error::database(format!("Write error: {e}"))
        })?;
    }

    insert.end().await.map_err(|e| {
        metrics().clickhouse_insert_errors.inc();
        Error::database(format!("End error: {e}"))
    })?;

    let elapsed = start.elapsed();
    metrics().batch_insert_latency_ms.observe(elapsed.as_millis() as u64);
    metrics().clickhouse_inserts.inc();

    debug!(
        table = table,
        count = rows.len(),
        latency_ms = %elapsed.as_millis(),
        "Inserted rows"
    );

    Ok(rows.len())
}

/// Replaces `stg_crm_clients` with the given registry snapshot.
pub async fn load_clients(client: &ClickHouseClient, records: &[ClientRecord]) -> Result<usize> {
    // Convert before truncating so a bad record leaves the old snapshot intact.
    let rows = records
        .iter()
        .map(ClientRow::try_from)
        .collect::<Result<Vec<_>>>()?;

    truncate(client, CLIENTS_TABLE).await?;
    let count = bulk_insert(client, CLIENTS_TABLE, &rows).await?;

    metrics().client_rows_loaded.inc_by(count as u64);
    info!(table = CLIENTS_TABLE, rows = count, "Loaded client staging");
    Ok(count)
}

/// Replaces `stg_telemetry` with the given event snapshot.
pub async fn load_telemetry(client: &ClickHouseClient, events: &[TelemetryEvent]) -> Result<usize> {
    let rows = events
        .iter()
        .map(TelemetryRow::try_from)
        .collect::<Result<Vec<_>>>()?;

    truncate(client, TELEMETRY_TABLE).await?;
    let count = bulk_insert(client, TELEMETRY_TABLE, &rows).await?;

    metrics().telemetry_rows_loaded.inc_by(count as u64);
    info!(table = TELEMETRY_TABLE, rows = count, "Loaded telemetry staging");
    Ok(count)
}
