//! Query functions for reading tables back (used in tests and admin).

use crate::client::{db_error, ClickHouseClient};
use crate::rows::MartRow;
use crate::schema::MART_TABLE;
use reports_core::{DailySummaryRow, Result};

/// Count rows in a table.
pub async fn count_rows(client: &ClickHouseClient, table: &str) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query(&format!("SELECT count() FROM {table}"))
        .fetch_one()
        .await
        .map_err(db_error("Query error"))?;
    Ok(count)
}

/// Fetch the whole mart ordered by `(client_id, report_date)`.
pub async fn fetch_mart(client: &ClickHouseClient) -> Result<Vec<DailySummaryRow>> {
    let rows: Vec<MartRow> = client
        .inner()
        .query(&format!(
            "SELECT client_id, report_date, full_name, email, country, city, prosthesis_id, \
             activation_date, total_events, avg_reaction_ms, p95_reaction_ms, avg_battery_level, \
             errors_count, last_event_ts \
             FROM {MART_TABLE} ORDER BY client_id, report_date, email"
        ))
        .fetch_all()
        .await
        .map_err(db_error("Query error"))?;
    Ok(rows.into_iter().map(DailySummaryRow::from).collect())
}
