//! ClickHouse connectivity probe.

use crate::client::{db_error, ClickHouseClient};
use reports_core::Result;
use tracing::debug;

/// Round trips `SELECT 1` and returns the elapsed milliseconds.
pub async fn ping(client: &ClickHouseClient) -> Result<u128> {
    let start = std::time::Instant::now();
    client
        .inner()
        .query("SELECT 1")
        .fetch_one::<u8>()
        .await
        .map_err(db_error("Ping error"))?;

    let latency_ms = start.elapsed().as_millis();
    debug!(url = %client.config().url, latency_ms = %latency_ms, "ClickHouse reachable");
    Ok(latency_ms)
}
