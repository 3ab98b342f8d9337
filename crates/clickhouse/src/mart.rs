//! Daily mart rollup and the report-window reader.

use async_trait::async_trait;
use chrono::NaiveDate;
use clickhouse::Row;
use reports_core::{IdentityFilter, ReportWindow, Result, WindowAggregate};
use serde::Deserialize;
use telemetry::metrics;
use tracing::{debug, info};

use crate::client::{db_error, ClickHouseClient};
use crate::rows::{days_to_date, secs_to_ts};
use crate::schema::MART_TABLE;
use crate::staging::truncate;

/// Rebuilds the mart from the current staging snapshots.
///
/// Grouping includes every selected client column, which `client_id`
/// already determines.
pub const BUILD_MART_SQL: &str = r#"
INSERT INTO mart_user_telemetry_daily (
    client_id,
    report_date,
    full_name,
    email,
    country,
    city,
    prosthesis_id,
    activation_date,
    total_events,
    avg_reaction_ms,
    p95_reaction_ms,
    avg_battery_level,
    errors_count,
    last_event_ts
)
SELECT
    t.client_id                                           AS client_id,
    toDate(t.event_ts)                                    AS report_date,
    c.full_name                                           AS full_name,
    c.email                                               AS email,
    c.country                                             AS country,
    c.city                                                AS city,
    c.prosthesis_id                                       AS prosthesis_id,
    c.activation_date                                     AS activation_date,
    count()                                               AS total_events,
    avg(t.reaction_time_ms)                               AS avg_reaction_ms,
    quantileExactInclusive(0.95)(t.reaction_time_ms)      AS p95_reaction_ms,
    avg(t.battery_level)                                  AS avg_battery_level,
    countIf(t.error_code IS NOT NULL AND t.error_code != '') AS errors_count,
    max(t.event_ts)                                       AS last_event_ts
FROM stg_telemetry t
INNER JOIN stg_crm_clients c
    ON c.client_id = t.client_id
GROUP BY
    t.client_id,
    toDate(t.event_ts),
    c.full_name,
    c.email,
    c.country,
    c.city,
    c.prosthesis_id,
    c.activation_date
"#;

/// NULL when the mart is empty; `max` alone would return 1970-01-01.
const MAX_REPORT_DATE_SQL: &str =
    "SELECT maxOrNull(report_date) AS max_report_date FROM mart_user_telemetry_daily";

/// Clears the mart and refills it from staging.
///
/// Not transactional: a failure after the truncate leaves the mart empty
/// or partial until the next successful run.
pub async fn build_mart(client: &ClickHouseClient) -> Result<u64> {
    let start = std::time::Instant::now();

    truncate(client, MART_TABLE).await?;

    client
        .inner()
        .query(BUILD_MART_SQL)
        .execute()
        .await
        .map_err(db_error("Mart rollup error"))?;

    let rows: u64 = client
        .inner()
        .query("SELECT count() FROM mart_user_telemetry_daily")
        .fetch_one()
        .await
        .map_err(db_error("Query error"))?;

    let elapsed = start.elapsed();
    metrics().rollup_latency_ms.observe(elapsed.as_millis() as u64);
    metrics().mart_rebuilds.inc();

    info!(
        table = MART_TABLE,
        rows = rows,
        latency_ms = %elapsed.as_millis(),
        "Rebuilt daily mart"
    );

    Ok(rows)
}

/// Read side of the mart used by the report endpoint.
#[async_trait]
pub trait MartReader: Send + Sync {
    /// Newest `report_date` in the mart, or `None` when the mart is empty.
    async fn max_report_date(&self) -> Result<Option<NaiveDate>>;

    /// Collapses the identity's rows inside the window.
    ///
    /// Returns `None` when no row matches.
    async fn aggregate_window(
        &self,
        filter: &IdentityFilter,
        window: &ReportWindow,
    ) -> Result<Option<WindowAggregate>>;
}

#[derive(Debug, Row, Deserialize)]
struct MaxDateRow {
    max_report_date: Option<u16>,
}

#[derive(Debug, Row, Deserialize)]
struct WindowAggregateRow {
    matched_rows: u64,
    client_id: u64,
    full_name: String,
    country: String,
    city: String,
    prosthesis_id: u64,
    total_events: u64,
    avg_reaction_ms: f64,
    p95_reaction_ms: f64,
    avg_battery_level: f64,
    errors_count: u64,
    last_event_ts: u32,
}

impl From<WindowAggregateRow> for WindowAggregate {
    fn from(row: WindowAggregateRow) -> Self {
        Self {
            client_id: row.client_id,
            full_name: row.full_name,
            country: row.country,
            city: row.city,
            prosthesis_id: row.prosthesis_id,
            total_events: row.total_events,
            avg_reaction_ms: row.avg_reaction_ms,
            p95_reaction_ms: row.p95_reaction_ms,
            avg_battery_level: row.avg_battery_level,
            errors_count: row.errors_count,
            last_event_ts: Some(secs_to_ts(row.last_event_ts)),
        }
    }
}

/// Builds the window aggregation statement for a filter.
///
/// Bare identities skip the equality branch. Bind order: the exact email
/// when present, the `LIKE` pattern, then the two window bounds.
pub fn window_aggregate_sql(filter: &IdentityFilter) -> String {
    let email_predicate = if filter.exact().is_some() {
        "(email = ? OR email LIKE ?)"
    } else {
        "email LIKE ?"
    };

    format!(
        r#"
        SELECT
            count()                                 AS matched_rows,
            any(client_id)                          AS client_id,
            any(full_name)                          AS full_name,
            any(country)                            AS country,
            any(city)                               AS city,
            any(prosthesis_id)                      AS prosthesis_id,
            sum(total_events)                       AS total_events,
            avg(avg_reaction_ms)                    AS avg_reaction_ms,
            quantileExactInclusive(0.95)(p95_reaction_ms) AS p95_reaction_ms,
            avg(avg_battery_level)                  AS avg_battery_level,
            sum(errors_count)                       AS errors_count,
            max(last_event_ts)                      AS last_event_ts
        FROM {MART_TABLE}
        WHERE {email_predicate}
          AND report_date BETWEEN toDate(?) AND toDate(?)
        "#
    )
}

#[async_trait]
impl MartReader for ClickHouseClient {
    async fn max_report_date(&self) -> Result<Option<NaiveDate>> {
        let row: MaxDateRow = self
            .inner()
            .query(MAX_REPORT_DATE_SQL)
            .fetch_one()
            .await
            .map_err(db_error("Query error"))?;

        Ok(row.max_report_date.map(days_to_date))
    }

    async fn aggregate_window(
        &self,
        filter: &IdentityFilter,
        window: &ReportWindow,
    ) -> Result<Option<WindowAggregate>> {
        let start = std::time::Instant::now();
        let sql = window_aggregate_sql(filter);

        let mut query = self.inner().query(&sql);
        if let Some(exact) = filter.exact() {
            query = query.bind(exact);
        }
        let row: WindowAggregateRow = query
            .bind(filter.pattern())
            .bind(window.from_date.format("%Y-%m-%d").to_string())
            .bind(window.to_date.format("%Y-%m-%d").to_string())
            .fetch_one()
            .await
            .map_err(db_error("Query error"))?;

        metrics()
            .clickhouse_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        debug!(
            identity = filter.identity(),
            from_date = %window.from_date,
            to_date = %window.to_date,
            matched_rows = row.matched_rows,
            "Aggregated report window"
        );

        if row.matched_rows == 0 {
            return Ok(None);
        }

        Ok(Some(row.into()))
    }
}
