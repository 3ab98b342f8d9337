//! Individual pipeline steps.
//!
//! Each step logs its start, row count and elapsed time. Errors are logged
//! and returned unchanged.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clickhouse_client::ClickHouseClient;
use reports_core::{source, Error, Result};
use tracing::{error, info};

/// A named unit of batch work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    InitSchema,
    LoadClients,
    LoadTelemetry,
    BuildMart,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitSchema => "init_schema",
            Self::LoadClients => "load_clients",
            Self::LoadTelemetry => "load_telemetry",
            Self::BuildMart => "build_mart",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs `work` under the step's logging.
pub(crate) async fn timed<T, F>(step: Step, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    info!(step = %step, "Step started");

    match work.await {
        Ok(value) => {
            info!(step = %step, elapsed_ms = %start.elapsed().as_millis(), "Step finished");
            Ok(value)
        }
        Err(e) => {
            error!(step = %step, elapsed_ms = %start.elapsed().as_millis(), "Step failed: {}", e);
            Err(e)
        }
    }
}

async fn read_blocking<T, F>(path: &Path, read: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(PathBuf) -> Result<T> + Send + 'static,
{
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || read(path))
        .await
        .map_err(|e| Error::internal(format!("source reader panicked: {e}")))?
}

pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    timed(Step::InitSchema, clickhouse_client::init_schema(client)).await
}

/// Reads the client CSV and replaces the client staging table.
pub async fn load_clients(client: &ClickHouseClient, path: &Path) -> Result<usize> {
    timed(Step::LoadClients, async {
        let records = read_blocking(path, |p| source::read_clients_file(p)).await?;
        info!(path = %path.display(), records = records.len(), "Read client registry");
        clickhouse_client::load_clients(client, &records).await
    })
    .await
}

/// Reads the telemetry CSV and replaces the telemetry staging table.
pub async fn load_telemetry(client: &ClickHouseClient, path: &Path) -> Result<usize> {
    timed(Step::LoadTelemetry, async {
        let events = read_blocking(path, |p| source::read_telemetry_file(p)).await?;
        info!(path = %path.display(), events = events.len(), "Read telemetry events");
        clickhouse_client::load_telemetry(client, &events).await
    })
    .await
}

pub async fn build_mart(client: &ClickHouseClient) -> Result<u64> {
    timed(Step::BuildMart, clickhouse_client::build_mart(client)).await
}
