//! Full pipeline run against ClickHouse.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use clickhouse_client::ClickHouseClient;
use reports_core::Result;
use serde::Serialize;
use telemetry::metrics;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::scheduler::Job;
use crate::steps;

/// Row counts from one complete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineRun {
    pub clients_loaded: usize,
    pub telemetry_loaded: usize,
    pub mart_rows: u64,
    pub elapsed_ms: u64,
}

/// Binds the pipeline steps to a store and a pair of source files.
#[derive(Clone)]
pub struct Pipeline {
    clickhouse: Arc<ClickHouseClient>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(clickhouse: Arc<ClickHouseClient>, config: PipelineConfig) -> Self {
        Self { clickhouse, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn init_schema(&self) -> Result<()> {
        steps::init_schema(&self.clickhouse).await
    }

    pub async fn load_clients(&self) -> Result<usize> {
        steps::load_clients(&self.clickhouse, &self.config.clients_csv).await
    }

    pub async fn load_telemetry(&self) -> Result<usize> {
        steps::load_telemetry(&self.clickhouse, &self.config.telemetry_csv).await
    }

    pub async fn build_mart(&self) -> Result<u64> {
        steps::build_mart(&self.clickhouse).await
    }

    /// Schema init, both loads concurrently, then the rollup.
    ///
    /// The rollup starts only after both loads succeed. The first failing
    /// step aborts the run.
    pub async fn run(&self) -> Result<PipelineRun> {
        let start = Instant::now();

        let outcome = async {
            self.init_schema().await?;
            let (clients_loaded, telemetry_loaded) =
                tokio::try_join!(self.load_clients(), self.load_telemetry())?;
            let mart_rows = self.build_mart().await?;
            Ok::<_, reports_core::Error>((clients_loaded, telemetry_loaded, mart_rows))
        }
        .await;

        let (clients_loaded, telemetry_loaded, mart_rows) = match outcome {
            Ok(counts) => counts,
            Err(e) => {
                metrics().pipeline_failures.inc();
                error!("Pipeline run failed: {}", e);
                return Err(e);
            }
        };

        let run = PipelineRun {
            clients_loaded,
            telemetry_loaded,
            mart_rows,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            clients = run.clients_loaded,
            events = run.telemetry_loaded,
            mart_rows = run.mart_rows,
            elapsed_ms = run.elapsed_ms,
            "Pipeline run complete"
        );

        Ok(run)
    }
}

#[async_trait]
impl Job for Pipeline {
    fn name(&self) -> &'static str {
        "reports_pipeline"
    }

    async fn run(&self) -> Result<()> {
        Pipeline::run(self).await.map(|_| ())
    }
}
