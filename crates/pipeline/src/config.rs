//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Source files and schedule for the batch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Client registry CSV
    #[serde(default = "default_clients_csv")]
    pub clients_csv: PathBuf,
    /// Telemetry events CSV
    #[serde(default = "default_telemetry_csv")]
    pub telemetry_csv: PathBuf,
    /// Seconds between scheduled runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_clients_csv() -> PathBuf {
    PathBuf::from("/opt/airflow/sample_files/crm_clients.csv")
}

fn default_telemetry_csv() -> PathBuf {
    PathBuf::from("/opt/airflow/sample_files/telemetry.csv")
}

fn default_interval_secs() -> u64 {
    3600 // hourly
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clients_csv: default_clients_csv(),
            telemetry_csv: default_telemetry_csv(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl PipelineConfig {
    /// Interval between scheduled runs. Never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}
