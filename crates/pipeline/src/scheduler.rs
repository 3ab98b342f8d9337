//! Fixed-interval scheduler for the batch pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reports_core::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Work the scheduler triggers on every tick.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<()>;
}

/// Runs a job immediately and then once per interval.
///
/// A failed run is logged and the loop waits for the next tick. Runs never
/// overlap: a slow run delays the following tick.
pub struct PipelineScheduler {
    job: Arc<dyn Job>,
    every: Duration,
}

impl PipelineScheduler {
    pub fn new(job: Arc<dyn Job>, every: Duration) -> Self {
        Self { job, every }
    }

    /// Spawns the loop onto the runtime.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        info!(
            job = self.job.name(),
            interval_secs = self.every.as_secs(),
            "Pipeline scheduler started"
        );
        tokio::spawn(async move { self.run_forever().await })
    }

    async fn run_forever(&self) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.job.run().await {
                error!(job = self.job.name(), "Scheduled run failed: {}", e);
            }
        }
    }
}
