//! Batch pipeline for the reports mart.
//!
//! Step order: schema init, then both staging loads concurrently, then the
//! rollup. Failures propagate to the caller; nothing here retries.

pub mod config;
pub mod runner;
pub mod scheduler;
pub mod steps;

pub use config::*;
pub use runner::{Pipeline, PipelineRun};
pub use scheduler::{Job, PipelineScheduler};
pub use steps::Step;
