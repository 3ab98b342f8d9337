//! Internal telemetry for the reports service.
//!
//! Structured logging plus in-process counters; nothing is exported.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
