//! Shared harness for the integration tests.

pub mod containers;
pub mod fixtures;
pub mod setup;
