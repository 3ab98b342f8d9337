//! ClickHouse storage for the reports service.

pub mod client;
pub mod config;
pub mod health;
pub mod mart;
pub mod query;
pub mod rows;
pub mod schema;
pub mod staging;

pub use client::*;
pub use config::*;
pub use health::ping;
pub use mart::{build_mart, MartReader};
pub use schema::init_schema;
pub use staging::{load_clients, load_telemetry};
