//! Application state shared across handlers.

use std::sync::Arc;

use clickhouse_client::MartReader;

use crate::auth::IdentityVerifier;

/// Shared application state.
///
/// Holds no per-request data. Both members are trait objects so tests can
/// swap in fakes.
#[derive(Clone)]
pub struct AppState {
    /// Read side of the daily mart (ClickHouse in production)
    pub mart: Arc<dyn MartReader>,
    /// Bearer token verifier (Keycloak in production)
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(mart: Arc<dyn MartReader>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { mart, verifier }
    }
}
