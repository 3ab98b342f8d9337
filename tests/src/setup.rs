//! Common test setup functions.

use std::sync::Arc;

use api::{router, AppState, CorsConfig};
use axum::Router;
use axum_test::TestServer;
use clickhouse_client::{ClickHouseClient, MartReader};
use pipeline::{Pipeline, PipelineConfig};
use reports_core::VerifiedIdentity;
use tempfile::TempDir;

use crate::containers::TestContainers;
use crate::fixtures::{self, ANNA_EMAIL};
use crate::mocks::{InMemoryMart, MockVerifier};

pub const ANNA_TOKEN: &str = "anna-token";
/// Verifies to Anna's local part only, as a username claim.
pub const ANNA_USERNAME_TOKEN: &str = "anna-username-token";
/// Verifies to Anna's local part under a different domain.
pub const ANNA_OTHER_DOMAIN_TOKEN: &str = "anna-other-domain-token";
/// Verifies, but carries no identity claims.
pub const ANONYMOUS_TOKEN: &str = "anonymous-token";
/// Verifies with an expiry in the past.
pub const EXPIRED_TOKEN: &str = "expired-token";

fn register_tokens(verifier: &MockVerifier) {
    verifier.allow_email(ANNA_TOKEN, ANNA_EMAIL);
    verifier.allow(
        ANNA_USERNAME_TOKEN,
        VerifiedIdentity {
            username: Some("anna.petrova".into()),
            subject: Some("9b1f".into()),
            ..Default::default()
        },
    );
    verifier.allow_email(ANNA_OTHER_DOMAIN_TOKEN, "anna.petrova@other.org");
    verifier.allow(ANONYMOUS_TOKEN, VerifiedIdentity::default());
    verifier.allow(
        EXPIRED_TOKEN,
        VerifiedIdentity {
            email: Some(ANNA_EMAIL.into()),
            expires_at: Some(1),
            ..Default::default()
        },
    );
}

fn build_router(mart: Arc<dyn MartReader>, verifier: &MockVerifier) -> Router {
    let state = AppState::new(mart, Arc::new(verifier.clone()));
    router(state, &CorsConfig::default())
}

/// Real router over an in-memory mart. No Docker needed.
pub struct ApiContext {
    pub mart: Arc<InMemoryMart>,
    pub verifier: MockVerifier,
    pub router: Router,
}

impl ApiContext {
    /// Mart built from the standard fixtures.
    pub fn new() -> Self {
        Self::with_mart(InMemoryMart::from_sources(
            &fixtures::clients(),
            &fixtures::events(),
        ))
    }

    /// Mart with no rows, as before the first rollup.
    pub fn empty() -> Self {
        Self::with_mart(InMemoryMart::new())
    }

    pub fn with_mart(mart: InMemoryMart) -> Self {
        let mart = Arc::new(mart);
        let verifier = MockVerifier::new();
        register_tokens(&verifier);
        let router = build_router(mart.clone(), &verifier);

        Self {
            mart,
            verifier,
            router,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }
}

impl Default for ApiContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context with a real ClickHouse and the fixture extracts on disk.
///
/// The router reads the ClickHouse mart; tokens come from [`MockVerifier`].
pub struct TestContext {
    pub containers: TestContainers,
    pub clickhouse: Arc<ClickHouseClient>,
    pub pipeline: Pipeline,
    pub verifier: MockVerifier,
    pub router: Router,
    #[allow(dead_code)]
    sources: TempDir,
}

impl TestContext {
    /// Starts ClickHouse and writes the fixture CSVs. The schema is not
    /// created; run the pipeline or `init_schema` first.
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;
        let clickhouse = Arc::new(ClickHouseClient::new(containers.clickhouse_config.clone()));

        let sources = TempDir::new().expect("Failed to create temp dir");
        let (clients_csv, telemetry_csv) = fixtures::write_sources(sources.path());
        let pipeline = Pipeline::new(
            clickhouse.clone(),
            PipelineConfig {
                clients_csv,
                telemetry_csv,
                ..Default::default()
            },
        );

        let verifier = MockVerifier::new();
        register_tokens(&verifier);
        let router = build_router(clickhouse.clone(), &verifier);

        Self {
            containers,
            clickhouse,
            pipeline,
            verifier,
            router,
            sources,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }
}
