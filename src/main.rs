//! BionicPRO reports service
//!
//! Batch pipeline and report API over a ClickHouse mart:
//! - CSV client registry and telemetry extracts loaded into staging tables
//! - Daily per-client rollup rebuilt from staging
//! - Authenticated `GET /reports` re-aggregating the mart over a date window

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState, CorsConfig, KeycloakConfig, KeycloakVerifier};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig};
use pipeline::{Pipeline, PipelineConfig, PipelineScheduler};
use telemetry::{init_tracing_from_env, metrics};

#[derive(Parser, Debug)]
#[command(name = "bionic-reports", version, about = "Telemetry mart pipeline and report API")]
struct Cli {
    /// Config file (TOML). Defaults to `config/default.toml` when present.
    #[arg(short, long, value_name = "FILE", env = "REPORTS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the report API (default).
    Serve,
    /// Create the staging and mart tables if missing.
    InitSchema,
    /// Replace the client staging table from a CSV extract.
    LoadClients {
        #[arg(long, value_name = "CSV")]
        path: Option<PathBuf>,
    },
    /// Replace the telemetry staging table from a CSV extract.
    LoadTelemetry {
        #[arg(long, value_name = "CSV")]
        path: Option<PathBuf>,
    },
    /// Rebuild the daily mart from staging.
    BuildMart,
    /// Run every step once: schema, both loads, then the rollup.
    RunPipeline {
        #[arg(long, value_name = "CSV")]
        clients: Option<PathBuf>,
        #[arg(long, value_name = "CSV")]
        telemetry: Option<PathBuf>,
    },
    /// Run the full pipeline now and then on a fixed interval.
    Schedule {
        #[arg(long, value_name = "SECS")]
        interval_secs: Option<u64>,
    },
}

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    cors: CorsConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    keycloak: KeycloakConfig,

    #[serde(default)]
    pipeline: PipelineConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            keycloak: KeycloakConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 needs a process-wide crypto provider before any TLS use.
    // An error here only means one is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();

    init_tracing_from_env();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    let clickhouse = Arc::new(ClickHouseClient::new(config.clickhouse.clone()));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, clickhouse).await,
        Command::InitSchema => {
            pipeline::steps::init_schema(&clickhouse).await?;
            Ok(())
        }
        Command::LoadClients { path } => {
            let path = path.unwrap_or(config.pipeline.clients_csv);
            pipeline::steps::load_clients(&clickhouse, &path).await?;
            Ok(())
        }
        Command::LoadTelemetry { path } => {
            let path = path.unwrap_or(config.pipeline.telemetry_csv);
            pipeline::steps::load_telemetry(&clickhouse, &path).await?;
            Ok(())
        }
        Command::BuildMart => {
            pipeline::steps::build_mart(&clickhouse).await?;
            Ok(())
        }
        Command::RunPipeline { clients, telemetry } => {
            if let Some(path) = clients {
                config.pipeline.clients_csv = path;
            }
            if let Some(path) = telemetry {
                config.pipeline.telemetry_csv = path;
            }
            let run = Pipeline::new(clickhouse, config.pipeline).run().await?;
            println!("{}", serde_json::to_string(&run)?);
            Ok(())
        }
        Command::Schedule { interval_secs } => {
            if let Some(secs) = interval_secs {
                config.pipeline.interval_secs = secs;
            }
            schedule(config, clickhouse).await
        }
    }
}

async fn serve(config: Config, clickhouse: Arc<ClickHouseClient>) -> Result<()> {
    info!("Starting Reports API v{}", env!("CARGO_PKG_VERSION"));

    check_health(&clickhouse).await;

    info!(
        issuer = %config.keycloak.issuer(),
        client_id = %config.keycloak.client_id,
        "Using identity provider"
    );
    let verifier = Arc::new(
        KeycloakVerifier::new(config.keycloak.clone())
            .context("Failed to create identity provider client")?,
    );

    let state = AppState::new(clickhouse, verifier);
    let app = router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log_metrics();
    info!("Shutdown complete");
    Ok(())
}

async fn schedule(config: Config, clickhouse: Arc<ClickHouseClient>) -> Result<()> {
    let every = config.pipeline.interval();
    let job = Arc::new(Pipeline::new(clickhouse, config.pipeline));
    let scheduler = Arc::new(PipelineScheduler::new(job, every));
    let handle = scheduler.start();

    shutdown_signal().await;
    handle.abort();

    log_metrics();
    info!("Scheduler stopped");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config/default").required(false),
    };

    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(file.format(config::FileFormat::Toml))
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("REPORTS")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat variables for nested sections. Field names with underscores do
    // not parse reliably through the `__` separator.
    if let Ok(url) = std::env::var("REPORTS_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("REPORTS_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("REPORTS_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("REPORTS_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Ok(url) = std::env::var("REPORTS_KEYCLOAK_URL") {
        config.keycloak.url = url;
    }
    if let Ok(realm) = std::env::var("REPORTS_KEYCLOAK_REALM") {
        config.keycloak.realm = realm;
    }
    if let Ok(client_id) = std::env::var("REPORTS_KEYCLOAK_CLIENT_ID") {
        config.keycloak.client_id = client_id;
    }

    Ok(config)
}

/// Logs store reachability on startup. The API starts either way.
async fn check_health(clickhouse: &ClickHouseClient) {
    match clickhouse_client::ping(clickhouse).await {
        Ok(latency_ms) => info!(latency_ms = %latency_ms, "ClickHouse connection: healthy"),
        Err(e) => error!("ClickHouse connection: unhealthy: {}", e),
    }
}

fn log_metrics() {
    match serde_json::to_string(&metrics().snapshot()) {
        Ok(snapshot) => info!(metrics = %snapshot, "Final metrics"),
        Err(e) => warn!("Failed to serialize metrics: {}", e),
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
