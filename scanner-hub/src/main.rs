use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use scanner_hub::api::{ApiServer, AppState};
use scanner_hub::config::{AppConfig, DEFAULT_CONFIG_FILE};
use scanner_hub::database::{self, SqlxRecordRepository, SqlxStatusEventRepository};
use scanner_hub::logging;
use scanner_hub::persistence::SqlitePersistenceSink;
use scanner_hub::supervisor::{SupervisorOrchestrator, TcpConnector};

/// Scanner connection supervisor.
#[derive(Debug, Parser)]
#[command(name = "scanner-hub", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "SCANNER_HUB_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory for rolling log files (overrides the configuration file)
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }

    let (logging_config, _log_guard) = logging::init_logging(&config.log_dir)?;
    let shutdown = CancellationToken::new();
    logging_config.start_retention_cleanup(shutdown.child_token());

    tracing::info!(
        config = %args.config.display(),
        scanners = config.scanners.len(),
        "scanner-hub starting"
    );

    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    let orchestrator = Arc::new(SupervisorOrchestrator::new(
        config.supervisor.clone(),
        Arc::new(TcpConnector),
        Arc::new(SqlitePersistenceSink::new(pool.clone())),
    ));
    orchestrator.start_all(&config.endpoints());

    let state = AppState::new(Arc::clone(&orchestrator))
        .with_repositories(
            Arc::new(SqlxRecordRepository::new(pool.clone())),
            Arc::new(SqlxStatusEventRepository::new(pool.clone())),
        )
        .with_logging(Arc::clone(&logging_config));
    let server = ApiServer::new(config.api.clone(), state);
    let server_token = server.cancel_token();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signals");
            return;
        }
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
        server_token.cancel();
    });

    let server_result = server.run().await;
    if let Err(e) = &server_result {
        tracing::error!(error = %e, "API server stopped with error");
    }

    shutdown.cancel();
    orchestrator.stop_all().await;
    pool.close().await;
    tracing::info!("scanner-hub stopped");

    server_result.map_err(Into::into)
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
