use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::app::app;
use crate::config::{self, StorageBackend};
use crate::database::DatabaseManager;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "climbassist-api")]
#[command(about = "ClimbAssist catalog and user API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overriding CLIMB_API_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Create or update the PostgreSQL schema and exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(port).await,
        Commands::Migrate => migrate().await,
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    info!("Starting ClimbAssist API in {:?} mode", config.environment);

    let state = AppState::build(config).await?;
    let database = state.database.clone();

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("ClimbAssist API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(database) = database {
        database.close().await;
    }
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    let config = config::config();
    if config.storage.backend != StorageBackend::Postgres {
        anyhow::bail!("migrate needs CLIMB_STORAGE=postgres");
    }

    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    database.migrate().await?;
    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
