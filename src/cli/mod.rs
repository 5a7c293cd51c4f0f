use std::sync::Arc;

use anyhow::{bail, Context};
use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::app::{app, AppState};
use crate::auth::JwtKeys;
use crate::config::{config, AppConfig};
use crate::database::{DatabaseManager, MemoryStore, PgStore};
use crate::is_production;

#[derive(Parser)]
#[command(name = "tcm-api")]
#[command(about = "Test case management API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Listen port (overrides API_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Use a process-local store instead of Postgres")]
        in_memory: bool,
    },

    #[command(about = "Apply the database schema and exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config();
    info!(environment = ?config.environment, "Loaded configuration");

    match cli.command {
        Commands::Serve { port, in_memory } => serve(config, port, in_memory).await,
        Commands::Migrate => migrate(config).await,
    }
}

async fn serve(config: &AppConfig, port: Option<u16>, in_memory: bool) -> anyhow::Result<()> {
    let keys = JwtKeys::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)
        .context("JWT_SECRET must be set")?;

    let (state, database) = if in_memory {
        if is_production!() {
            bail!("--in-memory is not allowed in production");
        }
        warn!("Serving from an in-memory store; data is lost on exit");
        (AppState::new(Arc::new(MemoryStore::new()), keys), None)
    } else {
        let database = DatabaseManager::connect(&config.database).await?;
        database.migrate().await?;
        database.health_check().await?;
        let store = PgStore::new(database.pool().clone());
        (AppState::new(Arc::new(store), keys), Some(database))
    };

    let router = app(state, cors_layer(config), config.api.enable_request_logging);

    let port = port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(database) = database {
        database.close().await;
    }
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let database = DatabaseManager::connect(&config.database).await?;
    database.migrate().await?;
    info!("Schema applied");
    database.close().await;
    Ok(())
}

/// Permissive in development, the configured origin list elsewhere
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if !is_production!() && security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
