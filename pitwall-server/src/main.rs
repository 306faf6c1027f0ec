//! pitwall-server - Formula 1 statistics sync and REST API
//!
//! Startup order: resolve configuration, initialize logging, open the database, build the
//! source adapters and services, spawn the current-season sync, serve HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use pitwall_common::config::{load_optional_config, ServiceConfig};
use pitwall_common::IdentifierOverrides;
use pitwall_server::services::LineupServiceClient;
use pitwall_server::sources::{HistoricalSource, RosterSource};
use pitwall_server::utils::SeasonClock;
use pitwall_server::AppState;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments (highest configuration priority)
#[derive(Parser, Debug)]
#[command(name = "pitwall-server")]
#[command(about = "Formula 1 statistics sync and REST API")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "PITWALL_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    bind: Option<String>,

    /// Skip the current-season sync at startup
    #[arg(long)]
    no_startup_sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = load_optional_config(args.config.as_deref()).context("Failed to load config")?;
    let mut config = ServiceConfig::from_toml_and_env(toml).context("Invalid configuration")?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if args.no_startup_sync {
        config.sync_on_startup = false;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.log_level))),
        )
        .init();

    info!("Starting pitwall-server {}", pitwall_server::build_id());
    info!("Database: {}", config.database_path.display());
    info!(
        historical = %config.historical.base_url,
        roster = %config.roster.base_url,
        lineup_service = %config.lineup_service_url,
        "Upstream endpoints"
    );

    let db = pitwall_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let overrides = Arc::new(IdentifierOverrides::from_tables(&config.overrides));
    info!("Identifier overrides loaded: {} entries", overrides.len());

    let clock = SeasonClock::system();
    let historical = Arc::new(
        HistoricalSource::new(&config.historical, overrides.clone())
            .context("Failed to build historical source")?,
    );
    let roster = Arc::new(
        RosterSource::new(&config.roster, overrides.clone(), clock)
            .context("Failed to build roster source")?,
    );
    let lineup_service = Arc::new(
        LineupServiceClient::new(&config.lineup_service_url)
            .context("Failed to build lineup service client")?,
    );

    let state =
        AppState::new(db, roster, historical, lineup_service, overrides).with_clock(clock);

    if config.sync_on_startup {
        spawn_startup_sync(state.clone());
    } else {
        info!("Startup sync disabled");
    }

    let app = pitwall_server::build_router(state)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Sync the current season in the background; failures are logged, never fatal
fn spawn_startup_sync(state: AppState) {
    tokio::spawn(async move {
        let season = state.current_year();
        info!(season, "Running startup sync");

        let report = state.orchestrator.sync_season(season).await;
        match report.error_message() {
            None => info!(season, "Startup sync complete"),
            Some(message) => {
                error!(season, error = %message, "Startup sync failed");
                state
                    .record_error(format!("startup sync {}: {}", season, message))
                    .await;
            }
        }
    });
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
