//! medimind-api - prescription management backend
//!
//! Serves the auth, upload and schedule API and runs the reminder
//! scheduler in the same process.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use medimind_common::config::{
    default_config_path, CliOverrides, DataDirInitializer, ServiceConfig, TomlConfig,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use medimind_api::services::Services;
use medimind_api::AppState;

/// Command-line arguments for medimind-api
#[derive(Parser, Debug)]
#[command(name = "medimind-api")]
#[command(about = "MediMind prescription and reminder backend")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "MEDIMIND_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Folder holding the database
    #[arg(short, long, env = "MEDIMIND_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

fn default_filter(level: &str) -> String {
    format!(
        "medimind_api={level},medimind_common={level},tower_http={level}",
        level = level
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let dotenv_path = dotenvy::dotenv().ok();

    // RUST_LOG wins; otherwise the level from the config file is applied below
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let initial_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter("info")));
    let (filter, filter_handle) = reload::Layer::new(initial_filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting MediMind API v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = TomlConfig::load_or_default(config_path.as_deref());

    let cli = CliOverrides {
        host: args.host,
        port: args.port,
        data_dir: args.data_dir,
    };
    let config = ServiceConfig::load(&cli, &toml_config);

    if !rust_log_set && config.log_level != "info" {
        filter_handle
            .modify(|f| *f = EnvFilter::new(default_filter(&config.log_level)))
            .context("Failed to apply log level")?;
    }

    let initializer = DataDirInitializer::new(config.data_dir.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize data folder")?;
    info!("Data folder: {}", config.data_dir.display());
    info!("Database: {}", config.database_path.display());

    let db_pool = medimind_common::db::init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let services = Services::from_config(&config)?;
    let bind_address = config.bind_address();
    let state = AppState::new(db_pool.clone(), config, services);

    state.scheduler.start().await;
    let scheduler = state.scheduler.clone();

    let app = medimind_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.stop().await;
    db_pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
