//! ipbook-was - IP-Book asset inventory service
//!
//! Loads the record table from the root folder, then serves the query,
//! facet, row edit and bulk upload API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ipbook_common::config::{config_file_path, ServiceConfig, TomlConfig, BIND_ENV, ROOT_FOLDER_ENV};
use ipbook_was::facets::OrgSnapshot;
use ipbook_was::store::RecordStore;
use ipbook_was::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for ipbook-was
#[derive(Parser, Debug)]
#[command(name = "ipbook-was")]
#[command(about = "IP-Book asset inventory service")]
#[command(version)]
struct Args {
    /// Folder holding the backing file and the org snapshot
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long, env = BIND_ENV)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config file is read before tracing so its log level can apply
    let config_path = config_file_path();
    let toml_result = config_path.as_deref().map(TomlConfig::load);
    let toml = match &toml_result {
        Some(Ok(config)) => config.clone(),
        _ => TomlConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", toml.logging.level))),
        )
        .init();

    info!("Starting IP-Book WAS (ipbook-was) v{}", env!("CARGO_PKG_VERSION"));

    match (&config_path, &toml_result) {
        (Some(path), Some(Ok(_))) => info!("Config file: {}", path.display()),
        (Some(path), Some(Err(e))) => warn!("Ignoring config file {}: {}", path.display(), e),
        _ => info!("No config file, using defaults"),
    }

    let config = ServiceConfig::resolve(args.root_folder, args.bind, toml);
    config
        .ensure_root_folder()
        .with_context(|| format!("Failed to create root folder {}", config.root_folder.display()))?;
    info!("Root folder: {}", config.root_folder.display());
    info!("Backing file: {}", config.data_path.display());

    let mut store = RecordStore::new(&config.data_path);
    match store.load().await {
        Ok(rows) => info!("✓ Loaded {} records", rows),
        Err(e) => error!("Failed to load backing file, starting empty: {}", e),
    }

    let state = AppState::new(
        store,
        OrgSnapshot::new(&config.filter_sample_path),
        config.upload_limit_bytes,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("ipbook-was listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
