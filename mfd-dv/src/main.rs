//! mfd-dv (Data Visualization) - taxonomic tree and heatmap service
//!
//! Serves file classification, FPOD pairing, date range analysis, the
//! taxonomic tree and the time-series heatmap model over HTTP.
//!
//! Bootstrap configuration priority: command line, environment, TOML file,
//! compiled defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use mfd_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use mfd_dv::store::{FileCatalog, HttpObjectStore, LocalObjectStore, ObjectStore};
use mfd_dv::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MODULE_NAME: &str = "mfd-dv";

/// Command-line arguments for mfd-dv
#[derive(Parser, Debug)]
#[command(name = "mfd-dv")]
#[command(about = "Taxonomic tree and heatmap service for marine field data")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MFD_PORT")]
    port: Option<u16>,

    /// Root folder holding the catalog database and local objects
    #[arg(short, long, env = "MFD_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config_dir>/mfd/mfd-dv.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of a remote object store; local storage when absent
    #[arg(long, env = "MFD_STORAGE_URL")]
    storage_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let resolver = RootFolderResolver::new(MODULE_NAME);
    let defaults = CompiledDefaults::for_current_platform();

    // Read config before tracing exists; problems are reported once it does
    let config_path = args.config.clone().or_else(|| resolver.config_file_path());
    let (config, config_problem) = match &config_path {
        Some(path) if path.exists() => match TomlConfig::load(path) {
            Ok(config) => (config, None),
            Err(e) => (TomlConfig::default(), Some(e.to_string())),
        },
        Some(path) => (
            TomlConfig::default(),
            Some(format!("Config file {} not found", path.display())),
        ),
        None => (TomlConfig::default(), None),
    };

    init_tracing(&config, &defaults)?;

    info!(
        "Starting MFD Data Visualization (mfd-dv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(problem) = config_problem {
        warn!("{}; using defaults", problem);
    }

    let root_folder = args
        .root_folder
        .clone()
        .or_else(|| config.root_folder.clone())
        .unwrap_or_else(|| resolver.resolve());
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let catalog = FileCatalog::open(&db_path)
        .await
        .with_context(|| format!("Failed to open catalog {}", db_path.display()))?;

    let storage_url = args.storage_url.clone().or(config.storage_url.clone());
    let store: Arc<dyn ObjectStore> = match storage_url {
        Some(url) => {
            info!("Object store: {}", url);
            Arc::new(HttpObjectStore::new(&url).context("Failed to create storage client")?)
        }
        None => {
            let objects = initializer.objects_path();
            info!("Object store: {}", objects.display());
            Arc::new(LocalObjectStore::new(objects))
        }
    };

    let state = AppState::new(catalog, store, config.heatmap);
    let app = build_router(state);

    let port = args.port.or(config.port).unwrap_or(defaults.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("mfd-dv listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level; a configured log file
/// replaces stdout.
fn init_tracing(config: &TomlConfig, defaults: &CompiledDefaults) -> Result<()> {
    let level = if config.logging.level.trim().is_empty() {
        defaults.log_level.clone()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", level)));

    match config.logging.file.as_ref().or(defaults.log_file.as_ref()) {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
