//! Video Song Muxer - HTTP entry point
//!
//! This is the service entry point. It handles:
//! - Configuration loading
//! - Directory creation
//! - Application-level logging initialization
//! - Serving the router until Ctrl-C

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use vsm_core::config::ConfigManager;
use vsm_core::logging::init_tracing_with_file;
use vsm_core::mux::FfmpegBackend;
use vsm_core::orchestrator::BatchProcessor;

mod app;
mod assets;
mod error;
mod handlers;
mod intake;

use app::AppState;

/// Environment variable overriding the config file location.
const CONFIG_ENV: &str = "VSM_CONFIG";

/// Config path: $VSM_CONFIG, else .config/settings.toml (relative to the working directory)
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".config").join("settings.toml"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (needed for logs directory path)
    let config_path = config_path();
    let mut config_manager = ConfigManager::new(&config_path);

    if let Err(e) = config_manager.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }

    // Ensure all configured directories exist
    if let Err(e) = config_manager.ensure_dirs_exist() {
        eprintln!("Warning: Failed to create directories: {}", e);
    }

    let logs_dir = config_manager.logs_folder();
    let _log_guard = init_tracing_with_file(config_manager.settings().logging.level, &logs_dir);

    tracing::info!("Video Song Muxer starting");
    tracing::info!("Config: {}", config_path.display());
    tracing::info!("Core version: {}", vsm_core::version());

    let settings = Arc::new(config_manager.into_settings());
    tracing::info!(
        "Tools: ffprobe={}, ffmpeg={}; outputs in {}",
        settings.tools.ffprobe_path,
        settings.tools.ffmpeg_path,
        settings.paths.output_dir().display()
    );

    let backend = Arc::new(FfmpegBackend::from_settings(&settings));
    let processor = Arc::new(BatchProcessor::from_settings(&settings, backend));
    let shutdown = CancellationToken::new();
    let state = AppState::new(settings.clone(), processor, shutdown.clone());

    let addr = settings
        .server
        .socket_addr()
        .context("invalid server host/port")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C and cancel in-flight batches.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Keep serving rather than stopping immediately
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, cancelling running jobs");
    shutdown.cancel();
}
