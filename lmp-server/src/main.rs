//! lmp-server - local media player
//!
//! Serves the player UI, the file/playlist/Bluetooth JSON API and audio
//! streams from one process.

use anyhow::Result;
use clap::Parser;
use lmp_common::config::{CliOverrides, RootFolderInitializer, Settings, TomlConfig};
use lmp_server::bluetooth::SystemRunner;
use lmp_server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lmp-server")]
#[command(about = "Local media player with Bluetooth output", long_about = None)]
#[command(version)]
struct Args {
    /// Root folder holding playlists.json and the local music folder
    #[arg(short, long, env = "LMP_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Music folder to browse (repeatable)
    #[arg(long = "music-dir")]
    music_dirs: Vec<PathBuf>,

    /// Config file path (default: ~/.config/lmp/config.toml)
    #[arg(short, long, env = "LMP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = TomlConfig::load_or_default(args.config.as_deref());
    let settings = Settings::resolve(
        CliOverrides {
            root_folder: args.root_folder,
            bind: args.bind,
            port: args.port,
            music_dirs: args.music_dirs,
            log_level: args.log_level,
        },
        toml,
    );

    init_tracing(&settings.log_level);

    info!(
        "Starting LMP server (lmp-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let initializer = RootFolderInitializer::new(settings.root_folder.clone());
    initializer.ensure_layout()?;
    info!("Root folder: {}", settings.root_folder.display());
    info!("Playlists: {}", settings.playlists_path().display());
    for dir in &settings.music_dirs {
        info!("Music folder: {}", dir.display());
    }

    let state = AppState::new(&settings, Arc::new(SystemRunner::default()));
    let bluetooth = state.bluetooth.clone();
    let app = build_router(state);

    let addr = settings.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("lmp-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Don't leave bluetoothctl discovering after exit
    bluetooth.stop_scan().await;
    info!("lmp-server stopped");
    Ok(())
}
