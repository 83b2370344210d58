//! Route Server binary.
//!
//! Loads the settings file, wires the reactive configuration pipeline to the
//! listener lifecycle manager, and runs until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use route_server::config::loader::load_settings;
use route_server::config::watcher::SettingsWatcher;
use route_server::config::{spawn_assembler, Settings, SettingsStore};
use route_server::lifecycle::ServerManager;
use route_server::ServerDeps;

#[derive(Parser, Debug)]
#[command(name = "route-server", about = "User-declared HTTP routes behind one restartable listener")]
struct Args {
    /// Path to the TOML settings file.
    #[arg(long, default_value = "route-server.toml")]
    config: PathBuf,

    /// Override the configured listener port.
    #[arg(long)]
    port: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("route-server v0.1.0 starting");

    let mut settings = match load_settings(&args.config) {
        Ok(settings) => {
            tracing::info!(path = %args.config.display(), "Settings loaded");
            settings
        }
        Err(e) => {
            tracing::warn!(path = %args.config.display(), error = %e, "Settings unavailable; using defaults");
            Settings::default()
        }
    };
    if let Some(port) = args.port {
        settings.port = port;
    }

    let store = Arc::new(SettingsStore::new(settings));
    let mut config_rx = spawn_assembler(&store);

    // The watcher handle must stay alive for reload events to keep flowing.
    let _watcher = SettingsWatcher::new(&args.config, Arc::clone(&store)).run()?;

    let manager = Arc::new(ServerManager::new(ServerDeps::default()));
    let initial = config_rx.borrow_and_update().clone();
    manager.start(initial).await?;
    manager.spawn_config_watcher(config_rx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received; shutting down");
    manager.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
