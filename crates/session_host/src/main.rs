//! Main application entry point for the session host.
//!
//! Loads configuration, sets up logging, and runs a [`SessionServer`] backed by
//! a [`GameBridge`] until the process is asked to stop.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{anyhow, Result};
use cli::CliArgs;
use config::AppConfig;
use session_server::{GameBridge, SessionServer};
use std::sync::Arc;
use tracing::{error, info};

/// Main application struct.
pub struct Application {
    config: AppConfig,
    server: SessionServer,
}

impl Application {
    /// Loads and validates the configuration and builds an idle server.
    pub async fn new(args: CliArgs) -> Result<Self> {
        // Load configuration first (before logging setup)
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_overrides(&args)?;

        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        logging::setup_logging(&config.logging)?;
        display_banner();

        let server_config = config.to_server_config()?;
        let bridge = GameBridge::with_max_line_length(server_config.max_frame_length);
        let server = SessionServer::new(server_config, Arc::new(bridge));

        info!("📂 Config: {}", args.config_path.display());
        Ok(Self { config, server })
    }

    /// Runs the server until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let settings = &self.config.server;
        info!("📋 Configuration Summary:");
        info!("  🌐 Host: {}", settings.host);
        info!("  🎲 Player port: {}", settings.player_port);
        info!("  🎮 Game port: {}", settings.game_port);
        info!("  ✂️ Framing: {:?}", settings.framing);

        self.server
            .start(settings.player_port, settings.game_port)
            .await?;

        info!("✅ Session host is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        signals::wait_for_shutdown().await?;

        info!("🛑 Shutdown signal received, initiating graceful shutdown...");
        self.server.close().await?;
        info!("👋 Session host shutdown complete");
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// Display startup banner using proper logging
fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔══════════════════════════════════════════╗");
    info!("║             🎲 SESSION HOST 🎲            ║");
    info!("║                  v{:<8}               ║", version);
    info!("║                                          ║");
    info!("║  Player registration and move routing   ║");
    info!("╚══════════════════════════════════════════╝");
}
