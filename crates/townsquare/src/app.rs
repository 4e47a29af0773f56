//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, the town registry, and graceful shutdown.

use crate::{cli::CliArgs, config::AppConfig, logging::display_banner, signals::wait_for_shutdown_signal};
use std::sync::Arc;
use tokio::time::Duration;
use town_core::{LocalTokenIssuer, TownRegistry};
use town_server::TownServer;
use tracing::{error, info, warn};

/// Main application struct.
///
/// Manages the complete lifecycle of the Townsquare server: configuration
/// loading, registry and server initialization, and graceful shutdown
/// handling.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// WebSocket server instance
    server: Arc<TownServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Initialize the town registry and WebSocket server
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let registry = Arc::new(TownRegistry::new(Arc::new(LocalTokenIssuer::new())));
        let server_config = config.to_server_config()?;
        let server = Arc::new(TownServer::new(server_config, registry));

        info!(
            "📂 Config: {} | Bind: {}",
            args.config_path.display(),
            config.server.bind_address
        );

        Ok(Self { config, server })
    }

    /// Runs the application until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Townsquare Server Application");
        self.log_configuration_summary();

        let server = self.server.clone();
        let server_handle = tokio::spawn(async move {
            match server.start().await {
                Ok(()) => {
                    info!("✅ Server completed successfully");
                }
                Err(e) => {
                    error!("❌ Server error: {:?}", e);
                    std::process::exit(1);
                }
            }
        });

        info!("✅ Townsquare Server is now running!");
        info!(
            "🎮 Ready to accept connections on {}",
            self.config.server.bind_address
        );
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        wait_for_shutdown_signal().await?;

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        self.server.shutdown().await?;

        if let Err(e) = tokio::time::timeout(Duration::from_secs(8), server_handle).await {
            warn!("⏰ Server task did not complete within timeout: {:?}", e);
        } else {
            info!("✅ Server task completed gracefully");
        }

        info!("✅ Townsquare Server shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!(
            "  👥 Max connections: {}",
            self.config.server.max_connections
        );
        info!(
            "  ⏱️ Handshake timeout: {}s",
            self.config.server.connection_timeout
        );
    }
}
