//! The WebSocket server: accept loop and graceful shutdown.

use crate::binding::handle_connection;
use crate::config::ServerConfig;
use crate::error::ServerError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use town_core::TownRegistry;
use tracing::{error, info, warn};

/// The WebSocket server in front of a [`TownRegistry`].
///
/// Owns the TCP accept loop; each accepted socket is handed to
/// [`handle_connection`] on its own task. The registry is shared: the same
/// instance can simultaneously serve whatever administrative surface the
/// embedding application exposes.
#[derive(Debug)]
pub struct TownServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Directory of towns this server fronts
    registry: Arc<TownRegistry>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl TownServer {
    /// Creates a new server fronting `registry`. The server is ready to
    /// start after construction.
    pub fn new(config: ServerConfig, registry: Arc<TownRegistry>) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            config,
            registry,
            shutdown_sender,
        }
    }

    /// The registry this server fronts.
    pub fn registry(&self) -> Arc<TownRegistry> {
        self.registry.clone()
    }

    /// Starts the accept loop and runs until shutdown is requested.
    ///
    /// Connections beyond `max_connections` are refused by dropping the
    /// socket before the WebSocket handshake.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("🚀 Starting town server on {}", self.config.bind_address);

        let listener = tokio::net::TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| {
                ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address))
            })?;

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let active_connections = Arc::new(AtomicUsize::new(0));
        let handshake_timeout = Duration::from_secs(self.config.connection_timeout);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            if active_connections.load(Ordering::Acquire)
                                >= self.config.max_connections
                            {
                                warn!(
                                    "🚦 Refusing connection from {}: at limit of {}",
                                    addr, self.config.max_connections
                                );
                                continue;
                            }
                            active_connections.fetch_add(1, Ordering::AcqRel);

                            let registry = self.registry.clone();
                            let active_connections = active_connections.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(
                                    stream,
                                    addr,
                                    registry,
                                    handshake_timeout,
                                )
                                .await
                                {
                                    error!("Connection error: {:?}", e);
                                }
                                active_connections.fetch_sub(1, Ordering::AcqRel);
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            break;
                        }
                    }
                }
                _ = shutdown_receiver.recv() => {
                    info!("Internal shutdown signal received");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    /// Initiates server shutdown: the accept loop stops; connections already
    /// bound drain on their own as clients disconnect.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }
}
