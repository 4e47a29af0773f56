//! Server configuration types and defaults.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration for the WebSocket server.
///
/// Contains the network parameters for the accept loop and per-connection
/// handling. Town behavior itself is not configurable here; the engine owns
/// its own constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Seconds a fresh connection may take to send its join handshake
    pub connection_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080"
                .parse()
                .expect("Invalid default bind address"),
            max_connections: 1000,
            connection_timeout: 30,
        }
    }
}
