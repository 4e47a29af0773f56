//! WebSocket edge for the town engine.
//!
//! This crate owns everything network-facing: the TCP accept loop, the
//! per-connection WebSocket lifecycle, the wire message formats, and the
//! channel binding that forwards town events out to connected clients. All
//! town semantics live in `town_core`; nothing here mutates town state
//! except by calling controller methods under the registry's per-town lock.

pub mod binding;
pub mod config;
pub mod error;
pub mod messages;
pub mod server;

pub use binding::{handle_connection, ChannelListener};
pub use config::ServerConfig;
pub use error::ServerError;
pub use messages::{ClientMessage, JoinHandshake, ServerMessage};
pub use server::TownServer;
