//! # Town Core - State, Session & Conversation-Area Engine
//!
//! This crate owns the authoritative state of every town: the players moving
//! around its 2D plane, the sessions binding connected participants to those
//! players, the conversation areas grouping players by spatial region, and
//! the listener fan-out that drives real-time updates to connected clients.
//!
//! ## Architecture
//!
//! * **[`TownController`]** - owns all mutable state for one town and exposes
//!   every mutating operation. Nothing outside the controller splices its
//!   collections.
//! * **[`TownRegistry`]** - process-wide directory of towns, created
//!   explicitly and passed by reference to whatever accepts connections.
//! * **[`TownListener`]** - polymorphic observer notified synchronously, in
//!   registration order, of every town mutation.
//! * **[`VideoTokenProvider`]** - the external credential-issuance
//!   collaborator consulted when a player joins.
//!
//! The crate performs no I/O. Transport concerns (WebSocket framing, message
//! routing) live in `town_server`; this crate only hands live entity
//! references to registered listeners.
//!
//! ## Concurrency
//!
//! A `TownController` has no internal locking: exclusive access is enforced
//! by the per-town `tokio::sync::RwLock` held in the registry, so every
//! controller method is atomic from an observer's point of view. The one
//! suspension point in the join path (credential issuance) happens while no
//! town lock is held.

pub use controller::TownController;
pub use conversation::ConversationArea;
pub use error::{TownError, VideoError};
pub use geometry::BoundingBox;
pub use listener::TownListener;
pub use player::Player;
pub use registry::{TownJoinResult, TownListing, TownRegistry};
pub use session::PlayerSession;
pub use types::{PlayerId, PlayerLocation, Rotation, SessionToken, TownId, TownPassword};
pub use video::{LocalTokenIssuer, VideoTokenProvider};

pub mod controller;
pub mod conversation;
pub mod error;
pub mod geometry;
pub mod listener;
pub mod player;
pub mod registry;
pub mod session;
pub mod types;
pub mod video;

#[cfg(test)]
mod tests;
