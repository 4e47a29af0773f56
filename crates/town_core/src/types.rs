//! Core identifier and location types shared across the engine.
//!
//! Identifiers are UUID newtypes: cheap to copy, compared by equality, and
//! unguessable where they double as capabilities (session tokens and town
//! update passwords are never parsed, only matched).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a player within the process.
///
/// Generated with UUID v4, which provides sufficient entropy to avoid
/// collisions in practical use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a town.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TownId(pub Uuid);

impl TownId {
    /// Creates a new random town ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TownId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque session token binding one connected participant to one player.
///
/// A capability value: whoever presents it owns the session. Compared by
/// equality only, never parsed or interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub Uuid);

impl SessionToken {
    /// Issues a fresh unguessable token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque password required to update or delete a town.
///
/// Issued once at town creation and returned to the creator; like
/// [`SessionToken`] it is a capability compared by equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TownPassword(pub Uuid);

impl TownPassword {
    /// Issues a fresh unguessable password.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TownPassword {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TownPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Facing direction reported by clients alongside movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Front,
    Back,
    Left,
    Right,
}

/// A player's position on the town's 2D plane.
///
/// `conversation_label`, when present, is the client's declaration of which
/// conversation area it is inside. The engine trusts this label verbatim; it
/// is never re-derived from the coordinates (see
/// [`TownController::update_player_location`](crate::TownController::update_player_location)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLocation {
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
    pub moving: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_label: Option<String>,
}

impl PlayerLocation {
    /// Spawn location for newly joined players.
    pub fn spawn() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: Rotation::Front,
            moving: false,
            conversation_label: None,
        }
    }
}
