//! Player sessions: the live binding between a connection and a player.

use crate::types::{PlayerId, SessionToken};
use serde::Serialize;

/// Binds one connected participant to one player for the lifetime of their
/// connection.
///
/// The token is the only handle a client ever holds on its session; the
/// video token is the credential issued by the external provider at join
/// time, forwarded to the client so it can attach to the town's media room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSession {
    token: SessionToken,
    player_id: PlayerId,
    video_token: String,
}

impl PlayerSession {
    /// Creates a session for `player_id` with a freshly issued token.
    pub fn new(player_id: PlayerId, video_token: String) -> Self {
        Self {
            token: SessionToken::new(),
            player_id,
            video_token,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn video_token(&self) -> &str {
        &self.video_token
    }
}
