//! Wire formats for the WebSocket channel.
//!
//! Every frame is a JSON text message. The first frame a client sends must
//! be a [`JoinHandshake`] binding the connection to an existing session;
//! everything after that is a tagged [`ClientMessage`] inbound or a tagged
//! [`ServerMessage`] outbound.

use serde::{Deserialize, Serialize};
use town_core::{ConversationArea, Player, PlayerLocation, SessionToken, TownId};

/// First frame on a fresh connection: which town, and the session token the
/// client was handed when it joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinHandshake {
    pub town_id: TownId,
    pub session_token: SessionToken,
}

/// Messages a client may send after the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// The client's avatar moved; carries the full declared location.
    PlayerMovement(PlayerLocation),
}

/// Events the server pushes to a bound client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    NewPlayer(Player),
    PlayerMoved(Player),
    PlayerDisconnect(Player),
    ConversationAreaUpdated(ConversationArea),
    ConversationAreaDestroyed(ConversationArea),
    /// The town is being torn down; the server closes the socket after this.
    TownClosing,
}
