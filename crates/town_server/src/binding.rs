//! Connection handling logic for WebSocket clients.
//!
//! Each accepted socket is bound to one previously created player session:
//! the first frame must be a [`JoinHandshake`] naming the town and session
//! token, after which a [`ChannelListener`] forwards town events outward
//! while inbound movement frames are applied to the controller. When the
//! socket closes for any reason the listener is removed and the session
//! destroyed.

use crate::error::ServerError;
use crate::messages::{ClientMessage, JoinHandshake, ServerMessage};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use town_core::{ConversationArea, Player, TownListener, TownRegistry};
use tracing::{debug, error, info, trace, warn};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Town listener that forwards every event to one connection's outbound
/// channel.
///
/// Callbacks run synchronously under the town lock, so each one only clones
/// the entity and queues it; serialization and socket I/O happen in the
/// connection's outgoing task.
pub struct ChannelListener {
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelListener {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { outbound }
    }

    fn push(&self, message: ServerMessage) {
        // A dropped receiver means the socket is already being torn down.
        let _ = self.outbound.send(message);
    }
}

impl TownListener for ChannelListener {
    fn on_player_joined(&self, player: &Player) {
        self.push(ServerMessage::NewPlayer(player.clone()));
    }

    fn on_player_moved(&self, player: &Player) {
        self.push(ServerMessage::PlayerMoved(player.clone()));
    }

    fn on_player_disconnected(&self, player: &Player) {
        self.push(ServerMessage::PlayerDisconnect(player.clone()));
    }

    fn on_conversation_area_updated(&self, area: &ConversationArea) {
        self.push(ServerMessage::ConversationAreaUpdated(area.clone()));
    }

    fn on_conversation_area_destroyed(&self, area: &ConversationArea) {
        self.push(ServerMessage::ConversationAreaDestroyed(area.clone()));
    }

    fn on_town_destroyed(&self) {
        self.push(ServerMessage::TownClosing);
    }
}

/// Handles a single client connection from WebSocket handshake to cleanup.
///
/// # Connection Flow
///
/// 1. Perform the WebSocket handshake
/// 2. Await the join handshake frame (bounded by `handshake_timeout`)
/// 3. Resolve the named town and session token; close on any mismatch
/// 4. Register a [`ChannelListener`] with the town
/// 5. Pump inbound movement frames and outbound town events concurrently
/// 6. On close: unregister the listener and destroy the session
///
/// A `TownClosing` event closes the socket from the server side; the
/// session-destruction in cleanup is then a no-op against the already
/// emptied town.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<TownRegistry>,
    handshake_timeout: Duration,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let ws_sender = Arc::new(tokio::sync::Mutex::new(ws_sender));

    let Some(handshake) = read_handshake(&mut ws_receiver, addr, handshake_timeout).await else {
        close_socket(&ws_sender).await;
        return Ok(());
    };

    let Some(town) = registry.get(handshake.town_id) else {
        warn!("🔒 {} named unknown town {}", addr, handshake.town_id);
        close_socket(&ws_sender).await;
        return Ok(());
    };
    let player_id = {
        let controller = town.read().await;
        match controller.session_by_token(&handshake.session_token) {
            Some(session) => session.player_id(),
            None => {
                warn!(
                    "🔒 {} presented an invalid session token for town {}",
                    addr, handshake.town_id
                );
                drop(controller);
                close_socket(&ws_sender).await;
                return Ok(());
            }
        }
    };

    let (outbound_sender, mut outbound_receiver) = mpsc::unbounded_channel();
    let listener: Arc<dyn TownListener> = Arc::new(ChannelListener::new(outbound_sender));
    town.write().await.add_listener(listener.clone());
    info!(
        "🔗 {} bound to player {} in town {}",
        addr, player_id, handshake.town_id
    );

    // Incoming frames: movement updates applied under the town lock.
    let incoming_task = {
        let town = town.clone();
        let ws_sender = ws_sender.clone();
        async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::PlayerMovement(location)) => {
                                town.write().await.update_player_location(player_id, location);
                            }
                            Err(e) => {
                                trace!("❌ Unparseable frame from {}: {}", addr, e);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("🔌 Client {} requested close", addr);
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        let mut ws_sender = ws_sender.lock().await;
                        let _ = ws_sender.send(Message::Pong(data)).await;
                    }
                    Err(e) => {
                        error!("WebSocket error for connection {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    };

    // Outgoing events: serialized and written in queue order.
    let outgoing_task = {
        let ws_sender = ws_sender.clone();
        async move {
            while let Some(message) = outbound_receiver.recv().await {
                let closing = matches!(message, ServerMessage::TownClosing);
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize outbound event: {}", e);
                        continue;
                    }
                };
                let mut ws_sender = ws_sender.lock().await;
                if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                    error!("Failed to send message to {}: {}", addr, e);
                    break;
                }
                if closing {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = incoming_task => {},
        _ = outgoing_task => {},
    }

    {
        let mut controller = town.write().await;
        controller.remove_listener(&listener);
        controller.destroy_session(&handshake.session_token);
    }
    info!("👋 Connection {} closed", addr);
    Ok(())
}

/// Awaits the first text frame and parses it as a [`JoinHandshake`].
/// Anything else (timeout, close, binary, unparseable JSON) rejects the
/// connection.
async fn read_handshake(
    ws_receiver: &mut WsSource,
    addr: SocketAddr,
    handshake_timeout: Duration,
) -> Option<JoinHandshake> {
    let frame = tokio::time::timeout(handshake_timeout, ws_receiver.next()).await;
    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str(&text) {
            Ok(handshake) => Some(handshake),
            Err(e) => {
                warn!("🔒 Malformed join handshake from {}: {}", addr, e);
                None
            }
        },
        Err(_) => {
            warn!("⏰ {} sent no handshake within {:?}", addr, handshake_timeout);
            None
        }
        _ => {
            warn!("🔒 {} closed or sent a non-text frame before handshaking", addr);
            None
        }
    }
}

async fn close_socket(ws_sender: &Arc<tokio::sync::Mutex<WsSink>>) {
    let mut ws_sender = ws_sender.lock().await;
    let _ = ws_sender.send(Message::Close(None)).await;
}
