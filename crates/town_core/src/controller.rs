//! The town controller: authoritative owner of one town's state.
//!
//! All mutation of players, sessions, conversation areas and listeners goes
//! through methods on [`TownController`]. The controller has no internal
//! locking; callers serialize access through the per-town lock held by the
//! [`TownRegistry`](crate::TownRegistry), which makes every method here
//! atomic from an external observer's point of view.

use crate::conversation::ConversationArea;
use crate::listener::TownListener;
use crate::player::Player;
use crate::session::PlayerSession;
use crate::types::{PlayerId, PlayerLocation, SessionToken, TownId, TownPassword};
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of concurrent sessions per town.
pub const DEFAULT_CAPACITY: usize = 50;

/// Owns the authoritative set of players, sessions, conversation areas and
/// registered listeners for one town.
pub struct TownController {
    town_id: TownId,
    friendly_name: String,
    is_publicly_listed: bool,
    update_password: TownPassword,
    capacity: usize,
    players: Vec<Player>,
    sessions: Vec<PlayerSession>,
    conversation_areas: Vec<ConversationArea>,
    listeners: Vec<Arc<dyn TownListener>>,
}

impl TownController {
    /// Creates an empty town with a fresh id and update password.
    pub fn new(friendly_name: impl Into<String>, is_publicly_listed: bool) -> Self {
        Self {
            town_id: TownId::new(),
            friendly_name: friendly_name.into(),
            is_publicly_listed,
            update_password: TownPassword::new(),
            capacity: DEFAULT_CAPACITY,
            players: Vec::new(),
            sessions: Vec::new(),
            conversation_areas: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn town_id(&self) -> TownId {
        self.town_id
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn set_friendly_name(&mut self, friendly_name: impl Into<String>) {
        self.friendly_name = friendly_name.into();
    }

    pub fn is_publicly_listed(&self) -> bool {
        self.is_publicly_listed
    }

    pub fn set_publicly_listed(&mut self, listed: bool) {
        self.is_publicly_listed = listed;
    }

    pub(crate) fn update_password(&self) -> TownPassword {
        self.update_password
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live sessions in this town.
    pub fn occupancy(&self) -> usize {
        self.sessions.len()
    }

    /// Players currently in the town, in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Conversation areas in creation order.
    pub fn conversation_areas(&self) -> &[ConversationArea] {
        &self.conversation_areas
    }

    pub fn player_by_id(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == player_id)
    }

    /// Resolves a session token to its live session, if any.
    pub fn session_by_token(&self, token: &SessionToken) -> Option<&PlayerSession> {
        self.sessions.iter().find(|s| s.token() == *token)
    }

    // ------------------------------------------------------------------
    // Listener registration
    // ------------------------------------------------------------------

    /// Registers a listener. Fan-out order is registration order.
    pub fn add_listener(&mut self, listener: Arc<dyn TownListener>) {
        self.listeners.push(listener);
    }

    /// Unregisters a listener by pointer identity. Notifications already in
    /// flight are unaffected; all future notifications are suppressed.
    pub fn remove_listener(&mut self, listener: &Arc<dyn TownListener>) {
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Snapshot of the current registrants, taken at the start of each
    /// fan-out so that add/remove during iteration cannot skew delivery.
    fn listener_snapshot(&self) -> Vec<Arc<dyn TownListener>> {
        self.listeners.clone()
    }

    // ------------------------------------------------------------------
    // Session & player lifecycle
    // ------------------------------------------------------------------

    /// Registers a player whose video credential has already been issued,
    /// constructs the session bound to it, and notifies `on_player_joined`.
    ///
    /// The credential call itself is awaited by the caller *before* taking
    /// the town lock (see [`TownRegistry::join_town`]), so the player only
    /// becomes visible to listeners and occupant lists here.
    ///
    /// [`TownRegistry::join_town`]: crate::TownRegistry::join_town
    pub fn add_session(&mut self, player: Player, video_token: String) -> PlayerSession {
        let session = PlayerSession::new(player.id(), video_token);
        info!(
            "👋 Player {} ({}) joined town {}",
            player.user_name(),
            player.id(),
            self.town_id
        );
        self.players.push(player);
        self.sessions.push(session.clone());
        if let Some(player) = self.players.last() {
            for listener in self.listener_snapshot() {
                listener.on_player_joined(player);
            }
        }
        session
    }

    /// Destroys the session identified by `token`, removing its bound player
    /// from the town and from any conversation area it occupies.
    ///
    /// Unknown tokens are a silent no-op: the channel may race its own close
    /// against an administrative town teardown.
    pub fn destroy_session(&mut self, token: &SessionToken) {
        let Some(index) = self.sessions.iter().position(|s| s.token() == *token) else {
            return;
        };
        let session = self.sessions.remove(index);
        let Some(player_index) = self
            .players
            .iter()
            .position(|p| p.id() == session.player_id())
        else {
            return;
        };
        let mut player = self.players.remove(player_index);

        if let Some(label) = player.active_conversation_label().map(str::to_string) {
            player.set_active_conversation(None);
            self.vacate_area(&label, player.id());
        }

        info!(
            "❌ Player {} ({}) left town {}",
            player.user_name(),
            player.id(),
            self.town_id
        );
        for listener in self.listener_snapshot() {
            listener.on_player_disconnected(&player);
        }
    }

    /// Notifies every listener that the town is being destroyed. Channel
    /// bindings react by closing their sockets; this is the terminal
    /// operation before the registry drops the town.
    pub fn disconnect_all_players(&mut self) {
        info!(
            "🛑 Disconnecting all {} player(s) from town {}",
            self.players.len(),
            self.town_id
        );
        for listener in self.listener_snapshot() {
            listener.on_town_destroyed();
        }
    }

    // ------------------------------------------------------------------
    // Conversation areas
    // ------------------------------------------------------------------

    /// Adds a conversation area to the town if it is valid.
    ///
    /// Rejections (in evaluation order: empty topic, empty label, duplicate
    /// label, overlapping bounding box) return false with no mutation and no
    /// notification. On success the area is appended to the town's list and
    /// `on_conversation_area_updated` fires for every listener.
    pub fn add_conversation_area(&mut self, candidate: ConversationArea) -> bool {
        if candidate.topic().is_empty() {
            return false;
        }
        if candidate.label().is_empty() {
            return false;
        }
        if self
            .conversation_areas
            .iter()
            .any(|area| area.label() == candidate.label())
        {
            return false;
        }
        if self
            .conversation_areas
            .iter()
            .any(|area| area.bounding_box().overlaps(candidate.bounding_box()))
        {
            return false;
        }

        info!(
            "💬 Conversation area '{}' (topic '{}') created in town {}",
            candidate.label(),
            candidate.topic(),
            self.town_id
        );
        self.conversation_areas.push(candidate);
        let listeners = self.listener_snapshot();
        if let Some(area) = self.conversation_areas.last() {
            for listener in &listeners {
                listener.on_conversation_area_updated(area);
            }
        }
        true
    }

    /// Removes a player from a conversation area's occupant list, destroying
    /// the area if it becomes empty. Silent no-op (returns false) when the
    /// player is not actually an occupant.
    pub fn remove_player_from_conversation_area(
        &mut self,
        player_id: PlayerId,
        label: &str,
    ) -> bool {
        if !self.vacate_area(label, player_id) {
            return false;
        }
        if let Some(index) = self.players.iter().position(|p| p.id() == player_id) {
            if self.players[index].active_conversation_label() == Some(label) {
                self.players[index].set_active_conversation(None);
            }
        }
        true
    }

    /// Shared removal sequence: drop the occupant, then either destroy the
    /// now-empty area (firing `on_conversation_area_destroyed`) or notify the
    /// remaining occupancy change (`on_conversation_area_updated`).
    fn vacate_area(&mut self, label: &str, player_id: PlayerId) -> bool {
        let Some(index) = self
            .conversation_areas
            .iter()
            .position(|area| area.label() == label)
        else {
            return false;
        };
        if !self.conversation_areas[index].remove_occupant(player_id) {
            return false;
        }

        let listeners = self.listener_snapshot();
        if self.conversation_areas[index].is_vacant() {
            let area = self.conversation_areas.remove(index);
            debug!(
                "💥 Conversation area '{}' destroyed in town {}",
                area.label(),
                self.town_id
            );
            for listener in &listeners {
                listener.on_conversation_area_destroyed(&area);
            }
        } else {
            let area = &self.conversation_areas[index];
            for listener in &listeners {
                listener.on_conversation_area_updated(area);
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    /// Applies a location update for one player, maintaining conversation
    /// area membership along the way.
    ///
    /// The declared `conversation_label` is trusted verbatim: if it names a
    /// known area the player is placed in that area even when the
    /// coordinates fall outside its box, and containment is never recomputed
    /// from x/y. A label that resolves to no known area is treated as
    /// "no area".
    ///
    /// Area transitions fire `on_conversation_area_updated` (or
    /// `on_conversation_area_destroyed` when the player was the last
    /// occupant of the area it left); movement within the same area fires
    /// neither. `on_player_moved` fires unconditionally, last.
    ///
    /// Unknown player ids are a silent no-op: the session may already have
    /// been destroyed by a racing disconnect.
    pub fn update_player_location(&mut self, player_id: PlayerId, location: PlayerLocation) {
        let Some(player_index) = self.players.iter().position(|p| p.id() == player_id) else {
            return;
        };

        let new_label = location.conversation_label.as_ref().and_then(|label| {
            self.conversation_areas
                .iter()
                .find(|area| area.label() == label.as_str())
                .map(|area| area.label().to_string())
        });
        let old_label = self.players[player_index]
            .active_conversation_label()
            .map(str::to_string);

        self.players[player_index].set_location(location);

        if old_label != new_label {
            if let Some(old) = &old_label {
                self.players[player_index].set_active_conversation(None);
                self.vacate_area(old, player_id);
            }
            if let Some(new) = new_label {
                // Positions may shift when vacate_area destroys an area, so
                // re-find the target by label.
                if let Some(area_index) = self
                    .conversation_areas
                    .iter()
                    .position(|area| area.label() == new)
                {
                    self.conversation_areas[area_index].push_occupant(player_id);
                    self.players[player_index].set_active_conversation(Some(new));
                    let listeners = self.listener_snapshot();
                    let area = &self.conversation_areas[area_index];
                    for listener in &listeners {
                        listener.on_conversation_area_updated(area);
                    }
                }
            }
        }

        let listeners = self.listener_snapshot();
        let player = &self.players[player_index];
        for listener in &listeners {
            listener.on_player_moved(player);
        }
    }
}

impl std::fmt::Debug for TownController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TownController")
            .field("town_id", &self.town_id)
            .field("friendly_name", &self.friendly_name)
            .field("is_publicly_listed", &self.is_publicly_listed)
            .field("players", &self.players.len())
            .field("sessions", &self.sessions.len())
            .field("conversation_areas", &self.conversation_areas.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
