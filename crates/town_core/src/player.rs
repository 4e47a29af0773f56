//! Player entity: identity, location and conversation-area membership.

use crate::conversation::ConversationArea;
use crate::types::{PlayerId, PlayerLocation};
use serde::Serialize;

/// A participant present in one town.
///
/// The back-reference to the player's active conversation area is the area's
/// label, which is unique within a town. It is lookup-capable but never an
/// ownership edge: areas are owned by the town's area list, and the label is
/// cleared whenever the player leaves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    id: PlayerId,
    user_name: String,
    location: PlayerLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_conversation_label: Option<String>,
}

impl Player {
    /// Creates a player with a fresh ID at the spawn location.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(),
            user_name: user_name.into(),
            location: PlayerLocation::spawn(),
            active_conversation_label: None,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn location(&self) -> &PlayerLocation {
        &self.location
    }

    /// Label of the conversation area this player currently occupies, if any.
    pub fn active_conversation_label(&self) -> Option<&str> {
        self.active_conversation_label.as_deref()
    }

    /// Returns true iff the player's coordinates fall inside the area's box.
    ///
    /// Purely geometric; membership itself is governed by the declared label,
    /// not by this predicate.
    pub fn is_within(&self, area: &ConversationArea) -> bool {
        area.bounding_box()
            .contains_point(self.location.x, self.location.y)
    }

    pub(crate) fn set_location(&mut self, location: PlayerLocation) {
        self.location = location;
    }

    pub(crate) fn set_active_conversation(&mut self, label: Option<String>) {
        self.active_conversation_label = label;
    }
}
