//! Conversation areas: labeled spatial regions grouping nearby players.

use crate::geometry::BoundingBox;
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};

/// A named spatial region with a topic and an ordered occupant list.
///
/// The occupant list records join order and is maintained exclusively by the
/// owning [`TownController`](crate::TownController): every id in it belongs
/// to a player whose active conversation label equals this area's label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationArea {
    label: String,
    topic: String,
    bounding_box: BoundingBox,
    #[serde(default)]
    occupants_by_id: Vec<PlayerId>,
}

impl ConversationArea {
    /// Creates an empty area. Validity (non-empty label/topic, no overlap
    /// with existing areas) is checked at the controller when the area is
    /// added to a town, not here.
    pub fn new(
        label: impl Into<String>,
        topic: impl Into<String>,
        bounding_box: BoundingBox,
    ) -> Self {
        Self {
            label: label.into(),
            topic: topic.into(),
            bounding_box,
            occupants_by_id: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Occupant player ids in join order.
    pub fn occupants_by_id(&self) -> &[PlayerId] {
        &self.occupants_by_id
    }

    pub fn is_vacant(&self) -> bool {
        self.occupants_by_id.is_empty()
    }

    pub(crate) fn push_occupant(&mut self, player_id: PlayerId) {
        self.occupants_by_id.push(player_id);
    }

    /// Removes `player_id` from the occupant list, returning false if it was
    /// not present.
    pub(crate) fn remove_occupant(&mut self, player_id: PlayerId) -> bool {
        match self.occupants_by_id.iter().position(|id| *id == player_id) {
            Some(index) => {
                self.occupants_by_id.remove(index);
                true
            }
            None => false,
        }
    }
}
