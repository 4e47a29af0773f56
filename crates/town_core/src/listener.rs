//! Observer interface for town mutations.

use crate::conversation::ConversationArea;
use crate::player::Player;

/// A polymorphic observer registered against one [`TownController`].
///
/// Every controller mutation invokes the matching callback on each currently
/// registered listener, synchronously and in registration order, passing the
/// mutated entity by reference. Entities are live objects: a listener must
/// not assume immutability across callbacks, and must not block (callbacks
/// run while the town's lock is held).
///
/// All callbacks default to no-ops so implementors only override the events
/// they care about.
///
/// [`TownController`]: crate::TownController
pub trait TownListener: Send + Sync {
    /// A new player joined the town.
    fn on_player_joined(&self, _player: &Player) {}

    /// A player's location changed. Fires on every movement, whether or not
    /// an area transition occurred.
    fn on_player_moved(&self, _player: &Player) {}

    /// A player's session was destroyed and the player left the town.
    fn on_player_disconnected(&self, _player: &Player) {}

    /// A conversation area was created or its occupant list changed.
    fn on_conversation_area_updated(&self, _area: &ConversationArea) {}

    /// A conversation area lost its last occupant and was removed.
    fn on_conversation_area_destroyed(&self, _area: &ConversationArea) {}

    /// The town is being torn down; bound channels should close.
    fn on_town_destroyed(&self) {}
}
