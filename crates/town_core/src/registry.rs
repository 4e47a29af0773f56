//! Process-wide directory of towns.
//!
//! The registry is an explicit object passed by reference to whatever
//! accepts connections; there is no ambient global. Lookup and creation are
//! safe from any number of concurrent connection tasks, while each town's
//! controller stays single-owner behind its own lock.

use crate::controller::TownController;
use crate::conversation::ConversationArea;
use crate::error::TownError;
use crate::player::Player;
use crate::session::PlayerSession;
use crate::types::{TownId, TownPassword};
use crate::video::VideoTokenProvider;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Public listing entry for one town.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownListing {
    pub friendly_name: String,
    pub town_id: TownId,
    pub occupancy: usize,
    pub capacity: usize,
}

/// Everything a joining client needs: its session (with video credential),
/// its player identity, and a snapshot of the town it joined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownJoinResult {
    pub session: PlayerSession,
    pub player: Player,
    pub friendly_name: String,
    pub is_publicly_listed: bool,
    pub current_players: Vec<Player>,
    pub conversation_areas: Vec<ConversationArea>,
}

/// Directory mapping town ids to their controllers.
pub struct TownRegistry {
    towns: DashMap<TownId, Arc<RwLock<TownController>>>,
    video: Arc<dyn VideoTokenProvider>,
}

impl TownRegistry {
    /// Creates an empty registry using `video` for join credentials.
    pub fn new(video: Arc<dyn VideoTokenProvider>) -> Self {
        Self {
            towns: DashMap::new(),
            video,
        }
    }

    /// Creates a new town, returning its id and the opaque password required
    /// for later updates and deletion.
    pub fn create_town(
        &self,
        friendly_name: impl Into<String>,
        is_publicly_listed: bool,
    ) -> (TownId, TownPassword) {
        let controller = TownController::new(friendly_name, is_publicly_listed);
        let town_id = controller.town_id();
        let password = controller.update_password();
        info!(
            "🏘️ Town '{}' created ({}, public: {})",
            controller.friendly_name(),
            town_id,
            controller.is_publicly_listed()
        );
        self.towns.insert(town_id, Arc::new(RwLock::new(controller)));
        (town_id, password)
    }

    /// Looks up the controller for `town_id`.
    pub fn get(&self, town_id: TownId) -> Option<Arc<RwLock<TownController>>> {
        self.towns.get(&town_id).map(|entry| entry.value().clone())
    }

    pub fn town_count(&self) -> usize {
        self.towns.len()
    }

    /// Lists publicly visible towns with their current occupancy.
    pub async fn list_towns(&self) -> Vec<TownListing> {
        // Collect handles first: awaiting while holding a DashMap shard
        // guard can deadlock against concurrent writers.
        let handles: Vec<Arc<RwLock<TownController>>> =
            self.towns.iter().map(|entry| entry.value().clone()).collect();

        let mut listings = Vec::new();
        for handle in handles {
            let controller = handle.read().await;
            if controller.is_publicly_listed() {
                listings.push(TownListing {
                    friendly_name: controller.friendly_name().to_string(),
                    town_id: controller.town_id(),
                    occupancy: controller.occupancy(),
                    capacity: controller.capacity(),
                });
            }
        }
        listings
    }

    /// Joins `user_name` to a town, issuing a video credential along the way.
    ///
    /// The credential call is awaited while no town lock is held, so other
    /// events for the same town proceed during issuance; the joining player
    /// only becomes visible once the controller registers the session. A
    /// credential failure propagates and leaves the town untouched.
    pub async fn join_town(
        &self,
        town_id: TownId,
        user_name: &str,
    ) -> Result<TownJoinResult, TownError> {
        let town = self.get(town_id).ok_or(TownError::TownNotFound(town_id))?;

        {
            let controller = town.read().await;
            if controller.occupancy() >= controller.capacity() {
                return Err(TownError::AtCapacity);
            }
        }

        let player = Player::new(user_name);
        let video_token = self.video.token_for_town(town_id, player.id()).await?;

        let mut controller = town.write().await;
        let joined = player.clone();
        let session = controller.add_session(player, video_token);
        Ok(TownJoinResult {
            session,
            player: joined,
            friendly_name: controller.friendly_name().to_string(),
            is_publicly_listed: controller.is_publicly_listed(),
            current_players: controller.players().to_vec(),
            conversation_areas: controller.conversation_areas().to_vec(),
        })
    }

    /// Updates a town's friendly name and/or public listing flag. Returns
    /// false for unknown towns or a wrong password.
    pub async fn update_town(
        &self,
        town_id: TownId,
        password: TownPassword,
        friendly_name: Option<String>,
        is_publicly_listed: Option<bool>,
    ) -> bool {
        let Some(town) = self.get(town_id) else {
            return false;
        };
        let mut controller = town.write().await;
        if controller.update_password() != password {
            return false;
        }
        if let Some(name) = friendly_name {
            controller.set_friendly_name(name);
        }
        if let Some(listed) = is_publicly_listed {
            controller.set_publicly_listed(listed);
        }
        true
    }

    /// Deletes a town: removes it from the directory and disconnects every
    /// player. Returns false for unknown towns or a wrong password.
    pub async fn delete_town(&self, town_id: TownId, password: TownPassword) -> bool {
        let Some(town) = self.get(town_id) else {
            return false;
        };
        {
            let controller = town.read().await;
            if controller.update_password() != password {
                return false;
            }
        }
        self.towns.remove(&town_id);
        let mut controller = town.write().await;
        info!("🗑️ Town '{}' ({}) deleted", controller.friendly_name(), town_id);
        controller.disconnect_all_players();
        true
    }

    /// Creates a conversation area in a town, delegating validity checking
    /// to the controller. `Err` only for unknown towns; validation
    /// rejections come back as `Ok(false)`.
    pub async fn create_conversation_area(
        &self,
        town_id: TownId,
        candidate: ConversationArea,
    ) -> Result<bool, TownError> {
        let town = self.get(town_id).ok_or(TownError::TownNotFound(town_id))?;
        let mut controller = town.write().await;
        Ok(controller.add_conversation_area(candidate))
    }
}

impl std::fmt::Debug for TownRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TownRegistry")
            .field("towns", &self.towns.len())
            .finish()
    }
}
