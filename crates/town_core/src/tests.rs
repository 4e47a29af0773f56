//! Scenario tests for the town engine: conversation-area validity, the
//! movement state machine, session lifecycle, and listener fan-out.

use crate::controller::{TownController, DEFAULT_CAPACITY};
use crate::conversation::ConversationArea;
use crate::error::{TownError, VideoError};
use crate::geometry::BoundingBox;
use crate::listener::TownListener;
use crate::player::Player;
use crate::registry::TownRegistry;
use crate::types::{PlayerId, PlayerLocation, Rotation, SessionToken, TownId};
use crate::video::{LocalTokenIssuer, VideoTokenProvider};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One observed listener callback, reduced to comparable data.
#[derive(Debug, Clone, PartialEq)]
enum Observed {
    PlayerJoined(PlayerId),
    PlayerMoved(PlayerId),
    PlayerDisconnected(PlayerId),
    AreaUpdated(String, Vec<PlayerId>),
    AreaDestroyed(String),
    TownDestroyed,
}

/// Test double recording every callback in delivery order.
#[derive(Default)]
struct RecordingListener {
    observed: Mutex<Vec<Observed>>,
}

impl RecordingListener {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn drain(&self) -> Vec<Observed> {
        std::mem::take(&mut *self.observed.lock().unwrap())
    }

    fn record(&self, event: Observed) {
        self.observed.lock().unwrap().push(event);
    }
}

impl TownListener for RecordingListener {
    fn on_player_joined(&self, player: &Player) {
        self.record(Observed::PlayerJoined(player.id()));
    }

    fn on_player_moved(&self, player: &Player) {
        self.record(Observed::PlayerMoved(player.id()));
    }

    fn on_player_disconnected(&self, player: &Player) {
        self.record(Observed::PlayerDisconnected(player.id()));
    }

    fn on_conversation_area_updated(&self, area: &ConversationArea) {
        self.record(Observed::AreaUpdated(
            area.label().to_string(),
            area.occupants_by_id().to_vec(),
        ));
    }

    fn on_conversation_area_destroyed(&self, area: &ConversationArea) {
        self.record(Observed::AreaDestroyed(area.label().to_string()));
    }

    fn on_town_destroyed(&self) {
        self.record(Observed::TownDestroyed);
    }
}

/// Credential provider that always fails, for join-failure paths.
struct FailingProvider;

#[async_trait]
impl VideoTokenProvider for FailingProvider {
    async fn token_for_town(
        &self,
        _town_id: TownId,
        _player_id: PlayerId,
    ) -> Result<String, VideoError> {
        Err(VideoError::Issuance("provider unavailable".to_string()))
    }
}

fn area(label: &str, topic: &str, x: f64, y: f64, w: f64, h: f64) -> ConversationArea {
    ConversationArea::new(label, topic, BoundingBox::new(x, y, w, h))
}

fn at(x: f64, y: f64, label: Option<&str>) -> PlayerLocation {
    PlayerLocation {
        x,
        y,
        rotation: Rotation::Front,
        moving: true,
        conversation_label: label.map(str::to_string),
    }
}

fn join(controller: &mut TownController, name: &str) -> (PlayerId, SessionToken) {
    let player = Player::new(name);
    let id = player.id();
    let session = controller.add_session(player, "test-video-token".to_string());
    (id, session.token())
}

// ----------------------------------------------------------------------
// Conversation area validity
// ----------------------------------------------------------------------

#[test]
fn test_overlapping_area_rejected_leaving_list_unchanged() {
    let mut town = TownController::new("Test Town", true);

    assert!(town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0)));
    assert!(town.add_conversation_area(area("L2", "T2", 40.0, 40.0, 5.0, 5.0)));
    assert!(!town.add_conversation_area(area("L3", "T3", 10.0, 10.0, 5.0, 5.0)));

    let labels: Vec<&str> = town.conversation_areas().iter().map(|a| a.label()).collect();
    assert_eq!(labels, vec!["L1", "L2"]);
}

#[test]
fn test_boundary_touching_area_rejected() {
    let mut town = TownController::new("Test Town", true);
    assert!(town.add_conversation_area(area("L1", "T1", 0.0, 0.0, 10.0, 10.0)));
    // Shares an edge with L1; touching counts as overlap.
    assert!(!town.add_conversation_area(area("L2", "T2", 10.0, 0.0, 10.0, 10.0)));
    assert_eq!(town.conversation_areas().len(), 1);
}

#[test]
fn test_duplicate_label_rejected_regardless_of_placement() {
    let mut town = TownController::new("Test Town", true);
    assert!(town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0)));
    assert!(!town.add_conversation_area(area("L1", "Other topic", 500.0, 500.0, 5.0, 5.0)));
    assert_eq!(town.conversation_areas().len(), 1);
}

#[test]
fn test_empty_topic_or_label_rejected_without_notification() {
    let mut town = TownController::new("Test Town", true);
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    assert!(!town.add_conversation_area(area("L1", "", 10.0, 10.0, 5.0, 5.0)));
    assert!(!town.add_conversation_area(area("", "T1", 10.0, 10.0, 5.0, 5.0)));

    assert!(town.conversation_areas().is_empty());
    assert!(listener.drain().is_empty());
}

#[test]
fn test_successful_creation_notifies_once() {
    let mut town = TownController::new("Test Town", true);
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    assert!(town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0)));
    assert_eq!(
        listener.drain(),
        vec![Observed::AreaUpdated("L1".to_string(), vec![])]
    );
}

// ----------------------------------------------------------------------
// Movement state machine
// ----------------------------------------------------------------------

#[test]
fn test_join_area_then_leave_destroys_it() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (player, _) = join(&mut town, "alice");
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    town.update_player_location(player, at(10.0, 10.0, Some("L1")));
    assert_eq!(
        town.player_by_id(player).unwrap().active_conversation_label(),
        Some("L1")
    );
    assert_eq!(town.conversation_areas()[0].occupants_by_id(), &[player]);
    assert_eq!(
        listener.drain(),
        vec![
            Observed::AreaUpdated("L1".to_string(), vec![player]),
            Observed::PlayerMoved(player),
        ]
    );

    // Sole occupant leaves: the area goes with them.
    town.update_player_location(player, at(50.0, 50.0, None));
    assert!(town
        .player_by_id(player)
        .unwrap()
        .active_conversation_label()
        .is_none());
    assert!(town.conversation_areas().is_empty());
    assert_eq!(
        listener.drain(),
        vec![
            Observed::AreaDestroyed("L1".to_string()),
            Observed::PlayerMoved(player),
        ]
    );
}

#[test]
fn test_fresh_empty_area_persists_until_occupied() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (player, _) = join(&mut town, "alice");

    // Movement that never touches L1 must not disturb it.
    town.update_player_location(player, at(100.0, 100.0, None));
    town.update_player_location(player, at(101.0, 100.0, None));
    assert_eq!(town.conversation_areas().len(), 1);
    assert!(town.conversation_areas()[0].is_vacant());
}

#[test]
fn test_same_area_move_fires_only_player_moved() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (player, _) = join(&mut town, "alice");
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    town.update_player_location(player, at(9.0, 9.0, Some("L1")));
    town.update_player_location(player, at(11.0, 11.0, Some("L1")));

    let observed = listener.drain();
    let moved = observed
        .iter()
        .filter(|o| matches!(o, Observed::PlayerMoved(_)))
        .count();
    let updated = observed
        .iter()
        .filter(|o| matches!(o, Observed::AreaUpdated(_, _)))
        .count();
    assert_eq!(moved, 2);
    assert_eq!(updated, 1);
}

#[test]
fn test_move_with_no_area_fires_only_player_moved() {
    let mut town = TownController::new("Test Town", true);
    let (player, _) = join(&mut town, "alice");
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    town.update_player_location(player, at(1.0, 2.0, None));
    assert_eq!(listener.drain(), vec![Observed::PlayerMoved(player)]);
}

#[test]
fn test_declared_label_trusted_over_coordinates() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (player, _) = join(&mut town, "alice");

    // Coordinates are nowhere near L1's box; the label still wins.
    town.update_player_location(player, at(900.0, 900.0, Some("L1")));
    assert_eq!(
        town.player_by_id(player).unwrap().active_conversation_label(),
        Some("L1")
    );
    assert_eq!(town.conversation_areas()[0].occupants_by_id(), &[player]);
}

#[test]
fn test_unknown_label_resolves_to_no_area() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (player, _) = join(&mut town, "alice");

    town.update_player_location(player, at(10.0, 10.0, Some("Nowhere")));
    assert!(town
        .player_by_id(player)
        .unwrap()
        .active_conversation_label()
        .is_none());
    assert!(town.conversation_areas()[0].is_vacant());
}

#[test]
fn test_transition_between_areas() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    town.add_conversation_area(area("L2", "T2", 40.0, 40.0, 5.0, 5.0));
    let (alice, _) = join(&mut town, "alice");
    let (bob, _) = join(&mut town, "bob");

    town.update_player_location(alice, at(10.0, 10.0, Some("L1")));
    town.update_player_location(bob, at(10.0, 10.0, Some("L1")));

    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    // Alice hops from L1 (leaving Bob behind) into L2.
    town.update_player_location(alice, at(40.0, 40.0, Some("L2")));
    assert_eq!(
        listener.drain(),
        vec![
            Observed::AreaUpdated("L1".to_string(), vec![bob]),
            Observed::AreaUpdated("L2".to_string(), vec![alice]),
            Observed::PlayerMoved(alice),
        ]
    );
}

#[test]
fn test_occupancy_invariant_and_join_order() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (alice, _) = join(&mut town, "alice");
    let (bob, _) = join(&mut town, "bob");
    let (carol, _) = join(&mut town, "carol");

    town.update_player_location(bob, at(10.0, 10.0, Some("L1")));
    town.update_player_location(alice, at(10.0, 10.0, Some("L1")));
    town.update_player_location(carol, at(10.0, 10.0, Some("L1")));
    town.update_player_location(alice, at(0.0, 0.0, None));

    let occupants = town.conversation_areas()[0].occupants_by_id().to_vec();
    assert_eq!(occupants, vec![bob, carol]);

    for player in town.players() {
        let in_list = occupants.contains(&player.id());
        let claims_area = player.active_conversation_label() == Some("L1");
        assert_eq!(in_list, claims_area, "player {}", player.user_name());
    }
}

#[test]
fn test_unknown_player_update_is_noop() {
    let mut town = TownController::new("Test Town", true);
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    town.update_player_location(PlayerId::new(), at(1.0, 1.0, None));
    assert!(listener.drain().is_empty());
}

// ----------------------------------------------------------------------
// Explicit removal
// ----------------------------------------------------------------------

#[test]
fn test_remove_player_from_area_noop_when_not_occupant() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (player, _) = join(&mut town, "alice");
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    assert!(!town.remove_player_from_conversation_area(player, "L1"));
    assert!(!town.remove_player_from_conversation_area(player, "Nowhere"));
    assert!(listener.drain().is_empty());
    assert_eq!(town.conversation_areas().len(), 1);
}

#[test]
fn test_remove_last_occupant_destroys_area() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (player, _) = join(&mut town, "alice");
    town.update_player_location(player, at(10.0, 10.0, Some("L1")));

    let listener = RecordingListener::new();
    town.add_listener(listener.clone());
    assert!(town.remove_player_from_conversation_area(player, "L1"));

    assert!(town.conversation_areas().is_empty());
    assert!(town
        .player_by_id(player)
        .unwrap()
        .active_conversation_label()
        .is_none());
    assert_eq!(listener.drain(), vec![Observed::AreaDestroyed("L1".to_string())]);
}

// ----------------------------------------------------------------------
// Session lifecycle
// ----------------------------------------------------------------------

#[test]
fn test_destroy_session_removes_player_and_notifies() {
    let mut town = TownController::new("Test Town", true);
    let (player, token) = join(&mut town, "alice");
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    town.destroy_session(&token);
    assert!(town.player_by_id(player).is_none());
    assert!(town.session_by_token(&token).is_none());
    assert_eq!(town.occupancy(), 0);
    assert_eq!(listener.drain(), vec![Observed::PlayerDisconnected(player)]);
}

#[test]
fn test_destroy_session_with_co_occupant_updates_not_destroys() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (alice, alice_token) = join(&mut town, "alice");
    let (bob, _) = join(&mut town, "bob");
    town.update_player_location(alice, at(10.0, 10.0, Some("L1")));
    town.update_player_location(bob, at(10.0, 10.0, Some("L1")));

    let listener = RecordingListener::new();
    town.add_listener(listener.clone());
    town.destroy_session(&alice_token);

    assert_eq!(town.conversation_areas()[0].occupants_by_id(), &[bob]);
    assert_eq!(
        listener.drain(),
        vec![
            Observed::AreaUpdated("L1".to_string(), vec![bob]),
            Observed::PlayerDisconnected(alice),
        ]
    );
}

#[test]
fn test_destroy_session_of_sole_occupant_destroys_area() {
    let mut town = TownController::new("Test Town", true);
    town.add_conversation_area(area("L1", "T1", 10.0, 10.0, 5.0, 5.0));
    let (alice, token) = join(&mut town, "alice");
    town.update_player_location(alice, at(10.0, 10.0, Some("L1")));

    town.destroy_session(&token);
    assert!(town.conversation_areas().is_empty());
}

#[test]
fn test_destroy_unknown_session_is_noop() {
    let mut town = TownController::new("Test Town", true);
    let (_, _) = join(&mut town, "alice");
    let listener = RecordingListener::new();
    town.add_listener(listener.clone());

    town.destroy_session(&SessionToken::new());
    assert_eq!(town.occupancy(), 1);
    assert!(listener.drain().is_empty());
}

#[test]
fn test_disconnect_all_players_notifies_every_listener() {
    let mut town = TownController::new("Test Town", true);
    let first = RecordingListener::new();
    let second = RecordingListener::new();
    town.add_listener(first.clone());
    town.add_listener(second.clone());

    town.disconnect_all_players();
    assert_eq!(first.drain(), vec![Observed::TownDestroyed]);
    assert_eq!(second.drain(), vec![Observed::TownDestroyed]);
}

#[test]
fn test_removed_listener_receives_nothing_further() {
    let mut town = TownController::new("Test Town", true);
    let listener = RecordingListener::new();
    let as_dyn: Arc<dyn TownListener> = listener.clone();
    town.add_listener(as_dyn.clone());
    let (player, _) = join(&mut town, "alice");
    assert_eq!(listener.drain(), vec![Observed::PlayerJoined(player)]);

    town.remove_listener(&as_dyn);
    town.update_player_location(player, at(5.0, 5.0, None));
    assert!(listener.drain().is_empty());
}

// ----------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------

fn registry() -> TownRegistry {
    TownRegistry::new(Arc::new(LocalTokenIssuer::new()))
}

#[tokio::test]
async fn test_join_returns_session_and_town_snapshot() {
    let registry = registry();
    let (town_id, _) = registry.create_town("Riverside", true);

    let result = registry.join_town(town_id, "alice").await.unwrap();
    assert_eq!(result.friendly_name, "Riverside");
    assert_eq!(result.current_players.len(), 1);
    assert_eq!(result.session.player_id(), result.player.id());
    assert!(!result.session.video_token().is_empty());

    let second = registry.join_town(town_id, "bob").await.unwrap();
    assert_eq!(second.current_players.len(), 2);
}

#[tokio::test]
async fn test_join_unknown_town_fails() {
    let registry = registry();
    let result = registry.join_town(TownId::new(), "alice").await;
    assert!(matches!(result, Err(TownError::TownNotFound(_))));
}

#[tokio::test]
async fn test_failed_credential_issuance_leaves_town_untouched() {
    let registry = TownRegistry::new(Arc::new(FailingProvider));
    let (town_id, _) = registry.create_town("Riverside", true);

    let result = registry.join_town(town_id, "alice").await;
    assert!(matches!(result, Err(TownError::Video(_))));

    let town = registry.get(town_id).unwrap();
    let controller = town.read().await;
    assert_eq!(controller.occupancy(), 0);
    assert!(controller.players().is_empty());
}

#[tokio::test]
async fn test_join_rejected_at_capacity() {
    let registry = registry();
    let (town_id, _) = registry.create_town("Riverside", true);

    for i in 0..DEFAULT_CAPACITY {
        registry
            .join_town(town_id, &format!("player-{i}"))
            .await
            .unwrap();
    }
    let result = registry.join_town(town_id, "straggler").await;
    assert!(matches!(result, Err(TownError::AtCapacity)));
}

#[tokio::test]
async fn test_listing_shows_public_towns_only() {
    let registry = registry();
    let (public_id, _) = registry.create_town("Public", true);
    registry.create_town("Hidden", false);
    registry.join_town(public_id, "alice").await.unwrap();

    let listings = registry.list_towns().await;
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].friendly_name, "Public");
    assert_eq!(listings[0].occupancy, 1);
    assert_eq!(listings[0].capacity, DEFAULT_CAPACITY);
}

#[tokio::test]
async fn test_update_town_requires_password() {
    let registry = registry();
    let (town_id, password) = registry.create_town("Before", false);

    let wrong = crate::types::TownPassword::new();
    assert!(!registry.update_town(town_id, wrong, Some("Nope".to_string()), None).await);

    assert!(
        registry
            .update_town(town_id, password, Some("After".to_string()), Some(true))
            .await
    );
    let listings = registry.list_towns().await;
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].friendly_name, "After");
}

#[tokio::test]
async fn test_delete_town_disconnects_and_removes() {
    let registry = registry();
    let (town_id, password) = registry.create_town("Doomed", true);
    let listener = RecordingListener::new();
    {
        let town = registry.get(town_id).unwrap();
        town.write().await.add_listener(listener.clone());
    }

    assert!(!registry.delete_town(town_id, crate::types::TownPassword::new()).await);
    assert!(registry.delete_town(town_id, password).await);
    assert!(registry.get(town_id).is_none());
    assert_eq!(registry.town_count(), 0);
    assert_eq!(listener.drain(), vec![Observed::TownDestroyed]);
}

#[tokio::test]
async fn test_create_conversation_area_via_registry() {
    let registry = registry();
    let (town_id, _) = registry.create_town("Riverside", true);

    let created = registry
        .create_conversation_area(town_id, area("L1", "T1", 10.0, 10.0, 5.0, 5.0))
        .await
        .unwrap();
    assert!(created);

    let rejected = registry
        .create_conversation_area(town_id, area("L1", "T2", 80.0, 80.0, 5.0, 5.0))
        .await
        .unwrap();
    assert!(!rejected);

    let missing = registry
        .create_conversation_area(TownId::new(), area("L2", "T2", 0.0, 0.0, 1.0, 1.0))
        .await;
    assert!(matches!(missing, Err(TownError::TownNotFound(_))));
}
