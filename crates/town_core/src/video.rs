//! Credential issuance for town media sessions.
//!
//! The engine never talks to a media provider directly; it consults a
//! [`VideoTokenProvider`] when a player joins. The call may suspend and may
//! fail, and the engine does not retry: a failure propagates as a failed
//! join.

use crate::error::VideoError;
use crate::types::{PlayerId, TownId};
use async_trait::async_trait;
use uuid::Uuid;

/// External collaborator issuing per-player media credentials.
#[async_trait]
pub trait VideoTokenProvider: Send + Sync {
    /// Issues a credential scoped to `(town_id, player_id)`.
    async fn token_for_town(
        &self,
        town_id: TownId,
        player_id: PlayerId,
    ) -> Result<String, VideoError>;
}

/// In-process issuer of opaque credentials.
///
/// Stands in for a hosted media provider in development and tests: tokens
/// are unguessable and scoped to the requesting town/player pair, but carry
/// no signature a media server could verify.
#[derive(Debug, Default)]
pub struct LocalTokenIssuer;

impl LocalTokenIssuer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VideoTokenProvider for LocalTokenIssuer {
    async fn token_for_town(
        &self,
        town_id: TownId,
        player_id: PlayerId,
    ) -> Result<String, VideoError> {
        Ok(format!("{town_id}:{player_id}:{}", Uuid::new_v4()))
    }
}
