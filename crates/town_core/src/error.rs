//! Error types for the town engine.
//!
//! Validation rejections (invalid conversation areas, no-op removals, wrong
//! update passwords) are expressed as boolean returns, never as errors:
//! errors here are reserved for lookup failures surfaced to callers and for
//! genuine collaborator faults.

use crate::types::TownId;

/// Errors surfaced by [`TownRegistry`](crate::TownRegistry) operations.
#[derive(Debug, thiserror::Error)]
pub enum TownError {
    /// No town exists with the requested id.
    #[error("no town found with id {0}")]
    TownNotFound(TownId),

    /// The town has reached its maximum occupancy.
    #[error("town is at capacity")]
    AtCapacity,

    /// The external credential-issuance collaborator failed; the join is
    /// abandoned and no player was added.
    #[error(transparent)]
    Video(#[from] VideoError),
}

/// Failure issuing a video credential for a joining player.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("credential issuance failed: {0}")]
    Issuance(String),
}
