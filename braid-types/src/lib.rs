//! Core type definitions for braid.
//!
//! This crate defines the identity and clock utilities shared by every other
//! braid crate:
//! - Document and site identifiers (UUID v7)
//! - Element identifiers `(site, counter)` with their total order
//! - Per-replica counter state used to mint fresh element identifiers and
//!   Lamport stamps

mod clock;
mod element;
mod ids;

pub use clock::{compare_ids, compare_stamped, ReplicaState};
pub use element::ElementId;
pub use ids::{DocumentId, SiteId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid element id: {0}")]
    InvalidElementId(String),
}
