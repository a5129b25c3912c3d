//! Error types for the sequence CRDT.

use braid_types::{ElementId, SiteId};
use thiserror::Error;

/// Result type for CRDT operations.
pub type CrdtResult<T> = Result<T, CrdtError>;

/// Structural errors. Redundant-but-valid input never produces one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrdtError {
    /// A local operation named an element this replica does not hold.
    #[error("unknown element: {0}")]
    UnknownElement(ElementId),

    /// An insert is anchored on an element that was applied here and later
    /// collected, so the anchor can never resolve again.
    #[error("insert {id} anchored on collected element {after_id}")]
    UnresolvableAnchor { id: ElementId, after_id: ElementId },

    /// The operation is malformed.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A counter was recorded out of sequence for its origin.
    #[error("causal gap for site {site}: expected counter {expected}, got {got}")]
    CausalGap { site: SiteId, expected: u64, got: u64 },

    /// A snapshot failed validation on restore.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The traversal chain references an element missing from the arena.
    #[error("broken chain at element {0}")]
    BrokenChain(ElementId),
}
