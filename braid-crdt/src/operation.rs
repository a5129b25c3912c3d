//! Operations exchanged between replicas.
//!
//! Operations are immutable facts. Each one is identified by the pair
//! `(origin_site, counter)` of the replica that generated it, which is what
//! the causality tracker uses to apply it at most once.

use crate::error::CrdtError;
use braid_types::{ElementId, SiteId};
use serde::{Deserialize, Serialize};

/// Creates a new element immediately after `after_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOperation<T> {
    /// The new element's id; also this operation's `(origin_site, counter)`.
    pub id: ElementId,
    /// The payload.
    pub value: T,
    /// The element this one is inserted after, or [`ElementId::ROOT`].
    pub after_id: ElementId,
    /// Lamport stamp at generation; orders siblings under `after_id`.
    pub lamport: u64,
}

impl<T> InsertOperation<T> {
    /// The site that generated this operation.
    #[must_use]
    pub fn origin_site(&self) -> SiteId {
        self.id.site
    }

    /// The generating site's counter for this operation.
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.id.counter
    }
}

/// Marks an element as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOperation {
    /// The element to tombstone.
    pub target_id: ElementId,
    /// The site that generated this operation.
    pub origin_site: SiteId,
    /// The generating site's counter for this operation.
    pub counter: u64,
}

/// A single mutation of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum Operation<T> {
    Insert(InsertOperation<T>),
    Delete(DeleteOperation),
}

impl<T> Operation<T> {
    /// The site that generated this operation.
    #[must_use]
    pub fn origin_site(&self) -> SiteId {
        match self {
            Operation::Insert(op) => op.origin_site(),
            Operation::Delete(op) => op.origin_site,
        }
    }

    /// The generating site's counter for this operation.
    #[must_use]
    pub fn counter(&self) -> u64 {
        match self {
            Operation::Insert(op) => op.counter(),
            Operation::Delete(op) => op.counter,
        }
    }
}

impl<T> From<InsertOperation<T>> for Operation<T> {
    fn from(op: InsertOperation<T>) -> Self {
        Operation::Insert(op)
    }
}

impl<T> From<DeleteOperation> for Operation<T> {
    fn from(op: DeleteOperation) -> Self {
        Operation::Delete(op)
    }
}

/// A buffered operation dropped while draining because it can never apply.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOperation<T> {
    pub operation: Operation<T>,
    pub error: CrdtError,
}

/// What `apply_operation` did with an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The operation took effect. `count` includes any buffered operations
    /// it released.
    Applied { count: usize },
    /// Already applied or already buffered; nothing changed.
    Duplicate,
    /// Held back until its causal prerequisites arrive.
    Buffered,
}

impl ApplyOutcome {
    /// Returns true if the operation took effect.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}
