use crate::error::StorageResult;
use braid_crdt::{CausalityVector, Operation, SequenceSnapshot};
use braid_types::DocumentId;

/// Persistence collaborator for replicated documents.
///
/// Calls are synchronous; async callers run them on a blocking thread.
pub trait DocumentStore<T>: Send + Sync {
    /// Stores a snapshot. Later snapshots supersede earlier ones.
    fn save_snapshot(
        &self,
        document: &DocumentId,
        snapshot: &SequenceSnapshot<T>,
    ) -> StorageResult<()>;

    /// Returns the most recently saved snapshot, if any.
    fn load_latest_snapshot(
        &self,
        document: &DocumentId,
    ) -> StorageResult<Option<SequenceSnapshot<T>>>;

    /// Appends an applied operation to the log.
    ///
    /// Idempotent on `(document, origin_site, counter)`: returns `false` and
    /// leaves the log untouched if the operation is already present.
    fn append_operation(&self, document: &DocumentId, op: &Operation<T>) -> StorageResult<bool>;

    /// Logged operations not covered by `vector`, in append order.
    fn operations_since(
        &self,
        document: &DocumentId,
        vector: &CausalityVector,
    ) -> StorageResult<Vec<Operation<T>>>;
}
