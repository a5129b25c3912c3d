//! In-process store, for tests and ephemeral hosts.

use crate::error::StorageResult;
use crate::store::DocumentStore;
use braid_crdt::{CausalityVector, Operation, SequenceSnapshot};
use braid_types::{DocumentId, SiteId};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug)]
struct DocumentLog<T> {
    snapshot: Option<SequenceSnapshot<T>>,
    operations: Vec<Operation<T>>,
    seen: HashSet<(SiteId, u64)>,
}

impl<T> Default for DocumentLog<T> {
    fn default() -> Self {
        Self {
            snapshot: None,
            operations: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

/// A [`DocumentStore`] that keeps everything in memory.
#[derive(Debug)]
pub struct MemoryStore<T> {
    documents: RwLock<HashMap<DocumentId, DocumentLog<T>>>,
}

impl<T> MemoryStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Number of logged operations for a document.
    pub fn operation_count(&self, document: &DocumentId) -> StorageResult<usize> {
        let documents = self.documents.read()?;
        Ok(documents.get(document).map_or(0, |log| log.operations.len()))
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> DocumentStore<T> for MemoryStore<T> {
    fn save_snapshot(
        &self,
        document: &DocumentId,
        snapshot: &SequenceSnapshot<T>,
    ) -> StorageResult<()> {
        let mut documents = self.documents.write()?;
        documents.entry(*document).or_default().snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn load_latest_snapshot(
        &self,
        document: &DocumentId,
    ) -> StorageResult<Option<SequenceSnapshot<T>>> {
        let documents = self.documents.read()?;
        Ok(documents.get(document).and_then(|log| log.snapshot.clone()))
    }

    fn append_operation(&self, document: &DocumentId, op: &Operation<T>) -> StorageResult<bool> {
        let mut documents = self.documents.write()?;
        let log = documents.entry(*document).or_default();
        if !log.seen.insert((op.origin_site(), op.counter())) {
            return Ok(false);
        }
        log.operations.push(op.clone());
        Ok(true)
    }

    fn operations_since(
        &self,
        document: &DocumentId,
        vector: &CausalityVector,
    ) -> StorageResult<Vec<Operation<T>>> {
        let documents = self.documents.read()?;
        Ok(documents
            .get(document)
            .map(|log| {
                log.operations
                    .iter()
                    .filter(|op| !vector.covers(&op.origin_site(), op.counter()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
