//! Buffer for operations that arrived before their prerequisites.

use crate::operation::Operation;
use braid_types::{ElementId, SiteId};
use std::collections::BTreeMap;

/// Operations held back, queued per origin in counter order.
#[derive(Debug, Clone)]
pub(crate) struct PendingBuffer<T> {
    queues: BTreeMap<SiteId, BTreeMap<u64, Operation<T>>>,
}

impl<T> Default for PendingBuffer<T> {
    fn default() -> Self {
        Self {
            queues: BTreeMap::new(),
        }
    }
}

impl<T> PendingBuffer<T> {
    pub(crate) fn len(&self) -> usize {
        self.queues.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn contains(&self, site: &SiteId, counter: u64) -> bool {
        self.queues
            .get(site)
            .is_some_and(|queue| queue.contains_key(&counter))
    }

    /// Stores an operation; a second copy of the same operation is ignored.
    pub(crate) fn insert(&mut self, op: Operation<T>) {
        self.queues
            .entry(op.origin_site())
            .or_default()
            .entry(op.counter())
            .or_insert(op);
    }

    pub(crate) fn remove(&mut self, site: &SiteId, counter: u64) -> Option<Operation<T>> {
        let queue = self.queues.get_mut(site)?;
        let op = queue.remove(&counter);
        if queue.is_empty() {
            self.queues.remove(site);
        }
        op
    }

    /// The lowest-counter operation of each origin. Only these can be ready.
    pub(crate) fn fronts(&self) -> impl Iterator<Item = &Operation<T>> {
        self.queues
            .values()
            .filter_map(|queue| queue.values().next())
    }

    /// Elements referenced as insert anchors by buffered operations.
    pub(crate) fn anchors(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.iter().filter_map(|op| match op {
            Operation::Insert(insert) => Some(insert.after_id),
            Operation::Delete(_) => None,
        })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Operation<T>> {
        self.queues.values().flat_map(BTreeMap::values)
    }
}
