//! Replicated sequence for text and other ordered content.
//!
//! An RGA-style CRDT. Every element remembers the element it was inserted
//! after (its origin), so the elements form a tree rooted at
//! [`ElementId::ROOT`]; document order is the depth-first traversal of that
//! tree with siblings visited in descending [`compare_stamped`] order. The
//! traversal is materialised as a doubly-linked chain over an id-keyed arena,
//! so integrating an insert only scans the subtree of its anchor.
//!
//! Deleted elements stay in the chain as tombstones until [`Sequence::collect`]
//! proves every attached replica has observed the delete. A collected element
//! that still has descendants leaves a forwarding record (its origin and
//! stamp) so later inserts are still placed relative to its subtree.
//!
//! [`compare_stamped`]: braid_types::compare_stamped

use crate::causality::CausalityVector;
use crate::error::{CrdtError, CrdtResult};
use crate::operation::{
    ApplyOutcome, DeleteOperation, InsertOperation, Operation, RejectedOperation,
};
use crate::pending::PendingBuffer;
use crate::tracker::CausalityTracker;
use braid_types::{compare_stamped, ElementId, ReplicaState, SiteId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// An element in the arena.
#[derive(Debug, Clone)]
struct Element<T> {
    id: ElementId,
    /// The element this one was inserted after.
    origin: ElementId,
    lamport: u64,
    value: T,
    deleted: bool,
    /// `(origin_site, counter)` of the first delete applied to this element.
    deleted_by: Option<(SiteId, u64)>,
    prev: Option<ElementId>,
    next: Option<ElementId>,
    /// Elements and forwarding records whose origin is this element.
    children: usize,
}

/// Left behind by a collected element that still had children.
#[derive(Debug, Clone, Copy)]
struct Forward {
    origin: ElementId,
    lamport: u64,
    children: usize,
}

/// Whether an operation can be integrated right now.
enum Readiness {
    Ready,
    Blocked,
}

/// A replicated sequence owned by one replica.
#[derive(Debug, Clone)]
pub struct Sequence<T> {
    replica: ReplicaState,
    elements: HashMap<ElementId, Element<T>>,
    head: Option<ElementId>,
    tail: Option<ElementId>,
    forwards: HashMap<ElementId, Forward>,
    tracker: CausalityTracker,
    pending: PendingBuffer<T>,
    rejected: Vec<RejectedOperation<T>>,
    live: usize,
}

impl<T: Clone> Sequence<T> {
    /// Creates an empty sequence for the replica `site`.
    #[must_use]
    pub fn new(site: SiteId) -> Self {
        Self {
            replica: ReplicaState::new(site),
            elements: HashMap::new(),
            head: None,
            tail: None,
            forwards: HashMap::new(),
            tracker: CausalityTracker::new(),
            pending: PendingBuffer::default(),
            rejected: Vec::new(),
            live: 0,
        }
    }

    /// Returns this replica's site.
    #[must_use]
    pub fn site(&self) -> SiteId {
        self.replica.site()
    }

    /// The vector of operations applied to this sequence.
    #[must_use]
    pub fn vector(&self) -> &CausalityVector {
        self.tracker.vector()
    }

    /// Returns true if `(site, counter)` has been applied.
    #[must_use]
    pub fn has_applied(&self, site: &SiteId, counter: u64) -> bool {
        self.tracker.has_applied(site, counter)
    }

    /// Number of live (non-deleted) elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no live element remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of elements held in memory, tombstones included.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Number of tombstones held in memory.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.elements.len() - self.live
    }

    /// Number of collected elements still remembered because content
    /// descends from them.
    #[must_use]
    pub fn forward_count(&self) -> usize {
        self.forwards.len()
    }

    /// Number of operations waiting for their prerequisites.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Live values in document order.
    ///
    /// The iterator is lazy and borrows the sequence; call again to restart.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.chain().filter(|e| !e.deleted).map(|e| &e.value)
    }

    /// Returns the live values as a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.values().cloned().collect()
    }

    /// Returns all element ids in document order, tombstones included.
    #[must_use]
    pub fn element_ids_in_order(&self) -> Vec<ElementId> {
        self.chain().map(|e| e.id).collect()
    }

    /// Returns the id of the live element at a visible index.
    #[must_use]
    pub fn element_id_at(&self, index: usize) -> Option<ElementId> {
        self.chain().filter(|e| !e.deleted).nth(index).map(|e| e.id)
    }

    /// Returns the id of the last live element.
    #[must_use]
    pub fn last_element_id(&self) -> Option<ElementId> {
        self.chain().filter(|e| !e.deleted).last().map(|e| e.id)
    }

    /// Returns the visible index of an element, if it exists and is live.
    #[must_use]
    pub fn index_of(&self, target: &ElementId) -> Option<usize> {
        self.chain()
            .filter(|e| !e.deleted)
            .position(|e| e.id == *target)
    }

    /// Returns whether an element exists (even if tombstoned).
    #[must_use]
    pub fn contains_element(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Returns whether an element is tombstoned.
    #[must_use]
    pub fn is_tombstoned(&self, id: &ElementId) -> bool {
        self.elements.get(id).is_some_and(|e| e.deleted)
    }

    fn chain(&self) -> impl Iterator<Item = &Element<T>> + '_ {
        std::iter::successors(self.head.and_then(|id| self.elements.get(&id)), |e| {
            e.next.and_then(|next| self.elements.get(&next))
        })
    }

    // ── Local edits ──────────────────────────────────────────────

    /// Inserts `value` immediately after `after_id` (or at the start for
    /// [`ElementId::ROOT`]) and returns the operation to broadcast.
    pub fn local_insert(
        &mut self,
        value: T,
        after_id: ElementId,
    ) -> CrdtResult<InsertOperation<T>> {
        if !after_id.is_root() && !self.elements.contains_key(&after_id) {
            return Err(CrdtError::UnknownElement(after_id));
        }
        let id = self.mint()?;
        let lamport = self.replica.next_stamp();
        let op = InsertOperation {
            id,
            value,
            after_id,
            lamport,
        };
        self.integrate(Operation::Insert(op.clone()))?;
        Ok(op)
    }

    /// Tombstones `target_id` and returns the operation to broadcast.
    ///
    /// Returns `None` if the element is unknown or already deleted, or while
    /// this replica's own operations are still buffered behind a gap.
    pub fn local_delete(&mut self, target_id: ElementId) -> Option<DeleteOperation> {
        if !self.elements.get(&target_id).is_some_and(|e| !e.deleted) {
            return None;
        }
        let id = self.mint().ok()?;
        let op = DeleteOperation {
            target_id,
            origin_site: id.site,
            counter: id.counter,
        };
        self.integrate(Operation::Delete(op)).ok()?;
        Some(op)
    }

    /// Reserves the next local counter. Fails while own operations are
    /// buffered behind a gap, since the new counter could not be recorded.
    fn mint(&mut self) -> CrdtResult<ElementId> {
        let site = self.replica.site();
        let next = self.replica.counter() + 1;
        if !self.tracker.is_ready(&site, next) {
            return Err(CrdtError::CausalGap {
                site,
                expected: self.tracker.vector().get(&site) + 1,
                got: next,
            });
        }
        Ok(self.replica.next_id())
    }

    // ── Remote operations ────────────────────────────────────────

    /// Applies a remote or replayed operation.
    ///
    /// Operations already applied (or already buffered) are no-ops.
    /// Operations whose prerequisites are missing are buffered and applied as
    /// soon as those prerequisites arrive. A buffered operation that turns
    /// out to be unresolvable is dropped without failing the operation that
    /// released it; see [`take_rejected`](Self::take_rejected).
    pub fn apply_operation(&mut self, op: Operation<T>) -> CrdtResult<ApplyOutcome> {
        validate(&op)?;
        let site = op.origin_site();
        let counter = op.counter();

        if self.tracker.has_applied(&site, counter) || self.pending.contains(&site, counter) {
            return Ok(ApplyOutcome::Duplicate);
        }

        match self.readiness(&op)? {
            Readiness::Blocked => {
                self.replica.observe_operation(site, counter);
                self.pending.insert(op);
                Ok(ApplyOutcome::Buffered)
            }
            Readiness::Ready => {
                self.integrate(op)?;
                let released = self.drain_pending()?;
                Ok(ApplyOutcome::Applied {
                    count: 1 + released,
                })
            }
        }
    }

    fn readiness(&self, op: &Operation<T>) -> CrdtResult<Readiness> {
        if !self.tracker.is_ready(&op.origin_site(), op.counter()) {
            return Ok(Readiness::Blocked);
        }
        let dependency = match op {
            Operation::Insert(insert) if insert.after_id.is_root() => return Ok(Readiness::Ready),
            Operation::Insert(insert) => insert.after_id,
            Operation::Delete(delete) => delete.target_id,
        };
        if let Some(element) = self.elements.get(&dependency) {
            if let Operation::Insert(insert) = op {
                // The inserter saw its anchor, so its stamp must be later.
                if insert.lamport <= element.lamport {
                    return Err(CrdtError::InvalidOperation(format!(
                        "insert {} stamped {} is not after its anchor's stamp {}",
                        insert.id, insert.lamport, element.lamport
                    )));
                }
            }
            return Ok(Readiness::Ready);
        }
        if self.tracker.has_applied(&dependency.site, dependency.counter) {
            // Applied here and since collected.
            return match op {
                Operation::Insert(insert) => Err(CrdtError::UnresolvableAnchor {
                    id: insert.id,
                    after_id: insert.after_id,
                }),
                // Collection implies it was deleted and everyone saw that.
                Operation::Delete(_) => Ok(Readiness::Ready),
            };
        }
        Ok(Readiness::Blocked)
    }

    /// Applies buffered operations until none is ready. Returns how many ran.
    ///
    /// Buffered operations that can never apply are moved to the rejected
    /// list and draining carries on.
    fn drain_pending(&mut self) -> CrdtResult<usize> {
        let mut released = 0;
        loop {
            let mut next = None;
            for op in self.pending.fronts() {
                match self.readiness(op) {
                    Ok(Readiness::Ready) => {
                        next = Some((op.origin_site(), op.counter(), None));
                        break;
                    }
                    Ok(Readiness::Blocked) => {}
                    Err(e) => {
                        next = Some((op.origin_site(), op.counter(), Some(e)));
                        break;
                    }
                }
            }

            let Some((site, counter, error)) = next else {
                return Ok(released);
            };
            let Some(op) = self.pending.remove(&site, counter) else {
                return Ok(released);
            };
            match error {
                None => {
                    self.integrate(op)?;
                    released += 1;
                }
                Some(error) => self.rejected.push(RejectedOperation {
                    operation: op,
                    error,
                }),
            }
        }
    }

    /// Takes the buffered operations dropped since the last call.
    pub fn take_rejected(&mut self) -> Vec<RejectedOperation<T>> {
        std::mem::take(&mut self.rejected)
    }

    /// Mutates the arena for a ready operation and records it as applied.
    fn integrate(&mut self, op: Operation<T>) -> CrdtResult<()> {
        let site = op.origin_site();
        let counter = op.counter();
        self.tracker.record_applied(site, counter)?;
        self.replica.observe_operation(site, counter);

        match op {
            Operation::Insert(insert) => {
                self.replica.observe_stamp(insert.lamport);
                self.link(insert)
            }
            Operation::Delete(delete) => {
                if let Some(element) = self.elements.get_mut(&delete.target_id) {
                    if !element.deleted {
                        element.deleted = true;
                        element.deleted_by = Some((site, counter));
                        self.live -= 1;
                    }
                }
                Ok(())
            }
        }
    }

    /// Places a new element in the chain.
    ///
    /// Starting after the anchor, skip every element that belongs to the
    /// anchor's subtree and sorts before the new element: children of the
    /// anchor with a greater stamp, and anything descending from an element
    /// already skipped.
    fn link(&mut self, insert: InsertOperation<T>) -> CrdtResult<()> {
        let InsertOperation {
            id,
            value,
            after_id,
            lamport,
        } = insert;

        let (mut prev, mut cursor) = if after_id.is_root() {
            (None, self.head)
        } else {
            (Some(after_id), self.element(&after_id)?.next)
        };

        let mut skipped: HashSet<ElementId> = HashSet::new();
        while let Some(current) = cursor {
            let element = self.element(&current)?;
            if !self.precedes(element, after_id, (lamport, &id), &mut skipped) {
                break;
            }
            skipped.insert(current);
            prev = Some(current);
            cursor = element.next;
        }

        match prev {
            Some(p) => self.element_mut(&p)?.next = Some(id),
            None => self.head = Some(id),
        }
        match cursor {
            Some(n) => self.element_mut(&n)?.prev = Some(id),
            None => self.tail = Some(id),
        }
        if !after_id.is_root() {
            self.element_mut(&after_id)?.children += 1;
        }

        self.elements.insert(
            id,
            Element {
                id,
                origin: after_id,
                lamport,
                value,
                deleted: false,
                deleted_by: None,
                prev,
                next: cursor,
                children: 0,
            },
        );
        self.live += 1;
        Ok(())
    }

    /// Whether `element`, met while scanning after `anchor`, sorts ahead of
    /// a new insert stamped `new`. Ancestors that were collected are walked
    /// through their forwarding records; one that turns out to be a skipped
    /// child of the anchor is added to `skipped`.
    fn precedes(
        &self,
        element: &Element<T>,
        anchor: ElementId,
        new: (u64, &ElementId),
        skipped: &mut HashSet<ElementId>,
    ) -> bool {
        let (mut node, mut lamport) = (element.id, element.lamport);
        let mut parent = element.origin;
        loop {
            if parent == anchor {
                let ahead = compare_stamped((lamport, &node), new) == Ordering::Greater;
                if ahead && node != element.id {
                    skipped.insert(node);
                }
                return ahead;
            }
            if skipped.contains(&parent) {
                return true;
            }
            let Some(forward) = self.forwards.get(&parent) else {
                return false;
            };
            node = parent;
            lamport = forward.lamport;
            parent = forward.origin;
        }
    }

    fn element(&self, id: &ElementId) -> CrdtResult<&Element<T>> {
        self.elements.get(id).ok_or(CrdtError::BrokenChain(*id))
    }

    fn element_mut(&mut self, id: &ElementId) -> CrdtResult<&mut Element<T>> {
        self.elements.get_mut(id).ok_or(CrdtError::BrokenChain(*id))
    }

    // ── Garbage collection ───────────────────────────────────────

    /// Evicts tombstones that every session in `horizon` has seen deleted.
    ///
    /// A tombstone is removed only when its insert and its first applied
    /// delete are both covered by `horizon` and no buffered insert is
    /// anchored on it. Tombstones that other elements were inserted after are
    /// reduced to a forwarding record until those descendants are gone too.
    /// Returns the number of elements removed from the chain.
    pub fn collect(&mut self, horizon: &CausalityVector) -> usize {
        let anchored: HashSet<ElementId> = self.pending.anchors().collect();
        let mut removed = 0;
        let mut cursor = self.tail;

        while let Some(id) = cursor {
            let Some(element) = self.elements.get(&id) else {
                break;
            };
            cursor = element.prev;

            let collectable = element.deleted
                && horizon.covers(&id.site, id.counter)
                && element
                    .deleted_by
                    .is_some_and(|(site, counter)| horizon.covers(&site, counter))
                && !anchored.contains(&id);

            if collectable && self.unlink(&id) {
                removed += 1;
            }
        }

        removed
    }

    /// Removes an element, repairing its neighbours first. An element with
    /// children leaves a forwarding record in its place.
    fn unlink(&mut self, id: &ElementId) -> bool {
        let Some(element) = self.elements.remove(id) else {
            return false;
        };

        match element.prev {
            Some(p) => {
                if let Some(prev) = self.elements.get_mut(&p) {
                    prev.next = element.next;
                }
            }
            None => self.head = element.next,
        }
        match element.next {
            Some(n) => {
                if let Some(next) = self.elements.get_mut(&n) {
                    next.prev = element.prev;
                }
            }
            None => self.tail = element.prev,
        }
        if element.children > 0 {
            self.forwards.insert(
                *id,
                Forward {
                    origin: element.origin,
                    lamport: element.lamport,
                    children: element.children,
                },
            );
        } else {
            self.release(element.origin);
        }
        if !element.deleted {
            self.live -= 1;
        }
        true
    }

    /// Drops one child from `parent`. Forwarding records left without
    /// children are retired, which in turn releases their own origin.
    fn release(&mut self, mut parent: ElementId) {
        loop {
            if let Some(element) = self.elements.get_mut(&parent) {
                element.children = element.children.saturating_sub(1);
                return;
            }
            let Some(forward) = self.forwards.get_mut(&parent) else {
                return;
            };
            forward.children = forward.children.saturating_sub(1);
            if forward.children > 0 {
                return;
            }
            let origin = forward.origin;
            self.forwards.remove(&parent);
            parent = origin;
        }
    }

    // ── Snapshots ────────────────────────────────────────────────

    /// Captures the full state: elements in document order, forwarding
    /// records, the applied vector and any buffered operations.
    #[must_use]
    pub fn to_snapshot(&self) -> SequenceSnapshot<T> {
        // Stamps grow from origin to child, so this lists origins first.
        let mut forwards: Vec<ForwardRecord> = self
            .forwards
            .iter()
            .map(|(id, f)| ForwardRecord {
                id: *id,
                after_id: f.origin,
                lamport: f.lamport,
            })
            .collect();
        forwards.sort_by(|a, b| compare_stamped((a.lamport, &a.id), (b.lamport, &b.id)));

        SequenceSnapshot {
            elements: self
                .chain()
                .map(|e| ElementRecord {
                    id: e.id,
                    after_id: e.origin,
                    lamport: e.lamport,
                    value: e.value.clone(),
                    deleted: e.deleted,
                    deleted_by: e.deleted_by,
                })
                .collect(),
            forwards,
            vector: self.tracker.vector().clone(),
            pending: self.pending.iter().cloned().collect(),
        }
    }

    /// Restores a sequence for replica `site` from a snapshot.
    pub fn from_snapshot(site: SiteId, snapshot: SequenceSnapshot<T>) -> CrdtResult<Self> {
        let SequenceSnapshot {
            elements,
            forwards,
            vector,
            pending,
        } = snapshot;

        let mut sequence = Self::new(site);
        sequence.tracker = CausalityTracker::from_vector(vector);
        sequence.replica.observe(sequence.tracker.vector().get(&site));

        let element_ids: HashSet<ElementId> = elements.iter().map(|e| e.id).collect();
        for record in forwards {
            let id = record.id;
            if id.is_root() || element_ids.contains(&id) || sequence.forwards.contains_key(&id) {
                return Err(CrdtError::InvalidSnapshot(format!("duplicate forward {id}")));
            }
            if !sequence.tracker.has_applied(&id.site, id.counter) {
                return Err(CrdtError::InvalidSnapshot(format!(
                    "forward {id} not covered by the vector"
                )));
            }
            let origin = record.after_id;
            if !origin.is_root()
                && !element_ids.contains(&origin)
                && !sequence.forwards.contains_key(&origin)
            {
                return Err(CrdtError::InvalidSnapshot(format!(
                    "forward {id} precedes its origin {origin}"
                )));
            }
            sequence.replica.observe_stamp(record.lamport);
            sequence.forwards.insert(
                id,
                Forward {
                    origin,
                    lamport: record.lamport,
                    children: 0,
                },
            );
        }

        let mut prev: Option<ElementId> = None;
        for record in elements {
            let id = record.id;
            if id.is_root() || sequence.elements.contains_key(&id) {
                return Err(CrdtError::InvalidSnapshot(format!("duplicate or root element {id}")));
            }
            if !sequence.tracker.has_applied(&id.site, id.counter) {
                return Err(CrdtError::InvalidSnapshot(format!(
                    "element {id} not covered by the vector"
                )));
            }
            // Depth-first order puts every origin before its children.
            let origin = record.after_id;
            if !origin.is_root()
                && !sequence.elements.contains_key(&origin)
                && !sequence.forwards.contains_key(&origin)
            {
                return Err(CrdtError::InvalidSnapshot(format!(
                    "element {id} precedes its origin {origin}"
                )));
            }
            sequence.replica.observe_stamp(record.lamport);

            match prev {
                Some(p) => sequence.element_mut(&p)?.next = Some(id),
                None => sequence.head = Some(id),
            }
            if !record.deleted {
                sequence.live += 1;
            }
            sequence.elements.insert(
                id,
                Element {
                    id,
                    origin,
                    lamport: record.lamport,
                    value: record.value,
                    deleted: record.deleted,
                    deleted_by: record.deleted_by,
                    prev,
                    next: None,
                    children: 0,
                },
            );
            prev = Some(id);
        }
        sequence.tail = prev;
        sequence.count_children();

        for op in pending {
            validate(&op)?;
            sequence
                .replica
                .observe_operation(op.origin_site(), op.counter());
            if let Operation::Insert(insert) = &op {
                sequence.replica.observe_stamp(insert.lamport);
            }
            if !sequence.tracker.has_applied(&op.origin_site(), op.counter()) {
                sequence.pending.insert(op);
            }
        }

        Ok(sequence)
    }

    /// Rebuilds child counts of elements and forwarding records.
    fn count_children(&mut self) {
        let origins: Vec<ElementId> = self
            .elements
            .values()
            .map(|e| e.origin)
            .chain(self.forwards.values().map(|f| f.origin))
            .collect();
        for origin in origins {
            if let Some(element) = self.elements.get_mut(&origin) {
                element.children += 1;
            } else if let Some(forward) = self.forwards.get_mut(&origin) {
                forward.children += 1;
            }
        }
    }
}

impl Sequence<char> {
    /// Converts the live content to a `String`.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.values().collect()
    }

    /// Inserts `s` character by character after `after_id`, returning the
    /// operations in generation order.
    pub fn insert_str(
        &mut self,
        after_id: ElementId,
        s: &str,
    ) -> CrdtResult<Vec<InsertOperation<char>>> {
        let mut anchor = after_id;
        let mut ops = Vec::with_capacity(s.len());
        for c in s.chars() {
            let op = self.local_insert(c, anchor)?;
            anchor = op.id;
            ops.push(op);
        }
        Ok(ops)
    }
}

/// Rejects operations that can never be valid, whatever else arrives.
fn validate<T>(op: &Operation<T>) -> CrdtResult<()> {
    let site = op.origin_site();
    let counter = op.counter();
    if counter == 0 || site.is_nil() {
        return Err(CrdtError::InvalidOperation(format!(
            "operation {site}:{counter} has a reserved id"
        )));
    }
    let (reference, what) = match op {
        Operation::Insert(insert) => (insert.after_id, "anchor"),
        Operation::Delete(delete) => (delete.target_id, "target"),
    };
    match op {
        Operation::Delete(_) if reference.is_root() => {
            return Err(CrdtError::InvalidOperation("delete targets the root".into()));
        }
        Operation::Insert(insert) if insert.lamport == 0 => {
            return Err(CrdtError::InvalidOperation(format!(
                "insert {site}:{counter} has no stamp"
            )));
        }
        _ => {}
    }
    // A site cannot reference its own future.
    if reference.site == site && reference.counter >= counter {
        return Err(CrdtError::InvalidOperation(format!(
            "operation {site}:{counter} references later {what} {reference}"
        )));
    }
    Ok(())
}

/// A serialized element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord<T> {
    pub id: ElementId,
    pub after_id: ElementId,
    pub lamport: u64,
    pub value: T,
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<(SiteId, u64)>,
}

/// A collected element that content still descends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub id: ElementId,
    pub after_id: ElementId,
    pub lamport: u64,
}

/// Full serializable state of a [`Sequence`], independent of the replica that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de>"
))]
pub struct SequenceSnapshot<T> {
    /// Elements in document order, tombstones included.
    pub elements: Vec<ElementRecord<T>>,
    /// Collected ancestors of remaining elements, origins first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forwards: Vec<ForwardRecord>,
    /// Operations applied.
    pub vector: CausalityVector,
    /// Operations waiting for prerequisites.
    #[serde(default)]
    pub pending: Vec<Operation<T>>,
}

impl<T> SequenceSnapshot<T> {
    /// A snapshot of a new, empty document.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
            forwards: Vec::new(),
            vector: CausalityVector::new(),
            pending: Vec::new(),
        }
    }
}
