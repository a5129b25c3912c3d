//! Client side of a document session.

use crate::error::{SyncError, SyncResult};
use crate::protocol::{AckMessage, JoinMessage, LeaveMessage, ResyncMessage, WireMessage};
use braid_crdt::{CausalityVector, Operation, Sequence, SequenceSnapshot};
use braid_types::{DocumentId, ElementId, SiteId};
use tracing::{debug, warn};

/// A text replica attached to a host.
///
/// Local edits are kept in an outbox until the host's vector shows it has
/// them, so they survive a reconnect.
#[derive(Debug, Clone)]
pub struct ClientReplica {
    document: DocumentId,
    sequence: Sequence<char>,
    outbox: Vec<Operation<char>>,
}

impl ClientReplica {
    /// An empty replica of `document`.
    pub fn new(document: DocumentId, site: SiteId) -> Self {
        Self {
            document,
            sequence: Sequence::new(site),
            outbox: Vec::new(),
        }
    }

    /// A replica resumed from persisted state.
    pub fn restore(
        document: DocumentId,
        site: SiteId,
        snapshot: SequenceSnapshot<char>,
    ) -> SyncResult<Self> {
        Ok(Self {
            document,
            sequence: Sequence::from_snapshot(site, snapshot)?,
            outbox: Vec::new(),
        })
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn site(&self) -> SiteId {
        self.sequence.site()
    }

    pub fn sequence(&self) -> &Sequence<char> {
        &self.sequence
    }

    /// Current live content.
    pub fn value(&self) -> String {
        self.sequence.as_string()
    }

    /// Local operations the host has not confirmed.
    pub fn unconfirmed(&self) -> &[Operation<char>] {
        &self.outbox
    }

    // ── Outgoing ─────────────────────────────────────────────────

    /// The message that attaches this replica. A replica with no state asks
    /// for a snapshot; otherwise it resumes from its vector.
    pub fn join_message(&self) -> WireMessage<char> {
        let join = JoinMessage::new(self.document, self.site());
        if self.sequence.vector().is_empty() {
            WireMessage::Join(join)
        } else {
            WireMessage::Join(join.with_vector(self.sequence.vector().clone()))
        }
    }

    pub fn ack_message(&self) -> WireMessage<char> {
        WireMessage::Ack(AckMessage {
            vector: self.sequence.vector().clone(),
        })
    }

    pub fn resync_message(&self) -> WireMessage<char> {
        WireMessage::Resync(ResyncMessage {
            vector: self.sequence.vector().clone(),
        })
    }

    pub fn leave_message(&self) -> WireMessage<char> {
        WireMessage::Leave(LeaveMessage {})
    }

    /// Inserts `value` so it ends up at visible `index`.
    pub fn insert_at(&mut self, index: usize, value: char) -> SyncResult<WireMessage<char>> {
        let after_id = match index {
            0 => ElementId::ROOT,
            i => self.sequence.element_id_at(i - 1).ok_or_else(|| {
                SyncError::Protocol(format!("insert index {index} out of bounds"))
            })?,
        };
        self.insert_after(after_id, value)
    }

    /// Inserts `value` right after `after_id`.
    pub fn insert_after(
        &mut self,
        after_id: ElementId,
        value: char,
    ) -> SyncResult<WireMessage<char>> {
        let op: Operation<char> = self.sequence.local_insert(value, after_id)?.into();
        self.outbox.push(op.clone());
        Ok(op.into())
    }

    /// Deletes the live element at visible `index`.
    pub fn delete_at(&mut self, index: usize) -> Option<WireMessage<char>> {
        let target = self.sequence.element_id_at(index)?;
        let op: Operation<char> = self.sequence.local_delete(target)?.into();
        self.outbox.push(op.clone());
        Some(op.into())
    }

    // ── Incoming ─────────────────────────────────────────────────

    /// Handles a message from the host and returns what to send back.
    ///
    /// An `Ack` from the host prunes the outbox and yields the local
    /// operations it is still missing. A `Snapshot` replaces the local state;
    /// unconfirmed local operations are replayed on top of it where possible.
    pub fn handle(&mut self, message: WireMessage<char>) -> SyncResult<Vec<WireMessage<char>>> {
        match message {
            WireMessage::Insert(op) => {
                self.sequence.apply_operation(op.into())?;
                self.log_rejected();
                Ok(Vec::new())
            }
            WireMessage::Delete(op) => {
                self.sequence.apply_operation(op.into())?;
                self.log_rejected();
                Ok(Vec::new())
            }
            WireMessage::Ack(ack) => {
                self.confirm(&ack.vector);
                Ok(self.outbox.iter().cloned().map(WireMessage::from).collect())
            }
            WireMessage::Snapshot(message) => {
                if message.document != self.document {
                    return Err(SyncError::Protocol(format!(
                        "snapshot for {} sent to replica of {}",
                        message.document, self.document
                    )));
                }
                self.replace(message.snapshot)?;
                Ok(self.outbox.iter().cloned().map(WireMessage::from).collect())
            }
            WireMessage::Error(error) => Err(SyncError::Remote {
                code: error.code,
                message: error.message,
            }),
            other => Err(SyncError::Protocol(format!(
                "unexpected {} message from host",
                other.kind()
            ))),
        }
    }

    fn confirm(&mut self, host: &CausalityVector) {
        self.outbox
            .retain(|op| !host.covers(&op.origin_site(), op.counter()));
    }

    fn replace(&mut self, snapshot: SequenceSnapshot<char>) -> SyncResult<()> {
        let site = self.site();
        let host_vector = snapshot.vector.clone();
        self.sequence = Sequence::from_snapshot(site, snapshot)?;
        self.confirm(&host_vector);

        // Own counters must stay dense: after the first edit that no longer
        // fits, the rest are dropped too and their counters reused.
        let outbox = std::mem::take(&mut self.outbox);
        let total = outbox.len();
        for op in outbox {
            if let Err(e) = self.sequence.apply_operation(op.clone()) {
                warn!(
                    document = %self.document,
                    dropped = total - self.outbox.len(),
                    "dropping local edits after snapshot: {}",
                    e
                );
                break;
            }
            self.outbox.push(op);
        }
        self.log_rejected();
        debug!(
            document = %self.document,
            live = self.sequence.len(),
            "replaced state from snapshot"
        );
        Ok(())
    }

    fn log_rejected(&mut self) {
        for rejected in self.sequence.take_rejected() {
            warn!(
                document = %self.document,
                site = %rejected.operation.origin_site(),
                counter = rejected.operation.counter(),
                "dropped buffered operation: {}",
                rejected.error
            );
        }
    }
}
