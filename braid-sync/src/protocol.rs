//! Wire protocol messages.
//!
//! A client attaches to one document per connection:
//! 1. It sends `Join` with its site and, if it holds state, its vector
//! 2. The host answers with a `Snapshot` (no vector) or with the operations
//!    the vector does not cover followed by an `Ack` carrying the host vector
//! 3. Both sides then stream `Insert`/`Delete` frames; the client reports
//!    progress with `Ack`, which feeds tombstone collection at the host
//! 4. `Leave` ends the session
//!
//! Hosts sharing a document over the bus also exchange `Horizon` reports (the
//! collection horizon of their own clients) and `Resync` requests when a host
//! has missed bus traffic. Neither is sent to clients.
//!
//! Operations are CRDT operations, so they may arrive in any order and any
//! number of times.

use braid_crdt::{CausalityVector, DeleteOperation, InsertOperation, Operation, SequenceSnapshot};
use braid_types::{DocumentId, SiteId};
use serde::{Deserialize, Serialize};

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u32 = 1;

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage<T> {
    /// A new element.
    Insert(InsertOperation<T>),
    /// A tombstone.
    Delete(DeleteOperation),
    /// Attach to a document.
    Join(JoinMessage),
    /// Ask for everything a vector does not cover.
    Resync(ResyncMessage),
    /// Detach from the document.
    Leave(LeaveMessage),
    /// Report the sender's vector.
    Ack(AckMessage),
    /// A host's collection horizon, shared with the other hosts.
    Horizon(HorizonMessage),
    /// Full document state.
    Snapshot(SnapshotMessage<T>),
    /// Error report.
    Error(ErrorMessage),
}

impl<T> WireMessage<T> {
    /// The operation carried by this message, if any.
    pub fn into_operation(self) -> Option<Operation<T>> {
        match self {
            WireMessage::Insert(op) => Some(Operation::Insert(op)),
            WireMessage::Delete(op) => Some(Operation::Delete(op)),
            _ => None,
        }
    }

    /// The origin site of a carried operation.
    pub fn operation_origin(&self) -> Option<SiteId> {
        match self {
            WireMessage::Insert(op) => Some(op.origin_site()),
            WireMessage::Delete(op) => Some(op.origin_site),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Insert(_) => "insert",
            WireMessage::Delete(_) => "delete",
            WireMessage::Join(_) => "join",
            WireMessage::Resync(_) => "resync",
            WireMessage::Leave(_) => "leave",
            WireMessage::Ack(_) => "ack",
            WireMessage::Horizon(_) => "horizon",
            WireMessage::Snapshot(_) => "snapshot",
            WireMessage::Error(_) => "error",
        }
    }
}

impl<T> From<Operation<T>> for WireMessage<T> {
    fn from(op: Operation<T>) -> Self {
        match op {
            Operation::Insert(op) => WireMessage::Insert(op),
            Operation::Delete(op) => WireMessage::Delete(op),
        }
    }
}

/// Initial message of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMessage {
    /// Protocol version.
    pub version: u32,
    /// Document to attach to.
    pub document: DocumentId,
    /// The joining replica.
    pub site: SiteId,
    /// What the replica already holds; `None` asks for a full snapshot.
    #[serde(default)]
    pub vector: Option<CausalityVector>,
}

impl JoinMessage {
    /// A join for a replica with no prior state.
    pub fn new(document: DocumentId, site: SiteId) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            document,
            site,
            vector: None,
        }
    }

    /// Resume from a known vector instead of a snapshot.
    pub fn with_vector(mut self, vector: CausalityVector) -> Self {
        self.vector = Some(vector);
        self
    }
}

/// Request for missing operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncMessage {
    pub vector: CausalityVector,
}

/// End of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveMessage {}

/// Progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    pub vector: CausalityVector,
}

/// What every client of the reporting host has observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonMessage {
    /// The reporting host.
    pub site: SiteId,
    pub vector: CausalityVector,
}

/// Full state of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct SnapshotMessage<T> {
    pub document: DocumentId,
    pub snapshot: SequenceSnapshot<T>,
}

/// Error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorMessage {
    /// Creates a new error message.
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Version mismatch error.
    pub fn version_mismatch(expected: u32, got: u32) -> Self {
        Self::new(
            1,
            format!("protocol version mismatch: expected {expected}, got {got}"),
        )
    }

    /// A message that is not valid at this point of the session.
    pub fn unexpected(kind: &str) -> Self {
        Self::new(2, format!("unexpected {kind} message"))
    }

    /// An operation the document cannot integrate.
    pub fn rejected(reason: impl std::fmt::Display) -> Self {
        Self::new(3, format!("operation rejected: {reason}"))
    }

    /// Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(99, msg)
    }
}
