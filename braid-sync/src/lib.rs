//! Synchronization layer for braid documents.
//!
//! Hosts keep one authoritative replica per open document and relay
//! operations between the clients attached to it.
//!
//! # Architecture
//!
//! - **Protocol / Codec**: framed messages exchanged with clients
//!   (`[type][length][JSON]`, operation frames under 1 KB)
//! - **Session**: one document at a host; joins, resyncs, acks and the
//!   tombstone collection horizon derived from them
//! - **Hub**: lazily opened sessions and the periodic collection task
//! - **Bus**: fan-out of applied operations to everything hosting a document,
//!   plus the horizon reports and resync requests hosts exchange
//! - **Replica**: the client end of a session
//!
//! Operations are CRDT operations, so every path may reorder or duplicate
//! them; the sequence absorbs both.
//!
//! # Example
//!
//! ```
//! use braid_sync::{ClientReplica, WireMessage};
//! use braid_types::{DocumentId, SiteId};
//!
//! let mut replica = ClientReplica::new(DocumentId::new(), SiteId::new());
//! let op = replica.insert_at(0, 'h').unwrap();
//! assert!(matches!(op, WireMessage::Insert(_)));
//! assert_eq!(replica.value(), "h");
//! ```

mod bus;
pub mod codec;
mod config;
mod error;
mod hub;
pub mod protocol;
mod replica;
mod session;

pub use bus::{Frame, LocalBus, OperationBus};
pub use codec::{decode, encode, read_frame, write_frame, MAX_FRAME_SIZE, OPERATION_BUDGET};
pub use config::HostConfig;
pub use error::{SyncError, SyncResult};
pub use hub::Hub;
pub use protocol::{
    AckMessage, ErrorMessage, HorizonMessage, JoinMessage, LeaveMessage, ResyncMessage,
    SnapshotMessage, WireMessage, PROTOCOL_VERSION,
};
pub use replica::ClientReplica;
pub use session::{DocumentSession, SharedStore};
