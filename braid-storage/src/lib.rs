//! Durable storage for braid documents.
//!
//! A document is persisted as two things:
//!
//! - periodic [`SequenceSnapshot`]s, the latest of which is the starting
//!   point for a host that reopens the document
//! - an append-only log of every operation the host applied, keyed by
//!   `(document, origin_site, counter)`, used to replay past the latest
//!   snapshot and to answer vector-based resync requests
//!
//! [`DocumentStore`] is the seam; [`MemoryStore`] and [`SqliteStore`] are the
//! two implementations.
//!
//! [`SequenceSnapshot`]: braid_crdt::SequenceSnapshot

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::DocumentStore;
