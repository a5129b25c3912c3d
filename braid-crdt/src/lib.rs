//! Sequence CRDT for braid.
//!
//! This crate provides the replicated core of a shared ordered sequence:
//!
//! - [`Sequence<T>`] — Replicated sequence with local edits, remote apply and
//!   tombstone collection
//! - [`Operation<T>`] — The insert/delete facts replicas exchange
//! - [`CausalityVector`] / [`CausalityTracker`] — Per-origin progress and the
//!   exactly-once gate in front of every mutation
//! - [`compute_safe_horizon`] — What every attached session has observed
//!
//! Replicas that apply the same set of operations, in any order and with any
//! amount of duplication, end up with identical content.

mod causality;
mod error;
mod gc;
mod operation;
mod pending;
mod sequence;
mod tracker;

pub use causality::{CausalOrder, CausalityVector};
pub use error::{CrdtError, CrdtResult};
pub use gc::{compute_safe_horizon, SessionClock};
pub use operation::{
    ApplyOutcome, DeleteOperation, InsertOperation, Operation, RejectedOperation,
};
pub use sequence::{ElementRecord, ForwardRecord, Sequence, SequenceSnapshot};
pub use tracker::CausalityTracker;
