//! Per-replica counter state.
//!
//! Each replica owns a `ReplicaState`; there is no process-wide clock. The
//! counter is dense: every operation a replica originates consumes exactly
//! the next value, so gaps in what a peer has received from an origin are
//! detectable.
//!
//! Ordering is carried separately by a Lamport stamp. It moves past every
//! stamp the replica observes, so a fresh insert sorts ahead of anything
//! already anchored at the same place.

use crate::{ElementId, SiteId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Counter state owned by a single replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaState {
    site: SiteId,
    counter: u64,
    #[serde(default)]
    lamport: u64,
}

impl ReplicaState {
    /// Creates the state for a fresh replica. The first id minted has counter 1.
    #[must_use]
    pub fn new(site: SiteId) -> Self {
        Self {
            site,
            counter: 0,
            lamport: 0,
        }
    }

    /// Restores a replica whose last originated counter is known.
    #[must_use]
    pub fn resume(site: SiteId, counter: u64) -> Self {
        Self {
            site,
            counter,
            lamport: 0,
        }
    }

    /// This replica's site.
    #[must_use]
    pub fn site(&self) -> SiteId {
        self.site
    }

    /// The last counter value handed out.
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// The highest Lamport stamp minted or observed.
    #[must_use]
    pub fn lamport(&self) -> u64 {
        self.lamport
    }

    /// Increments the counter and returns the fresh id.
    pub fn next_id(&mut self) -> ElementId {
        self.counter += 1;
        ElementId::new(self.site, self.counter)
    }

    /// Fast-forwards past a counter this site is known to have used already
    /// (e.g. its own operations replayed from a log).
    pub fn observe(&mut self, counter: u64) {
        if counter > self.counter {
            self.counter = counter;
        }
    }

    /// Like [`observe`](Self::observe), for an operation from any site; only
    /// operations originated by this site move the counter.
    pub fn observe_operation(&mut self, site: SiteId, counter: u64) {
        if site == self.site {
            self.observe(counter);
        }
    }

    /// Returns a Lamport stamp greater than any seen so far.
    pub fn next_stamp(&mut self) -> u64 {
        self.lamport += 1;
        self.lamport
    }

    /// Advances the Lamport clock to at least `lamport`.
    pub fn observe_stamp(&mut self, lamport: u64) {
        if lamport > self.lamport {
            self.lamport = lamport;
        }
    }
}

/// Total order on element ids.
#[must_use]
pub fn compare_ids(a: &ElementId, b: &ElementId) -> Ordering {
    a.cmp(b)
}

/// Order of two inserts anchored on the same element: Lamport stamp first,
/// with [`compare_ids`] breaking ties between equal stamps.
#[must_use]
pub fn compare_stamped(a: (u64, &ElementId), b: (u64, &ElementId)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| compare_ids(a.1, b.1))
}
