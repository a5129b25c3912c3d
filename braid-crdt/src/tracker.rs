//! Exactly-once gate for operations.

use crate::causality::CausalityVector;
use crate::error::{CrdtError, CrdtResult};
use braid_types::SiteId;
use serde::{Deserialize, Serialize};

/// Tracks which operations a replica has applied.
///
/// Operations from one origin are applied strictly in counter order, so the
/// per-origin maximum is also the exact set of applied operations from that
/// origin. Operations from different origins are independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CausalityTracker {
    applied: CausalityVector,
}

impl CausalityTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes from a previously recorded vector.
    #[must_use]
    pub fn from_vector(applied: CausalityVector) -> Self {
        Self { applied }
    }

    /// The vector of applied operations.
    #[must_use]
    pub fn vector(&self) -> &CausalityVector {
        &self.applied
    }

    /// Returns true if `(site, counter)` has already been applied.
    #[must_use]
    pub fn has_applied(&self, site: &SiteId, counter: u64) -> bool {
        self.applied.covers(site, counter)
    }

    /// Returns true if `(site, counter)` is the next operation expected from `site`.
    #[must_use]
    pub fn is_ready(&self, site: &SiteId, counter: u64) -> bool {
        self.applied.get(site) + 1 == counter
    }

    /// Records `(site, counter)` as applied.
    ///
    /// Fails with [`CrdtError::CausalGap`] unless `counter` directly follows
    /// the last counter applied from `site`.
    pub fn record_applied(&mut self, site: SiteId, counter: u64) -> CrdtResult<()> {
        let expected = self.applied.get(&site) + 1;
        if counter != expected {
            return Err(CrdtError::CausalGap {
                site,
                expected,
                got: counter,
            });
        }
        self.applied.increment(site);
        Ok(())
    }
}
