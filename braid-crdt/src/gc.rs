//! Safe-horizon computation for tombstone collection.
//!
//! A tombstone may only be evicted once every replica that could still send
//! operations referencing it has observed its deletion. The horizon is the
//! elementwise minimum of the causality vectors of the attached sessions;
//! [`Sequence::collect`](crate::Sequence::collect) evicts what it covers.

use crate::causality::CausalityVector;
use std::time::{Duration, Instant};

/// What a host knows about one session's progress.
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// Operations the session is known to have applied.
    pub vector: CausalityVector,
    /// When the session disconnected, if it has.
    pub disconnected_at: Option<Instant>,
}

impl SessionClock {
    /// A connected session with a known vector.
    #[must_use]
    pub fn attached(vector: CausalityVector) -> Self {
        Self {
            vector,
            disconnected_at: None,
        }
    }

    /// Returns true if the session still holds back collection at `now`.
    ///
    /// Connected sessions always do; disconnected ones only within `grace`.
    #[must_use]
    pub fn is_included(&self, now: Instant, grace: Duration) -> bool {
        match self.disconnected_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) <= grace,
        }
    }
}

/// Elementwise minimum over the vectors of every included session.
///
/// Sessions disconnected for longer than `grace` are ignored, so a replica
/// that never comes back cannot block collection forever. With no included
/// session the horizon is empty and nothing is collectable.
#[must_use]
pub fn compute_safe_horizon<'a, I>(sessions: I, now: Instant, grace: Duration) -> CausalityVector
where
    I: IntoIterator<Item = &'a SessionClock>,
{
    let mut horizon: Option<CausalityVector> = None;
    for session in sessions {
        if !session.is_included(now, grace) {
            continue;
        }
        match horizon.as_mut() {
            Some(h) => h.meet(&session.vector),
            None => horizon = Some(session.vector.clone()),
        }
    }
    horizon.unwrap_or_default()
}
