//! Causality vectors.
//!
//! A causality vector maps each originating site to the highest operation
//! counter seen from it. Because every site numbers its own operations densely
//! (1, 2, 3, ...), a single integer per site summarises the whole prefix of
//! that site's history a replica holds.
//!
//! Use cases:
//! - Exactly-once application of operations
//! - Delta resync (which operations a peer is missing)
//! - Garbage collection horizons (what every session has observed)

use braid_types::SiteId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Causality relationship between two vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// First vector happened before second.
    Before,
    /// First vector happened after second.
    After,
    /// Vectors are concurrent (neither happened before the other).
    Concurrent,
    /// Vectors are identical.
    Equal,
}

/// Highest counter seen per originating site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CausalityVector {
    /// Map from site ID to the highest counter seen from that site.
    counters: HashMap<SiteId, u64>,
}

impl CausalityVector {
    /// Creates a new empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    /// Returns the counter for a site (0 if not present).
    #[must_use]
    pub fn get(&self, site: &SiteId) -> u64 {
        self.counters.get(site).copied().unwrap_or(0)
    }

    /// Returns the number of sites in the vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if the vector has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Returns true if the operation `(site, counter)` is at or below this
    /// vector's entry for `site`.
    #[must_use]
    pub fn covers(&self, site: &SiteId, counter: u64) -> bool {
        self.get(site) >= counter
    }

    /// Increments the counter for a site and returns the new value.
    pub fn increment(&mut self, site: SiteId) -> u64 {
        let entry = self.counters.entry(site).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Raises the counter for a site. Lower values are ignored.
    pub fn update(&mut self, site: SiteId, counter: u64) {
        let entry = self.counters.entry(site).or_insert(0);
        if counter > *entry {
            *entry = counter;
        }
    }

    /// Merges another vector into this one (elementwise maximum).
    ///
    /// This operation is commutative, associative, and idempotent.
    pub fn merge(&mut self, other: &Self) {
        for (site, &counter) in &other.counters {
            self.update(*site, counter);
        }
    }

    /// Restricts this vector to the elementwise minimum with another.
    ///
    /// A site missing from either side ends up absent (0).
    pub fn meet(&mut self, other: &Self) {
        self.counters.retain(|site, counter| {
            let theirs = other.get(site);
            if theirs < *counter {
                *counter = theirs;
            }
            *counter > 0
        });
    }

    /// Creates a new vector that is the elementwise minimum of this and another.
    #[must_use]
    pub fn met(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.meet(other);
        result
    }

    /// Compares this vector with another to determine causal ordering.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrder {
        let mut dominated_by_self = true;
        let mut dominated_by_other = true;

        let all_sites: HashSet<_> = self
            .counters
            .keys()
            .chain(other.counters.keys())
            .copied()
            .collect();

        for site in all_sites {
            let ours = self.get(&site);
            let theirs = other.get(&site);

            if ours < theirs {
                dominated_by_self = false;
            }
            if theirs < ours {
                dominated_by_other = false;
            }
        }

        match (dominated_by_self, dominated_by_other) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::After,
            (false, true) => CausalOrder::Before,
            (false, false) => CausalOrder::Concurrent,
        }
    }
}

impl PartialEq for CausalityVector {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Equal
    }
}

impl Eq for CausalityVector {}

impl FromIterator<(SiteId, u64)> for CausalityVector {
    fn from_iter<I: IntoIterator<Item = (SiteId, u64)>>(iter: I) -> Self {
        let mut vector = Self::new();
        for (site, counter) in iter {
            vector.update(site, counter);
        }
        vector
    }
}
