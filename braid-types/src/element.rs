//! Element identifiers.
//!
//! An element id is the pair `(site, counter)`: the replica that created the
//! element and that replica's counter at creation time. Ids are globally
//! unique without coordination because no replica reuses a counter.

use crate::{Error, SiteId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an element in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId {
    /// Which replica created this element.
    pub site: SiteId,
    /// The creating replica's counter at creation time (starts at 1).
    pub counter: u64,
}

impl ElementId {
    /// The "before the first element" anchor.
    pub const ROOT: ElementId = ElementId {
        site: SiteId::nil(),
        counter: 0,
    };

    /// Creates a new element ID.
    #[must_use]
    pub const fn new(site: SiteId, counter: u64) -> Self {
        Self { site, counter }
    }

    /// Returns true if this is the root sentinel.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.counter == 0 && self.site.is_nil()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site, self.counter)
    }
}

impl FromStr for ElementId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (site, counter) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidElementId(s.to_string()))?;
        let site = SiteId::parse(site)?;
        let counter = counter
            .parse::<u64>()
            .map_err(|_| Error::InvalidElementId(s.to_string()))?;
        Ok(Self { site, counter })
    }
}

impl PartialOrd for ElementId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ElementId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Counter first, then site. Every replica must use this exact rule.
        match self.counter.cmp(&other.counter) {
            Ordering::Equal => self.site.cmp(&other.site),
            ord => ord,
        }
    }
}
