use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a document host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// How long a disconnected session still holds back tombstone collection.
    pub session_grace: Duration,
    /// Period of the background collection pass.
    pub gc_interval: Duration,
    /// Applied operations between snapshots.
    pub snapshot_every: usize,
    /// Per-document capacity of the operation bus.
    pub bus_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            session_grace: Duration::from_secs(5 * 60),
            gc_interval: Duration::from_secs(30),
            snapshot_every: 500,
            bus_capacity: 1024,
        }
    }
}
