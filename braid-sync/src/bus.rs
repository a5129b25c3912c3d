//! Fan-out of encoded operations between everything hosting a document.

use crate::error::SyncResult;
use async_trait::async_trait;
use braid_types::DocumentId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

/// An encoded frame as carried on the bus.
pub type Frame = Arc<[u8]>;

/// Publish/subscribe channel keyed by document.
///
/// Delivery is best effort: subscribers that fall behind lose frames and
/// must resync. Duplicates are harmless.
#[async_trait]
pub trait OperationBus: Send + Sync {
    /// Publishes a frame to every subscriber of `document`.
    async fn publish(&self, document: &DocumentId, frame: Frame) -> SyncResult<()>;

    /// Subscribes to frames published for `document` from now on.
    fn subscribe(&self, document: &DocumentId) -> broadcast::Receiver<Frame>;
}

/// In-process bus on tokio broadcast channels.
pub struct LocalBus {
    capacity: usize,
    channels: Mutex<HashMap<DocumentId, broadcast::Sender<Frame>>>,
}

impl LocalBus {
    /// Creates a bus whose per-document channels buffer `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender(&self, document: &DocumentId) -> broadcast::Sender<Frame> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(*document)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscribers for a document.
    pub fn subscriber_count(&self, document: &DocumentId) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.get(document).map_or(0, |tx| tx.receiver_count())
    }
}

#[async_trait]
impl OperationBus for LocalBus {
    async fn publish(&self, document: &DocumentId, frame: Frame) -> SyncResult<()> {
        // A send error only means nobody is listening.
        if self.sender(document).send(frame).is_err() {
            debug!(%document, "published with no subscribers");
        }
        Ok(())
    }

    fn subscribe(&self, document: &DocumentId) -> broadcast::Receiver<Frame> {
        self.sender(document).subscribe()
    }
}
