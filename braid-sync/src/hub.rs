//! Registry of the documents open at a host.

use crate::bus::{Frame, OperationBus};
use crate::codec;
use crate::config::HostConfig;
use crate::error::SyncResult;
use crate::protocol::WireMessage;
use crate::session::{DocumentSession, SharedStore};
use braid_types::{DocumentId, SiteId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct OpenDocument {
    session: Arc<DocumentSession>,
    listener: JoinHandle<()>,
}

/// Opens documents on demand and keeps one [`DocumentSession`] per document.
///
/// Every open document is subscribed to the bus, so operations applied by
/// other hosts of the same document are absorbed here too, along with their
/// horizon reports. A listener that falls behind the bus asks its peers to
/// republish what it missed.
pub struct Hub {
    site: SiteId,
    config: HostConfig,
    store: SharedStore,
    bus: Arc<dyn OperationBus>,
    documents: RwLock<HashMap<DocumentId, OpenDocument>>,
}

impl Hub {
    /// Creates a hub. `site` is this host's replica id.
    pub fn new(
        site: SiteId,
        config: HostConfig,
        store: SharedStore,
        bus: Arc<dyn OperationBus>,
    ) -> Self {
        Self {
            site,
            config,
            store,
            bus,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Returns this host's site.
    pub fn site(&self) -> SiteId {
        self.site
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Returns the bus.
    pub fn bus(&self) -> &Arc<dyn OperationBus> {
        &self.bus
    }

    /// Returns the session for `document`, loading it if needed.
    pub async fn open(&self, document: DocumentId) -> SyncResult<Arc<DocumentSession>> {
        if let Some(open) = self.documents.read().await.get(&document) {
            return Ok(Arc::clone(&open.session));
        }

        let mut documents = self.documents.write().await;
        if let Some(open) = documents.get(&document) {
            return Ok(Arc::clone(&open.session));
        }

        let session = Arc::new(
            DocumentSession::open(
                document,
                self.site,
                self.config.clone(),
                Arc::clone(&self.store),
                Arc::clone(&self.bus),
            )
            .await?,
        );
        let frames = self.bus.subscribe(&document);
        let listener = tokio::spawn(absorb_bus(Arc::clone(&session), frames));
        documents.insert(
            document,
            OpenDocument {
                session: Arc::clone(&session),
                listener,
            },
        );
        drop(documents);

        // Peers hold back collection until this host reports again.
        if let Err(e) = session.announce().await {
            warn!(%document, "failed to announce horizon: {}", e);
        }
        Ok(session)
    }

    /// Returns the session for `document` if it is open.
    pub async fn get(&self, document: &DocumentId) -> Option<Arc<DocumentSession>> {
        self.documents
            .read()
            .await
            .get(document)
            .map(|open| Arc::clone(&open.session))
    }

    /// IDs of the open documents.
    pub async fn documents(&self) -> Vec<DocumentId> {
        self.documents.read().await.keys().copied().collect()
    }

    /// Runs one collection pass over every open document.
    pub async fn collect_all(&self) -> usize {
        let sessions: Vec<Arc<DocumentSession>> = self
            .documents
            .read()
            .await
            .values()
            .map(|open| Arc::clone(&open.session))
            .collect();

        let mut removed = 0;
        for session in sessions {
            match session.collect_garbage().await {
                Ok(n) => removed += n,
                Err(e) => warn!(document = %session.document(), "collection failed: {}", e),
            }
        }
        removed
    }

    /// Starts the periodic collection task. It stops once the hub is dropped.
    pub fn spawn_gc(self: &Arc<Self>) -> JoinHandle<()> {
        let hub: Weak<Self> = Arc::downgrade(self);
        let period = self.config.gc_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(hub) = hub.upgrade() else {
                    break;
                };
                let removed = hub.collect_all().await;
                debug!(removed, "collection pass finished");
            }
        })
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        for open in self.documents.get_mut().values() {
            open.listener.abort();
        }
    }
}

async fn absorb_bus(session: Arc<DocumentSession>, mut frames: broadcast::Receiver<Frame>) {
    let document = session.document();
    loop {
        match frames.recv().await {
            Ok(frame) => {
                let message = match codec::decode::<char>(&frame) {
                    Ok((message, _)) => message,
                    Err(e) => {
                        warn!(%document, "dropping undecodable bus frame: {}", e);
                        continue;
                    }
                };
                let result = match message {
                    WireMessage::Horizon(report) => {
                        session.observe_peer(&report).await;
                        Ok(())
                    }
                    WireMessage::Resync(request) => {
                        session.answer_resync(&request.vector).await.map(|_| ())
                    }
                    other => match other.into_operation() {
                        Some(op) => session.absorb(op).await.map(|_| ()),
                        None => Ok(()),
                    },
                };
                if let Err(e) = result {
                    warn!(%document, "bus frame rejected: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(%document, skipped, "bus listener lagged");
                if let Err(e) = session.request_missing().await {
                    warn!(%document, "failed to request missed operations: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
