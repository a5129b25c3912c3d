//! Host-side state of one replicated document.
//!
//! A [`DocumentSession`] owns the document's [`Sequence`] and the progress of
//! every client attached to it. All mutation happens under one async mutex, and
//! `apply_operation` runs to completion while it is held; the lock is released
//! before any store write or bus publish.
//!
//! Hosts of the same document share their clients' collection horizon over
//! the bus. A host only collects what its own clients and every peer that
//! reported within the grace period have observed.

use crate::bus::{Frame, OperationBus};
use crate::codec;
use crate::config::HostConfig;
use crate::error::SyncResult;
use crate::protocol::{
    AckMessage, ErrorMessage, HorizonMessage, JoinMessage, ResyncMessage, SnapshotMessage,
    WireMessage, PROTOCOL_VERSION,
};
use braid_crdt::{
    compute_safe_horizon, ApplyOutcome, CausalityVector, Operation, Sequence, SequenceSnapshot,
    SessionClock,
};
use braid_storage::DocumentStore;
use braid_types::{DocumentId, SiteId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Store handle shared by every session of a host.
pub type SharedStore = Arc<dyn DocumentStore<char>>;

/// Mutable state, only touched under the session lock.
struct State {
    sequence: Sequence<char>,
    clients: HashMap<SiteId, SessionClock>,
    /// Horizon reports from other hosts; `disconnected_at` is when the
    /// report arrived.
    peers: HashMap<SiteId, SessionClock>,
    applied_since_snapshot: usize,
}

/// One open document at a host.
pub struct DocumentSession {
    document: DocumentId,
    config: HostConfig,
    store: SharedStore,
    bus: Arc<dyn OperationBus>,
    state: Mutex<State>,
}

/// Current time on the tokio clock, so paused test clocks apply.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl DocumentSession {
    /// Loads a document: the latest snapshot, then every logged operation the
    /// snapshot does not cover.
    pub async fn open(
        document: DocumentId,
        site: SiteId,
        config: HostConfig,
        store: SharedStore,
        bus: Arc<dyn OperationBus>,
    ) -> SyncResult<Self> {
        let loader = Arc::clone(&store);
        let (snapshot, replay) = tokio::task::spawn_blocking(move || -> SyncResult<_> {
            let snapshot = loader.load_latest_snapshot(&document)?;
            let vector = snapshot
                .as_ref()
                .map(|s: &SequenceSnapshot<char>| s.vector.clone())
                .unwrap_or_default();
            let replay = loader.operations_since(&document, &vector)?;
            Ok((snapshot, replay))
        })
        .await??;

        let mut sequence = match snapshot {
            Some(snapshot) => Sequence::from_snapshot(site, snapshot)?,
            None => Sequence::new(site),
        };
        let replayed = replay.len();
        for op in replay {
            if let Err(e) = sequence.apply_operation(op) {
                warn!(%document, "skipping logged operation: {}", e);
            }
        }
        log_rejected(&document, &mut sequence);
        info!(%document, live = sequence.len(), replayed, "opened document");

        Ok(Self {
            document,
            config,
            store,
            bus,
            state: Mutex::new(State {
                sequence,
                clients: HashMap::new(),
                peers: HashMap::new(),
                applied_since_snapshot: 0,
            }),
        })
    }

    /// Returns the document ID.
    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// Current live content.
    pub async fn value(&self) -> String {
        self.state.lock().await.sequence.as_string()
    }

    /// Operations applied at this host.
    pub async fn vector(&self) -> CausalityVector {
        self.state.lock().await.sequence.vector().clone()
    }

    /// Elements held in memory, tombstones included.
    pub async fn element_count(&self) -> usize {
        self.state.lock().await.sequence.element_count()
    }

    /// Clients known to this session, connected or within grace.
    pub async fn client_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }

    /// Other hosts that have reported a horizon for this document.
    pub async fn peer_count(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    /// Full-state message for this document.
    pub async fn snapshot_message(&self) -> WireMessage<char> {
        let state = self.state.lock().await;
        WireMessage::Snapshot(SnapshotMessage {
            document: self.document,
            snapshot: state.sequence.to_snapshot(),
        })
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Attaches a client and returns what it must receive to catch up.
    ///
    /// Without a vector the client gets a snapshot; with one it gets the
    /// operations the vector does not cover, then an `Ack` with the host
    /// vector. A version mismatch is answered with an error frame and the
    /// client is not attached.
    pub async fn join(&self, join: &JoinMessage) -> SyncResult<Vec<WireMessage<char>>> {
        if join.version != PROTOCOL_VERSION {
            warn!(site = %join.site, version = join.version, "rejecting join");
            return Ok(vec![WireMessage::Error(ErrorMessage::version_mismatch(
                PROTOCOL_VERSION,
                join.version,
            ))]);
        }
        if join.document != self.document {
            return Ok(vec![WireMessage::Error(ErrorMessage::new(
                2,
                format!("session hosts {}, not {}", self.document, join.document),
            ))]);
        }

        match &join.vector {
            None => {
                let mut state = self.state.lock().await;
                let snapshot = state.sequence.to_snapshot();
                state
                    .clients
                    .insert(join.site, SessionClock::attached(snapshot.vector.clone()));
                info!(document = %self.document, site = %join.site, "client joined with snapshot");
                Ok(vec![WireMessage::Snapshot(SnapshotMessage {
                    document: self.document,
                    snapshot,
                })])
            }
            Some(vector) => {
                self.attach(join.site, vector).await;
                let replies = self.catch_up(vector).await?;
                info!(
                    document = %self.document,
                    site = %join.site,
                    missing = replies.len() - 1,
                    "client rejoined"
                );
                Ok(replies)
            }
        }
    }

    /// Answers a resync request with the operations `vector` does not cover.
    pub async fn resync(
        &self,
        site: SiteId,
        vector: &CausalityVector,
    ) -> SyncResult<Vec<WireMessage<char>>> {
        self.attach(site, vector).await;
        self.catch_up(vector).await
    }

    /// Records a client's reported vector.
    pub async fn acknowledge(&self, site: SiteId, vector: &CausalityVector) {
        self.attach(site, vector).await;
    }

    /// Marks a client as disconnected. It keeps holding back collection for
    /// the configured grace period.
    pub async fn leave(&self, site: SiteId) {
        let mut state = self.state.lock().await;
        if let Some(clock) = state.clients.get_mut(&site) {
            clock.disconnected_at = Some(now());
            debug!(document = %self.document, %site, "client left");
        }
    }

    async fn attach(&self, site: SiteId, vector: &CausalityVector) {
        let mut state = self.state.lock().await;
        let clock = state
            .clients
            .entry(site)
            .or_insert_with(|| SessionClock::attached(CausalityVector::new()));
        clock.vector.merge(vector);
        clock.disconnected_at = None;
    }

    async fn catch_up(&self, vector: &CausalityVector) -> SyncResult<Vec<WireMessage<char>>> {
        let mut replies: Vec<WireMessage<char>> = self
            .logged_since(vector)
            .await?
            .into_iter()
            .map(WireMessage::from)
            .collect();
        replies.push(WireMessage::Ack(AckMessage {
            vector: self.vector().await,
        }));
        Ok(replies)
    }

    async fn logged_since(&self, vector: &CausalityVector) -> SyncResult<Vec<Operation<char>>> {
        let store = Arc::clone(&self.store);
        let document = self.document;
        let known = vector.clone();
        let missing =
            tokio::task::spawn_blocking(move || store.operations_since(&document, &known)).await??;
        Ok(missing)
    }

    // ── Other hosts ──────────────────────────────────────────────

    /// Records a horizon reported by another host. Reports from this host's
    /// own site are ignored.
    pub async fn observe_peer(&self, report: &HorizonMessage) {
        let mut state = self.state.lock().await;
        if report.site == state.sequence.site() {
            return;
        }
        let clock = state
            .peers
            .entry(report.site)
            .or_insert_with(|| SessionClock::attached(CausalityVector::new()));
        clock.vector = report.vector.clone();
        clock.disconnected_at = Some(now());
        debug!(document = %self.document, peer = %report.site, "peer horizon updated");
    }

    /// Publishes this host's horizon so other hosts hold back collection
    /// for its clients.
    pub async fn announce(&self) -> SyncResult<()> {
        let (site, vector) = {
            let state = self.state.lock().await;
            (state.sequence.site(), self.local_horizon(&state, now()))
        };
        self.publish(&WireMessage::Horizon(HorizonMessage { site, vector }))
            .await
    }

    /// Asks the other hosts for every operation this host has not applied.
    pub async fn request_missing(&self) -> SyncResult<()> {
        let vector = self.vector().await;
        info!(document = %self.document, "requesting missed operations from peers");
        self.publish(&WireMessage::Resync(ResyncMessage { vector }))
            .await
    }

    /// Republishes logged operations `vector` does not cover, in answer to
    /// another host's request. Returns how many were sent.
    pub async fn answer_resync(&self, vector: &CausalityVector) -> SyncResult<usize> {
        let missing = self.logged_since(vector).await?;
        let count = missing.len();
        for op in missing {
            self.publish(&WireMessage::from(op)).await?;
            // Lets subscribers drain so the answer does not overrun the bus.
            tokio::task::yield_now().await;
        }
        if count > 0 {
            debug!(document = %self.document, count, "republished operations for a peer");
        }
        Ok(count)
    }

    async fn publish(&self, message: &WireMessage<char>) -> SyncResult<()> {
        let frame: Frame = codec::encode(message)?.into();
        self.bus.publish(&self.document, frame).await
    }

    // ── Operations ───────────────────────────────────────────────

    /// Applies an operation sent by the client `from`, persists it and
    /// publishes it to the bus.
    ///
    /// Structural errors (such as an anchor this host already collected) are
    /// returned for the transport to report; nothing is persisted for them.
    pub async fn receive(&self, from: SiteId, op: Operation<char>) -> SyncResult<ApplyOutcome> {
        let outcome = self.integrate(Some(from), &op).await?;
        if outcome != ApplyOutcome::Duplicate {
            self.publish(&WireMessage::from(op)).await?;
        }
        Ok(outcome)
    }

    /// Applies an operation that arrived over the bus. Not republished.
    pub async fn absorb(&self, op: Operation<char>) -> SyncResult<ApplyOutcome> {
        self.integrate(None, &op).await
    }

    async fn integrate(
        &self,
        from: Option<SiteId>,
        op: &Operation<char>,
    ) -> SyncResult<ApplyOutcome> {
        let (outcome, snapshot) = {
            let mut state = self.state.lock().await;
            let outcome = state.sequence.apply_operation(op.clone())?;
            log_rejected(&self.document, &mut state.sequence);

            // A client has applied everything it originated.
            if let Some(site) = from.filter(|site| *site == op.origin_site()) {
                if let Some(clock) = state.clients.get_mut(&site) {
                    clock.vector.update(site, op.counter());
                }
            }

            if let ApplyOutcome::Applied { count } = outcome {
                state.applied_since_snapshot += count;
            }
            let snapshot = if state.applied_since_snapshot >= self.config.snapshot_every {
                state.applied_since_snapshot = 0;
                Some(state.sequence.to_snapshot())
            } else {
                None
            };
            (outcome, snapshot)
        };

        if outcome == ApplyOutcome::Duplicate {
            return Ok(outcome);
        }
        self.append(op.clone()).await;
        if let Some(snapshot) = snapshot {
            self.save_snapshot(snapshot).await;
        }
        Ok(outcome)
    }

    async fn append(&self, op: Operation<char>) {
        let store = Arc::clone(&self.store);
        let document = self.document;
        match tokio::task::spawn_blocking(move || store.append_operation(&document, &op)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(%document, "failed to log operation: {}", e),
            Err(e) => warn!(%document, "spawn_blocking panicked logging operation: {}", e),
        }
    }

    async fn save_snapshot(&self, snapshot: SequenceSnapshot<char>) {
        let store = Arc::clone(&self.store);
        let document = self.document;
        match tokio::task::spawn_blocking(move || store.save_snapshot(&document, &snapshot)).await {
            Ok(Ok(())) => debug!(%document, "snapshot saved"),
            // The log still holds everything; the next open replays it.
            Ok(Err(e)) => warn!(%document, "failed to save snapshot: {}", e),
            Err(e) => warn!(%document, "spawn_blocking panicked saving snapshot: {}", e),
        }
    }

    // ── Collection ───────────────────────────────────────────────

    /// Minimum vector over this host's clients that are connected or
    /// disconnected within the grace period, capped at what the host holds.
    fn local_horizon(&self, state: &State, now: Instant) -> CausalityVector {
        compute_safe_horizon(state.clients.values(), now, self.config.session_grace)
            .met(state.sequence.vector())
    }

    /// Runs one collection pass over the document.
    ///
    /// The horizon is this host's own client horizon, further limited by the
    /// latest report of every peer heard from within the grace period.
    /// Clients and peers past it are forgotten. The host's own horizon is
    /// then published for its peers. Saves a snapshot if anything was
    /// reclaimed.
    pub async fn collect_garbage(&self) -> SyncResult<usize> {
        let now = now();
        let grace = self.config.session_grace;

        let (removed, snapshot, report) = {
            let mut state = self.state.lock().await;
            let local = self.local_horizon(&state, now);
            let mut horizon = local.clone();
            if state.peers.values().any(|peer| peer.is_included(now, grace)) {
                horizon.meet(&compute_safe_horizon(state.peers.values(), now, grace));
            }
            let removed = state.sequence.collect(&horizon);

            let before = state.clients.len();
            state.clients.retain(|_, clock| clock.is_included(now, grace));
            let expired = before - state.clients.len();
            if expired > 0 {
                info!(document = %self.document, expired, "dropped clients past grace");
            }
            state.peers.retain(|_, clock| clock.is_included(now, grace));

            let snapshot = (removed > 0).then(|| state.sequence.to_snapshot());
            let report = HorizonMessage {
                site: state.sequence.site(),
                vector: local,
            };
            (removed, snapshot, report)
        };

        if let Some(snapshot) = snapshot {
            info!(document = %self.document, removed, "collected tombstones");
            self.save_snapshot(snapshot).await;
        }
        self.publish(&WireMessage::Horizon(report)).await?;
        Ok(removed)
    }
}

fn log_rejected(document: &DocumentId, sequence: &mut Sequence<char>) {
    for rejected in sequence.take_rejected() {
        warn!(
            %document,
            site = %rejected.operation.origin_site(),
            counter = rejected.operation.counter(),
            "dropped buffered operation: {}",
            rejected.error
        );
    }
}
