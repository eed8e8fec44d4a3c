use std::sync::Arc;

use gridsync_store::{CellMap, ConsistencyHasher, Digest, GridStore};
use gridsync_sync::{
    Bootstrapper, CollabTransport, ReadinessState, ReplicaGate, SyncCounters, SyncPhase,
    SyncSession, SyncStats, UpdateReconciler,
};
use gridsync_types::Cell;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::mutator::RandomMutator;

/// One replica of a shared grid object.
///
/// Owns the local [`GridStore`] and hands it, by `Arc`, to the sync session
/// and the random mutator.
pub struct GridClient {
    config: ClientConfig,
    store: Arc<GridStore>,
    readiness: Arc<ReadinessState>,
    counters: Arc<SyncCounters>,
    transport: Arc<dyn CollabTransport>,
    session: Arc<SyncSession>,
    mutator: Arc<RandomMutator>,
}

impl GridClient {
    /// Build a replica with every in-bounds cell pre-filled black.
    pub fn new(config: ClientConfig, transport: Arc<dyn CollabTransport>) -> ClientResult<Self> {
        config.validate()?;

        let store = Arc::new(GridStore::with_default(config.bounds(), Cell::BLACK));
        let gate = Arc::new(ReplicaGate::new(Arc::clone(&store)));
        let readiness = Arc::new(ReadinessState::new());
        let counters = Arc::new(SyncCounters::new());

        let reconciler = Arc::new(UpdateReconciler::new(
            config.object_id.clone(),
            Arc::clone(&gate),
            Arc::clone(&counters),
        ));
        let bootstrapper = Bootstrapper::new(Arc::clone(&transport), gate, Arc::clone(&readiness));
        let session = Arc::new(SyncSession::new(
            Arc::clone(&transport),
            reconciler,
            bootstrapper,
            Arc::clone(&readiness),
            config.session(),
        ));
        let mutator = Arc::new(RandomMutator::new(
            config.object_id.clone(),
            config.bounds(),
            config.keep,
            config.edit_interval(),
            Arc::clone(&store),
            Arc::clone(&transport),
            Arc::clone(&readiness),
            Arc::clone(&counters),
        ));

        Ok(Self {
            config,
            store,
            readiness,
            counters,
            transport,
            session,
            mutator,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<GridStore> {
        &self.store
    }

    pub fn readiness(&self) -> &Arc<ReadinessState> {
        &self.readiness
    }

    pub fn mutator(&self) -> &Arc<RandomMutator> {
        &self.mutator
    }

    pub fn phase(&self) -> SyncPhase {
        self.session.phase()
    }

    pub fn snapshot(&self) -> CellMap {
        self.store.snapshot()
    }

    pub fn digest(&self) -> Digest {
        ConsistencyHasher::digest(&self.store)
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            phase: self.session.phase(),
            total_confirmations: self.counters.confirmations.total(),
            confirmations_per_sec: self.counters.confirmations.rate(),
            sends: self.counters.sends.total(),
            sends_per_sec: self.counters.sends.rate(),
            malformed: self.counters.malformed(),
            send_failures: self.counters.send_failures(),
            conflicts: self.transport.conflicts_count(),
            changes: self.transport.change_count(),
            digest: self.digest().to_string(),
        }
    }

    /// Start the sync session, and the mutator when `send` is configured, on
    /// the current Tokio runtime.
    pub fn spawn(&self) -> ClientHandle {
        let session = Arc::clone(&self.session);
        let session = tokio::spawn(async move { session.run().await });
        let editing = self.config.send.then(|| {
            let mutator = Arc::clone(&self.mutator);
            tokio::spawn(async move { mutator.run().await })
        });
        info!(
            object_id = %self.config.object_id,
            host = %self.config.host,
            send = self.config.send,
            keep = self.config.keep.label(),
            "replica started"
        );
        ClientHandle { session, editing }
    }
}

/// Running tasks of a [`GridClient`]. Dropping the handle stops them.
pub struct ClientHandle {
    session: JoinHandle<()>,
    editing: Option<JoinHandle<()>>,
}

impl ClientHandle {
    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Stop generating local edits; the replica keeps applying confirmations.
    pub fn stop_editing(&mut self) {
        if let Some(task) = self.editing.take() {
            task.abort();
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.stop_editing();
        self.session.abort();
    }
}
