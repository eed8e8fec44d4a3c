use std::sync::Arc;

use gridsync_types::{Cell, PropertyCodec};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::gate::ReplicaGate;
use crate::stats::SyncCounters;
use crate::transport::InboundHandler;
use crate::types::{Disposition, Inbound, PropertyEntry};

/// Applies server confirmations to the local replica.
///
/// Before the baseline has loaded confirmations are buffered; afterwards
/// they are written straight into the store. Runs on the collaborator's
/// listen task and never does I/O.
pub struct UpdateReconciler {
    object_id: String,
    gate: Arc<ReplicaGate>,
    counters: Arc<SyncCounters>,
}

impl UpdateReconciler {
    pub fn new(object_id: impl Into<String>, gate: Arc<ReplicaGate>, counters: Arc<SyncCounters>) -> Self {
        Self {
            object_id: object_id.into(),
            gate,
            counters,
        }
    }

    /// Handle one confirmed property change.
    ///
    /// A key or payload that fails to decode is counted and the update is
    /// dropped with [`SyncError::Decode`].
    pub fn on_confirmation(&self, key: &str, data: &[u8]) -> SyncResult<Disposition> {
        let decoded = PropertyCodec::decode(key).and_then(|coord| Ok((coord, Cell::from_bytes(data)?)));
        let (coord, cell) = match decoded {
            Ok(pair) => pair,
            Err(e) => {
                self.counters.record_malformed();
                warn!(key, error = %e, "dropping malformed confirmation");
                return Err(SyncError::Decode(e));
            }
        };
        self.counters.confirmations.record();
        Ok(self.gate.offer(coord, cell))
    }

    /// Apply a pushed snapshot entry by entry, in order, through the same
    /// buffer-or-apply path. Non-cell entries are skipped; malformed ones are
    /// counted and skipped.
    pub fn on_snapshot(&self, entries: &[PropertyEntry]) -> usize {
        let mut offered = 0;
        for entry in entries {
            match entry.decode_for(&self.object_id) {
                Ok(Some((coord, cell))) => {
                    self.counters.confirmations.record();
                    self.gate.offer(coord, cell);
                    offered += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    self.counters.record_malformed();
                    warn!(key = %entry.key, error = %e, "skipping malformed snapshot entry");
                }
            }
        }
        debug!(offered, total = entries.len(), "snapshot reconciled");
        offered
    }

    /// Return to buffering ahead of a new baseline.
    pub fn begin_buffering(&self) {
        self.gate.rearm();
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl InboundHandler for UpdateReconciler {
    fn on_inbound(&self, inbound: Inbound) -> SyncResult<()> {
        match inbound {
            Inbound::Property { key, data } => self.on_confirmation(&key, &data).map(|_| ()),
            Inbound::Snapshot { entries } => {
                self.on_snapshot(&entries);
                Ok(())
            }
        }
    }
}
