use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::gate::ReplicaGate;
use crate::readiness::ReadinessState;
use crate::transport::CollabTransport;
use crate::types::BaselineReport;

/// Loads the authoritative baseline into the replica and switches it live.
pub struct Bootstrapper {
    transport: Arc<dyn CollabTransport>,
    gate: Arc<ReplicaGate>,
    readiness: Arc<ReadinessState>,
}

impl Bootstrapper {
    pub fn new(
        transport: Arc<dyn CollabTransport>,
        gate: Arc<ReplicaGate>,
        readiness: Arc<ReadinessState>,
    ) -> Self {
        Self { transport, gate, readiness }
    }

    /// Fetch the full object, merge it into the store, drain anything the
    /// reconciler buffered meanwhile, and set both readiness flags.
    ///
    /// Entries with empty or self-referential keys and entries that fail to
    /// decode are skipped. A failed fetch leaves the replica buffering.
    pub async fn load_baseline(&self, object_id: &str) -> SyncResult<BaselineReport> {
        debug!(object_id, "loading baseline");
        let entries = self
            .transport
            .get_object(object_id)
            .await
            .map_err(|e| match e {
                SyncError::Fetch(_) => e,
                other => SyncError::Fetch(other.to_string()),
            })?;

        let mut report = BaselineReport::default();
        let mut cells = Vec::with_capacity(entries.len());
        for entry in &entries {
            match entry.decode_for(object_id) {
                Ok(Some(pair)) => cells.push(pair),
                Ok(None) => report.ignored += 1,
                Err(e) => {
                    report.malformed += 1;
                    warn!(key = %entry.key, error = %e, "skipping malformed baseline entry");
                }
            }
        }
        report.applied = cells.len();
        report.drained = self.gate.complete_baseline(cells);
        self.readiness.mark_ready();

        info!(
            object_id,
            applied = report.applied,
            ignored = report.ignored,
            malformed = report.malformed,
            drained = report.drained,
            "baseline loaded"
        );
        Ok(report)
    }
}
