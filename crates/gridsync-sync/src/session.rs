use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::bootstrap::Bootstrapper;
use crate::error::{SyncError, SyncResult};
use crate::readiness::ReadinessState;
use crate::reconciler::UpdateReconciler;
use crate::transport::{CollabTransport, InboundHandler};
use crate::types::{BaselineReport, SyncPhase};

/// Timing of the reconnect loop.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Fixed pause after a live connection ends.
    pub reconnect_delay: Duration,
    /// First retry delay after a failed connect, register, or baseline fetch.
    pub retry_base: Duration,
    /// Upper bound for the retry delay.
    pub retry_max: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(100),
            retry_base: Duration::from_millis(250),
            retry_max: Duration::from_secs(10),
        }
    }
}

/// Drives one replica through `CONNECTING → REGISTERED → LIVE`, forever.
///
/// Listening starts before the baseline fetch so no confirmation issued
/// after registration is missed; the reconciler buffers them until the
/// bootstrapper has merged the baseline.
pub struct SyncSession {
    object_id: String,
    transport: Arc<dyn CollabTransport>,
    reconciler: Arc<UpdateReconciler>,
    bootstrapper: Bootstrapper,
    readiness: Arc<ReadinessState>,
    phase: AtomicU8,
    config: SessionConfig,
}

impl SyncSession {
    pub fn new(
        transport: Arc<dyn CollabTransport>,
        reconciler: Arc<UpdateReconciler>,
        bootstrapper: Bootstrapper,
        readiness: Arc<ReadinessState>,
        config: SessionConfig,
    ) -> Self {
        Self {
            object_id: reconciler.object_id().to_string(),
            transport,
            reconciler,
            bootstrapper,
            readiness,
            phase: AtomicU8::new(SyncPhase::Init.as_u8()),
            config,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        SyncPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn enter(&self, phase: SyncPhase) {
        let prev = SyncPhase::from_u8(self.phase.swap(phase.as_u8(), Ordering::SeqCst));
        if prev != phase {
            debug!(object_id = %self.object_id, from = %prev, to = %phase, "sync phase");
        }
    }

    /// Run connect/register/listen cycles until the task is dropped.
    ///
    /// A cycle that ends after going live waits the fixed reconnect delay;
    /// one that fails earlier backs off exponentially.
    pub async fn run(&self) {
        let mut backoff = Backoff::new(self.config.retry_base, self.config.retry_max);
        loop {
            let result = self.run_once().await;
            let was_live = self.phase() == SyncPhase::Live;
            self.enter(SyncPhase::Connecting);
            let delay = match result {
                Ok(()) => {
                    info!(object_id = %self.object_id, "connection ended; reconnecting");
                    backoff.reset();
                    self.config.reconnect_delay
                }
                Err(e) if was_live => {
                    warn!(object_id = %self.object_id, error = %e, "live connection failed; reconnecting");
                    backoff.reset();
                    self.config.reconnect_delay
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(object_id = %self.object_id, error = %e, ?delay, "sync cycle failed; retrying");
                    delay
                }
            };
            tokio::time::sleep(delay).await;
        }
    }

    /// One full cycle: connect, register, bootstrap while listening, then
    /// listen until the connection ends.
    pub async fn run_once(&self) -> SyncResult<()> {
        self.enter(SyncPhase::Connecting);
        self.readiness.suspend_sending();
        self.reconciler.begin_buffering();

        self.transport.connect().await?;
        self.transport.register_to_object(&self.object_id).await?;
        self.enter(SyncPhase::Registered);

        let handler: Arc<dyn InboundHandler> = self.reconciler.clone();
        let listen = self.transport.listen(handler);
        tokio::pin!(listen);

        let report: BaselineReport = tokio::select! {
            ended = &mut listen => {
                ended?;
                return Err(SyncError::Disconnected("connection ended before baseline loaded".into()));
            }
            loaded = self.bootstrapper.load_baseline(&self.object_id) => loaded?,
        };
        self.enter(SyncPhase::Live);
        info!(object_id = %self.object_id, drained = report.drained, "replica live");

        listen.await
    }
}
