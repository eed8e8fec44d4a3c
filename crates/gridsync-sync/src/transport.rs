use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::types::{Inbound, OutgoingChange, PropertyEntry};

/// Receiver of inbound deliveries, invoked on the collaborator's listen task.
///
/// Implementations must not perform network I/O and must only block on the
/// local store lock.
pub trait InboundHandler: Send + Sync {
    fn on_inbound(&self, inbound: Inbound) -> SyncResult<()>;
}

/// Interface to the collaboration server for one client.
#[async_trait]
pub trait CollabTransport: Send + Sync {
    async fn connect(&self) -> SyncResult<()>;

    /// Subscribe to confirmations for `object_id`. Confirmations issued after
    /// this returns are delivered by the next [`listen`](Self::listen).
    async fn register_to_object(&self, object_id: &str) -> SyncResult<()>;

    /// Deliver inbound changes to `handler`, one call per change, until the
    /// connection ends.
    async fn listen(&self, handler: Arc<dyn InboundHandler>) -> SyncResult<()>;

    /// Full authoritative property list of an object.
    async fn get_object(&self, object_id: &str) -> SyncResult<Vec<PropertyEntry>>;

    /// Forward a local edit. Best effort; no retry.
    async fn send_change(&self, change: &OutgoingChange) -> SyncResult<()>;

    /// Local edits overridden by server-ordered edits.
    fn conflicts_count(&self) -> u64;

    /// Changes delivered to this client.
    fn change_count(&self) -> u64;
}
