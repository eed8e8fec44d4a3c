//! Client-side reconciliation for gridsync.
//!
//! Keeps a local [`GridStore`](gridsync_store::GridStore) consistent with an
//! asynchronous stream of server confirmations, including the bootstrap race
//! between fetching the full baseline and receiving live updates.
//!
//! - [`UpdateReconciler`] handles each inbound confirmation, buffering it
//!   until the baseline has loaded.
//! - [`Bootstrapper`] fetches the baseline, merges it, drains the buffer and
//!   flips the replica live as one step (see [`ReplicaGate`]).
//! - [`SyncSession`] runs the connect → register → listen loop and
//!   reconnects when the connection ends.
//! - [`InMemoryHub`] / [`InMemoryTransport`] are an in-process collaborator
//!   implementing [`CollabTransport`].

pub mod backoff;
pub mod bootstrap;
pub mod error;
pub mod gate;
pub mod memory;
pub mod readiness;
pub mod reconciler;
pub mod session;
pub mod stats;
pub mod transport;
pub mod types;

pub use backoff::Backoff;
pub use bootstrap::Bootstrapper;
pub use error::{SyncError, SyncResult};
pub use gate::{PendingBuffer, ReplicaGate};
pub use memory::{InMemoryHub, InMemoryTransport};
pub use readiness::ReadinessState;
pub use reconciler::UpdateReconciler;
pub use session::{SessionConfig, SyncSession};
pub use stats::{RateMeter, SyncCounters, SyncStats};
pub use transport::{CollabTransport, InboundHandler};
pub use types::{BaselineReport, Disposition, Inbound, OutgoingChange, PropertyEntry, SyncPhase};
