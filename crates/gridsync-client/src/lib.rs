//! High-level gridsync client.
//!
//! [`GridClient`] wires a [`GridStore`](gridsync_store::GridStore), the
//! reconciliation session from `gridsync-sync`, and an optional
//! [`RandomMutator`] into one replica of a shared grid object, configured by
//! a [`ClientConfig`].

pub mod client;
pub mod config;
pub mod error;
pub mod mutator;

pub use client::{ClientHandle, GridClient};
pub use config::{ChannelMask, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use mutator::{RandomMutator, TickOutcome, CHANNEL_FLOOR};

pub use gridsync_store::{CellMap, ConsistencyHasher, Digest, GridStore};
pub use gridsync_sync::{CollabTransport, InMemoryHub, InMemoryTransport, SyncPhase, SyncStats};
pub use gridsync_types::{Cell, Coordinate, GridBounds, PropertyCodec};
