//! Local grid storage for gridsync.
//!
//! [`GridStore`] is the local mirror of a remote grid object. Every read and
//! write takes the same exclusive lock for the shortest possible span, and
//! readers only ever work on copied snapshots. [`ConsistencyHasher`] derives a
//! cheap digest from such a snapshot so independently running replicas can be
//! compared.

pub mod digest;
pub mod grid;

pub use digest::{ConsistencyHasher, Digest};
pub use grid::{CellMap, GridStore};
