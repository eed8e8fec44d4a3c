//! Foundation types for gridsync.
//!
//! A grid object is a mapping from [`Coordinate`] to [`Cell`]. On the wire
//! each cell is a property whose key is produced by [`PropertyCodec`] and
//! whose payload is the four RGBA bytes of the cell.
//!
//! # Key Types
//!
//! - [`Coordinate`]: integer grid position, unique key into the grid
//! - [`GridBounds`]: width/height of the grid configured at startup
//! - [`Cell`]: RGBA color of one grid unit
//! - [`PropertyCodec`]: `"<x>-<y>"` wire key encoding

pub mod cell;
pub mod codec;
pub mod coordinate;
pub mod error;

pub use cell::Cell;
pub use codec::PropertyCodec;
pub use coordinate::{Coordinate, GridBounds};
pub use error::TypeError;
