use std::fmt;

use gridsync_types::{Cell, Coordinate, PropertyCodec, TypeError};
use serde::{Deserialize, Serialize};

/// One property of a remote object as delivered by the collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub key: String,
    pub data: Vec<u8>,
}

impl PropertyEntry {
    pub fn new(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into(), data: data.into() }
    }

    /// Build the entry for a grid cell.
    pub fn for_cell(coord: Coordinate, cell: Cell) -> Self {
        Self::new(PropertyCodec::encode(coord), cell.to_bytes())
    }

    /// Decode the entry as a grid cell of `object_id`.
    ///
    /// Returns `Ok(None)` for entries that are not cells at all: an empty key
    /// or a property named after the object itself.
    pub fn decode_for(&self, object_id: &str) -> Result<Option<(Coordinate, Cell)>, TypeError> {
        if self.key.is_empty() || self.key == object_id {
            return Ok(None);
        }
        let coord = PropertyCodec::decode(&self.key)?;
        let cell = Cell::from_bytes(&self.data)?;
        Ok(Some((coord, cell)))
    }
}

/// A local edit forwarded to the remote authority for confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingChange {
    pub object_id: String,
    pub key: String,
    pub data: Vec<u8>,
}

impl OutgoingChange {
    pub fn for_cell(object_id: impl Into<String>, coord: Coordinate, cell: Cell) -> Self {
        Self {
            object_id: object_id.into(),
            key: PropertyCodec::encode(coord),
            data: cell.to_bytes().to_vec(),
        }
    }
}

/// Inbound delivery from the collaborator, decoded once at the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A single server-confirmed property change.
    Property { key: String, data: Vec<u8> },
    /// A full object snapshot pushed by the server.
    Snapshot { entries: Vec<PropertyEntry> },
}

/// Lifecycle of a sync session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPhase {
    #[default]
    Init,
    Connecting,
    /// Registered and listening; confirmations are buffered until the
    /// baseline has loaded.
    Registered,
    /// Baseline loaded; confirmations are applied directly.
    Live,
}

impl SyncPhase {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::Connecting => 1,
            Self::Registered => 2,
            Self::Live => 3,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Registered,
            3 => Self::Live,
            _ => Self::Init,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Connecting => "connecting",
            Self::Registered => "registered",
            Self::Live => "live",
        };
        f.write_str(s)
    }
}

/// What happened to an update offered to the replica.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Queued until the baseline completes.
    Buffered,
    /// Written to the store.
    Applied,
}

/// Outcome of one baseline load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineReport {
    /// Baseline cells written to the store.
    pub applied: usize,
    /// Entries that were not cells (empty or self-referential keys).
    pub ignored: usize,
    /// Entries whose key or payload failed to decode.
    pub malformed: usize,
    /// Buffered confirmations drained after the baseline.
    pub drained: usize,
}
