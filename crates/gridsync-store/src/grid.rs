use std::collections::HashMap;
use std::sync::Mutex;

use gridsync_types::{Cell, Coordinate, GridBounds};
use tracing::debug;

/// Owned copy of the grid contents.
pub type CellMap = HashMap<Coordinate, Cell>;

/// Local mirror of a grid object: coordinate → cell.
///
/// A single exclusive [`Mutex`] guards the map. Each operation holds it for
/// exactly one write or one full copy, so a reader can never observe a
/// partially written cell. Share it between producers with an `Arc`.
pub struct GridStore {
    cells: Mutex<CellMap>,
}

impl GridStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Create a store pre-filled with `cell` at every in-bounds coordinate.
    pub fn with_default(bounds: GridBounds, cell: Cell) -> Self {
        let mut store = Self::new();
        store.generate_default(bounds, cell);
        store
    }

    /// Fill every coordinate in `[0, width) × [0, height)` with `cell`.
    ///
    /// Requires exclusive access, so it can only run before the store is
    /// shared and never takes the lock.
    pub fn generate_default(&mut self, bounds: GridBounds, cell: Cell) {
        let cells = self.cells.get_mut().expect("grid lock poisoned");
        cells.reserve(bounds.cell_count());
        for coord in bounds.coordinates() {
            cells.insert(coord, cell);
        }
        debug!(width = bounds.width, height = bounds.height, "default grid generated");
    }

    /// Write a cell, replacing whatever was at `coord`.
    pub fn set(&self, coord: Coordinate, cell: Cell) {
        self.cells.lock().expect("grid lock poisoned").insert(coord, cell);
    }

    /// Read a single cell.
    pub fn get(&self, coord: Coordinate) -> Option<Cell> {
        self.cells.lock().expect("grid lock poisoned").get(&coord).copied()
    }

    /// Copy the entire grid.
    ///
    /// The returned map is independent of the store; callers never touch
    /// store memory outside the lock.
    pub fn snapshot(&self) -> CellMap {
        self.cells.lock().expect("grid lock poisoned").clone()
    }

    /// Number of cells currently held.
    pub fn len(&self) -> usize {
        self.cells.lock().expect("grid lock poisoned").len()
    }

    /// Returns `true` if the store holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.lock().expect("grid lock poisoned").is_empty()
    }
}

impl Default for GridStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GridStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridStore")
            .field("cell_count", &self.len())
            .finish()
    }
}
