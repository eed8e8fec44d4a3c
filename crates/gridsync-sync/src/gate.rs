use std::sync::{Arc, Mutex};

use gridsync_store::GridStore;
use gridsync_types::{Cell, Coordinate};
use tracing::debug;

use crate::types::Disposition;

/// Updates received before the baseline loaded, in arrival order.
#[derive(Debug, Default)]
pub struct PendingBuffer {
    items: Vec<(Coordinate, Cell)>,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, coord: Coordinate, cell: Cell) {
        self.items.push((coord, cell));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every item, oldest first. The buffer is empty afterwards.
    pub fn drain(&mut self) -> impl Iterator<Item = (Coordinate, Cell)> + '_ {
        self.items.drain(..)
    }
}

struct GateState {
    live: bool,
    pending: PendingBuffer,
}

/// Orders writes into the [`GridStore`] by bootstrap phase.
///
/// The phase flag and the pending buffer sit behind one mutex. Offering an
/// update and completing a baseline both run entirely under it, taking the
/// store lock inside (always gate, then store). An update can therefore
/// never slip between the drain and the flip to live: it is either buffered
/// and drained, or applied after the baseline.
pub struct ReplicaGate {
    store: Arc<GridStore>,
    state: Mutex<GateState>,
}

impl ReplicaGate {
    /// A gate in buffering mode.
    pub fn new(store: Arc<GridStore>) -> Self {
        Self {
            store,
            state: Mutex::new(GateState {
                live: false,
                pending: PendingBuffer::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<GridStore> {
        &self.store
    }

    /// Returns `true` once a baseline completed and buffering was switched off.
    pub fn is_live(&self) -> bool {
        self.state.lock().expect("gate lock poisoned").live
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().expect("gate lock poisoned").pending.len()
    }

    /// Buffer the update if the baseline has not loaded, otherwise write it.
    pub fn offer(&self, coord: Coordinate, cell: Cell) -> Disposition {
        let mut state = self.state.lock().expect("gate lock poisoned");
        if state.live {
            self.store.set(coord, cell);
            Disposition::Applied
        } else {
            state.pending.push(coord, cell);
            Disposition::Buffered
        }
    }

    /// Write the baseline, drain the buffer over it, and switch to live, as
    /// one step. Returns the number of drained updates.
    pub fn complete_baseline<I>(&self, baseline: I) -> usize
    where
        I: IntoIterator<Item = (Coordinate, Cell)>,
    {
        let mut state = self.state.lock().expect("gate lock poisoned");
        for (coord, cell) in baseline {
            self.store.set(coord, cell);
        }
        let mut drained = 0;
        for (coord, cell) in state.pending.drain() {
            self.store.set(coord, cell);
            drained += 1;
        }
        state.live = true;
        debug!(drained, "baseline completed; replica live");
        drained
    }

    /// Switch back to buffering ahead of a fresh baseline.
    ///
    /// Anything still pending came from a subscription that ended before its
    /// baseline loaded. The next baseline already reflects those changes, so
    /// they are discarded rather than drained over it.
    pub fn rearm(&self) {
        let mut state = self.state.lock().expect("gate lock poisoned");
        state.live = false;
        let discarded = state.pending.drain().count();
        if discarded > 0 {
            debug!(discarded, "discarded updates from abandoned bootstrap");
        }
    }
}
