use std::sync::Arc;
use std::time::Duration;

use gridsync_store::GridStore;
use gridsync_sync::{CollabTransport, OutgoingChange, ReadinessState, SyncCounters};
use gridsync_types::{Cell, Coordinate, GridBounds};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tracing::{trace, warn};

use crate::config::ChannelMask;

/// Lower bound of a randomized channel value; the upper bound is exclusive 255.
pub const CHANNEL_FLOOR: u8 = 100;

/// Result of one mutator tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not ready to send; nothing was generated.
    Idle,
    Sent { coord: Coordinate, cell: Cell },
    /// The edit was written locally but could not be forwarded.
    SendFailed { coord: Coordinate, cell: Cell },
}

/// Generates random local edits at a fixed rate.
///
/// Each edit is written to the store first and then forwarded to the
/// server; the local write stands whether or not the send succeeds.
pub struct RandomMutator {
    object_id: String,
    bounds: GridBounds,
    keep: ChannelMask,
    interval: Duration,
    store: Arc<GridStore>,
    transport: Arc<dyn CollabTransport>,
    readiness: Arc<ReadinessState>,
    counters: Arc<SyncCounters>,
}

impl RandomMutator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        object_id: impl Into<String>,
        bounds: GridBounds,
        keep: ChannelMask,
        interval: Duration,
        store: Arc<GridStore>,
        transport: Arc<dyn CollabTransport>,
        readiness: Arc<ReadinessState>,
        counters: Arc<SyncCounters>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            bounds,
            keep,
            interval,
            store,
            transport,
            readiness,
            counters,
        }
    }

    /// A random opaque cell: kept channels in `[100, 255)`, others 0.
    pub fn random_cell<R: Rng + ?Sized>(keep: ChannelMask, rng: &mut R) -> Cell {
        let mut channel = |kept: bool| if kept { rng.gen_range(CHANNEL_FLOOR..255) } else { 0 };
        let r = channel(keep.red);
        let g = channel(keep.green);
        let b = channel(keep.blue);
        Cell::rgb(r, g, b)
    }

    /// A uniformly random in-bounds coordinate and a random cell.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> (Coordinate, Cell) {
        let coord = Coordinate::new(
            rng.gen_range(0..self.bounds.width),
            rng.gen_range(0..self.bounds.height),
        );
        (coord, Self::random_cell(self.keep, rng))
    }

    /// Produce, apply and forward one edit, if sending is enabled by readiness.
    pub async fn tick<R: Rng + ?Sized>(&self, rng: &mut R) -> TickOutcome {
        if !self.readiness.is_ready_to_send() {
            return TickOutcome::Idle;
        }
        let (coord, cell) = self.generate(rng);
        self.store.set(coord, cell);

        let change = OutgoingChange::for_cell(self.object_id.clone(), coord, cell);
        self.counters.sends.record();
        match self.transport.send_change(&change).await {
            Ok(()) => {
                trace!(%coord, key = %change.key, "edit sent");
                TickOutcome::Sent { coord, cell }
            }
            Err(e) => {
                self.counters.record_send_failure();
                warn!(key = %change.key, error = %e, "cannot send edit");
                TickOutcome::SendFailed { coord, cell }
            }
        }
    }

    /// Tick forever at the configured rate, independent of any rendering.
    pub async fn run(&self) {
        let mut rng = StdRng::from_entropy();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick(&mut rng).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_sync::{InMemoryHub, InMemoryTransport, ReplicaGate, UpdateReconciler};
    use std::thread;

    fn mutator(keep: ChannelMask, transport: Arc<InMemoryTransport>) -> (RandomMutator, Arc<ReadinessState>, Arc<SyncCounters>) {
        let readiness = Arc::new(ReadinessState::new());
        let counters = Arc::new(SyncCounters::new());
        let m = RandomMutator::new(
            "obj",
            GridBounds::new(4, 3),
            keep,
            Duration::from_millis(10),
            Arc::new(GridStore::new()),
            transport,
            Arc::clone(&readiness),
            Arc::clone(&counters),
        );
        (m, readiness, counters)
    }

    fn offline_transport() -> Arc<InMemoryTransport> {
        Arc::new(InMemoryTransport::new(Arc::new(InMemoryHub::new())))
    }

    #[test]
    fn cells_are_always_opaque() {
        let mut rng = StdRng::seed_from_u64(7);
        for keep in [
            ChannelMask::default(),
            ChannelMask::new(true, false, false),
            ChannelMask::new(true, true, true),
        ] {
            for _ in 0..1_000 {
                assert_eq!(RandomMutator::random_cell(keep, &mut rng).a, 255);
            }
        }
    }

    #[test]
    fn kept_channels_fall_in_sub_range_others_are_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let keep = ChannelMask::new(true, false, true);
        for _ in 0..1_000 {
            let c = RandomMutator::random_cell(keep, &mut rng);
            assert!((100..255).contains(&c.r), "red {}", c.r);
            assert_eq!(c.g, 0);
            assert!((100..255).contains(&c.b), "blue {}", c.b);
        }
    }

    #[test]
    fn generated_coordinates_stay_in_bounds() {
        let (m, _, _) = mutator(ChannelMask::default(), offline_transport());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let (coord, _) = m.generate(&mut rng);
            assert!(GridBounds::new(4, 3).contains(coord), "{coord} out of bounds");
        }
    }

    #[tokio::test]
    async fn idle_until_ready_to_send() {
        let (m, _, counters) = mutator(ChannelMask::default(), offline_transport());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(m.tick(&mut rng).await, TickOutcome::Idle);
        assert!(m.store.is_empty());
        assert_eq!(counters.sends.total(), 0);
    }

    #[tokio::test]
    async fn send_failure_keeps_optimistic_write() {
        let (m, readiness, counters) = mutator(ChannelMask::new(true, false, false), offline_transport());
        readiness.mark_ready();
        let mut rng = StdRng::seed_from_u64(2);
        let TickOutcome::SendFailed { coord, cell } = m.tick(&mut rng).await else {
            panic!("expected a failed send");
        };
        assert_eq!(m.store.get(coord), Some(cell));
        assert_eq!(counters.send_failures(), 1);
        assert_eq!(counters.sends.total(), 1);
    }

    #[tokio::test]
    async fn sent_edit_reaches_the_hub() {
        let hub = Arc::new(InMemoryHub::new());
        let transport = Arc::new(InMemoryTransport::new(Arc::clone(&hub)));
        transport.connect().await.unwrap();
        let (m, readiness, counters) = mutator(ChannelMask::new(false, true, false), transport);
        readiness.mark_ready();

        let mut rng = StdRng::seed_from_u64(5);
        let TickOutcome::Sent { coord, cell } = m.tick(&mut rng).await else {
            panic!("expected a sent edit");
        };
        let props = hub.properties("obj").unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].decode_for("obj").unwrap(), Some((coord, cell)));
        assert_eq!(counters.send_failures(), 0);
    }

    #[test]
    fn concurrent_confirmations_and_edits_are_last_writer_wins() {
        let store = Arc::new(GridStore::new());
        let gate = Arc::new(ReplicaGate::new(Arc::clone(&store)));
        gate.complete_baseline(Vec::new());
        let counters = Arc::new(SyncCounters::new());
        let reconciler = Arc::new(UpdateReconciler::new("obj", gate, Arc::clone(&counters)));
        let readiness = Arc::new(ReadinessState::new());
        readiness.mark_ready();
        let transport = Arc::new(InMemoryTransport::new(Arc::new(InMemoryHub::new())));
        // A 1x1 grid sends every edit to the contended cell.
        let m = RandomMutator::new(
            "obj",
            GridBounds::new(1, 1),
            ChannelMask::new(true, false, false),
            Duration::from_millis(1),
            Arc::clone(&store),
            transport.clone(),
            readiness,
            Arc::clone(&counters),
        );

        // Edits have g == 0, confirmations carry r == g > 0.
        let local = thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                transport.connect().await.unwrap();
                let mut rng = StdRng::seed_from_u64(42);
                let mut last = None;
                for _ in 0..100 {
                    match m.tick(&mut rng).await {
                        TickOutcome::Sent { cell, .. } => last = Some(cell),
                        other => panic!("unexpected tick outcome {other:?}"),
                    }
                }
                last.unwrap()
            })
        });
        let remote = {
            let reconciler = Arc::clone(&reconciler);
            thread::spawn(move || {
                for v in 1u8..=100 {
                    reconciler.on_confirmation("0-0", &[v, v, 0, 255]).unwrap();
                }
            })
        };
        let last_edit = local.join().unwrap();
        remote.join().unwrap();

        let last = store.get(Coordinate::new(0, 0)).unwrap();
        assert!(
            last == last_edit || last == Cell::rgb(100, 100, 0),
            "final value {last:?} was not a last write"
        );
        assert_eq!(counters.sends.total(), 100);
        assert_eq!(counters.confirmations.total(), 100);
    }
}
