use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::types::SyncPhase;

struct RateWindow {
    started: Instant,
    count: u64,
    last_rate: f64,
}

/// Monotonic event counter with a per-interval rate.
///
/// The rate is recomputed whenever it is read after the interval has
/// elapsed; until then the previous interval's rate is reported.
pub struct RateMeter {
    total: AtomicU64,
    interval: Duration,
    window: Mutex<RateWindow>,
}

impl RateMeter {
    pub fn new(interval: Duration) -> Self {
        Self {
            total: AtomicU64::new(0),
            interval,
            window: Mutex::new(RateWindow {
                started: Instant::now(),
                count: 0,
                last_rate: 0.0,
            }),
        }
    }

    pub fn record(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.window.lock().expect("rate lock poisoned").count += 1;
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Events per second over the last completed interval.
    pub fn rate(&self) -> f64 {
        self.rate_at(Instant::now())
    }

    fn rate_at(&self, now: Instant) -> f64 {
        let mut w = self.window.lock().expect("rate lock poisoned");
        let elapsed = now.saturating_duration_since(w.started);
        if elapsed >= self.interval {
            w.last_rate = w.count as f64 / elapsed.as_secs_f64();
            w.count = 0;
            w.started = now;
        }
        w.last_rate
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Observability counters shared by the reconciler and the mutator.
#[derive(Default)]
pub struct SyncCounters {
    pub confirmations: RateMeter,
    pub sends: RateMeter,
    malformed: AtomicU64,
    send_failures: AtomicU64,
}

impl SyncCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of a replica's sync health.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub phase: SyncPhase,
    pub total_confirmations: u64,
    pub confirmations_per_sec: f64,
    pub sends: u64,
    pub sends_per_sec: f64,
    pub malformed: u64,
    pub send_failures: u64,
    pub conflicts: u64,
    pub changes: u64,
    pub digest: String,
}
