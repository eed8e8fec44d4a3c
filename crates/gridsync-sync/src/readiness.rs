use std::sync::atomic::{AtomicBool, Ordering};

/// Readiness flags published by the bootstrapper.
///
/// `ready_to_send` gates local edit generation; `ready_to_draw` tells
/// consumers the store reflects a completed baseline.
#[derive(Debug, Default)]
pub struct ReadinessState {
    ready_to_send: AtomicBool,
    ready_to_draw: AtomicBool,
}

impl ReadinessState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both flags after a baseline completes.
    pub fn mark_ready(&self) {
        self.ready_to_draw.store(true, Ordering::SeqCst);
        self.ready_to_send.store(true, Ordering::SeqCst);
    }

    /// Stop local edits while reconnecting. The drawing flag stays set: the
    /// store still holds the last completed baseline.
    pub fn suspend_sending(&self) {
        self.ready_to_send.store(false, Ordering::SeqCst);
    }

    pub fn is_ready_to_send(&self) -> bool {
        self.ready_to_send.load(Ordering::SeqCst)
    }

    pub fn is_ready_to_draw(&self) -> bool {
        self.ready_to_draw.load(Ordering::SeqCst)
    }
}
