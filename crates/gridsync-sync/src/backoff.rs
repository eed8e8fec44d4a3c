use std::time::Duration;

/// Exponential retry delay: `base`, `2·base`, `4·base`, … capped at `max`.
#[derive(Clone, Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self { base, max, next: base }
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    /// Start over from `base` after a success.
    pub fn reset(&mut self) {
        self.next = self.base;
    }
}
