use std::time::Duration;

use web_time::Instant;

/// A due redraw and how many state changes it folds together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawTick {
    pub coalesced: u32,
}

/// Fixed-cadence redraw timer shared by all views.
///
/// State changes only mark the clock; drawing happens when the host polls
/// and the interval has elapsed, so every view is drawn in the same tick.
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    last_tick: Option<Instant>,
    pending: u32,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
            pending: 0,
        }
    }

    /// Record a state change to be picked up by the next tick.
    pub fn request_redraw(&mut self) {
        self.pending = self.pending.saturating_add(1);
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Returns a tick once per interval, whether or not anything changed.
    pub fn poll(&mut self, now: Instant) -> Option<RedrawTick> {
        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last_tick = Some(now);
        let coalesced = std::mem::take(&mut self.pending);
        Some(RedrawTick { coalesced })
    }
}
