//! Send gate for satellite reports

use std::time::{Duration, Instant};

use tracing::debug;

/// Limits a satellite to one in-flight report and one report per interval
///
/// A satellite that has never sent is not held back by the interval; only the
/// zero-percent rule and the in-flight rule apply to its first report.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_sent: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        debug!(?interval, "Throttle::new: called");
        Self {
            interval,
            last_sent: None,
            pending: false,
        }
    }

    /// Whether a report of `percent` may go out at `now`
    pub fn should_send(&self, now: Instant, percent: u8) -> bool {
        if percent == 0 || self.pending {
            return false;
        }
        match self.last_sent {
            Some(last) => now.saturating_duration_since(last) > self.interval,
            None => true,
        }
    }

    /// Record an accepted send at `now`; it stays pending until completed
    pub fn mark_sent(&mut self, now: Instant) {
        debug!("Throttle::mark_sent: called");
        self.last_sent = Some(now);
        self.pending = true;
    }

    /// The outstanding send finished
    pub fn mark_completed(&mut self) {
        debug!("Throttle::mark_completed: called");
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
