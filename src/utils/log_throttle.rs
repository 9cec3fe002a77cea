use std::time::{Duration, Instant};

/// Rate limits a repeating log line to one per window, counting what it drops.
///
/// Each poll unit owns one, so no locking is needed.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    window_started_at: Option<Instant>,
    suppressed: u64,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        LogThrottle {
            interval,
            window_started_at: None,
            suppressed: 0,
        }
    }

    /// Returns `Some(suppressed_count)` when the log line should be emitted,
    /// otherwise `None` and the event is counted as suppressed for the active window.
    pub fn should_emit(&mut self) -> Option<u64> {
        let now = Instant::now();
        match self.window_started_at {
            Some(started) if now.duration_since(started) < self.interval => {
                self.suppressed += 1;
                None
            }
            _ => {
                let suppressed = std::mem::take(&mut self.suppressed);
                self.window_started_at = Some(now);
                Some(suppressed)
            }
        }
    }
}
