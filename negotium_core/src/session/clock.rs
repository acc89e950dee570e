use std::time::Duration;
use tokio::time::Instant;

/// Below this many seconds the countdown is shown as urgent.
const URGENT_THRESHOLD_SECS: u64 = 60;

/// Wall-clock countdown for one session. Purely advisory unless the caller
/// enforces it.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
    duration: Duration,
}

impl SessionClock {
    pub fn start(duration: Duration) -> Self {
        Self {
            started: Instant::now(),
            duration,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.started + self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.started.elapsed())
    }

    /// Whole seconds left, rounded up so a fresh clock shows its full duration.
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn is_urgent(&self) -> bool {
        self.remaining_secs() < URGENT_THRESHOLD_SECS
    }

    pub fn display(&self) -> String {
        format_countdown(self.remaining_secs())
    }
}

/// `MM:SS`, minutes unbounded.
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
