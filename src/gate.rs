use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Default floor for a refresh, long enough for the pull-to-refresh indicator to be read
pub const DEFAULT_MINIMUM_DURATION: Duration = Duration::from_millis(1250);

/// Floor latency for a refresh session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumDurationGate {
    floor: Duration,
}

impl Default for MinimumDurationGate {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_DURATION)
    }
}

impl MinimumDurationGate {
    pub fn new(floor: Duration) -> Self {
        Self { floor }
    }

    pub fn floor(&self) -> Duration {
        self.floor
    }

    /// Earliest instant a session started at `started_at` may complete
    pub fn deadline(&self, started_at: Instant) -> Instant {
        started_at + self.floor
    }

    /// Time left before the floor elapses
    pub fn remaining(&self, started_at: Instant) -> Duration {
        self.deadline(started_at)
            .saturating_duration_since(Instant::now())
    }

    /// Resolve once the floor has elapsed since `started_at`
    pub async fn wait(&self, started_at: Instant) {
        sleep_until(self.deadline(started_at)).await;
    }
}
