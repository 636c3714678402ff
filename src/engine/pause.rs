//! Global pause barrier for server-directed rate limiting.
//!
//! The barrier holds a wall-clock deadline; every dispatcher iteration awaits
//! it before selecting work. A 429/503 response replaces the deadline, and it
//! is never shrunk: transfers that already issued their request are not
//! interrupted, only future launches wait.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct PauseBarrier {
    until: Mutex<Option<Instant>>,
}

impl PauseBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the barrier to `duration` from now. Keeps the later deadline
    /// when one is already pending.
    pub fn pause_for(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let mut until = self.until.lock();
        if until.map_or(true, |current| deadline > current) {
            *until = Some(deadline);
        }
    }

    /// Wait until the current deadline has passed. Loops because a new
    /// 429/503 may push the deadline further out while we sleep.
    pub async fn wait(&self) {
        loop {
            let deadline = *self.until.lock();
            match deadline {
                Some(at) if at > Instant::now() => tokio::time::sleep_until(at).await,
                _ => return,
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.until
            .lock()
            .map_or(false, |deadline| deadline > Instant::now())
    }
}
