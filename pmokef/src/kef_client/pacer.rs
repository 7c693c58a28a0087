use std::{
    fmt,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use tracing::debug;

/// Time source used to space connections. Swappable so tests do not sleep.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Enforces a minimum interval between the starts of two connection
/// attempts. The wait blocks the calling thread: the speaker's embedded
/// control interface drops requests that arrive too fast.
#[derive(Debug)]
pub struct Pacer {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    last_connect: Option<Instant>,
}

impl Pacer {
    pub fn new(clock: Arc<dyn Clock>, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_connect: None,
        }
    }

    /// Sleeps for whatever is left of the interval, then records the new
    /// attempt. Call right before every connection attempt.
    pub fn wait_turn(&mut self) {
        if let Some(last) = self.last_connect {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(
                    "Waiting {:?} before connecting to respect {:?} interval",
                    wait, self.min_interval
                );
                self.clock.sleep(wait);
            }
        }
        self.last_connect = Some(self.clock.now());
    }

    pub fn last_connect(&self) -> Option<Instant> {
        self.last_connect
    }
}
