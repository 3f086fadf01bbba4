//! Time source for the poll loop
//!
//! Every deadline in the server (login grace, inactivity timeout, data
//! connection wait, throughput) is measured through a [`Clock`] so that the
//! state machine can be driven deterministically.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Source of monotonic time and of cooperative waiting.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Gives up the processor for roughly `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`thread::sleep`].
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

/// Clock that only moves when told to.
///
/// Clones share the same time line, so a test can keep a handle while the
/// server owns another. `sleep` advances the shared time instead of blocking.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Calls `poll` until it yields a value or `timeout` elapses.
///
/// Between attempts the clock sleeps for `interval`, so the wait never spins
/// and never exceeds `timeout` by more than one interval.
pub fn poll_until<T>(
    clock: &dyn Clock,
    timeout: Duration,
    interval: Duration,
    mut poll: impl FnMut() -> Option<T>,
) -> Option<T> {
    let deadline = clock.now() + timeout;
    loop {
        if let Some(value) = poll() {
            return Some(value);
        }
        if clock.now() >= deadline {
            return None;
        }
        clock.sleep(interval);
    }
}
