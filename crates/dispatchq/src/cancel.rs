// crates/dispatchq/src/cancel.rs
//! A tiny blocking-thread cancellation token: the `std::thread` analogue of
//! an async cancellation token, built on the same `parking_lot` primitives
//! `BaseQueue` already uses rather than pulling in an async runtime just to
//! interrupt a sleep.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

pub struct CancelToken {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub fn cancel(&self) {
        let mut g = self.cancelled.lock();
        *g = true;
        self.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Sleep for `dur`, waking early if cancelled or if [`Self::nudge`] is
    /// called. Returns `true` if cancellation fired during the wait.
    pub fn wait_timeout(&self, dur: Duration) -> bool {
        let mut g = self.cancelled.lock();
        if *g {
            return true;
        }
        let result = self.cond.wait_for(&mut g, dur);
        let _ = result;
        *g
    }

    /// Wake any thread currently in `wait_timeout` without cancelling it —
    /// used so a freshly pushed, earlier-than-anything-waited-on deadline
    /// doesn't have to wait out a stale sleep.
    pub fn nudge(&self) {
        self.cond.notify_all();
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn wait_timeout_elapses_when_not_cancelled() {
        let tok = CancelToken::new();
        let start = Instant::now();
        let cancelled = tok.wait_timeout(Duration::from_millis(40));
        assert!(!cancelled);
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn cancel_wakes_a_sleeping_waiter_early() {
        let tok = Arc::new(CancelToken::new());
        let tok2 = tok.clone();
        let handle = std::thread::spawn(move || tok2.wait_timeout(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        tok.cancel();
        let cancelled = handle.join().unwrap();
        assert!(cancelled);
        assert!(tok.is_cancelled());
    }

    #[test]
    fn nudge_wakes_without_cancelling() {
        let tok = Arc::new(CancelToken::new());
        let tok2 = tok.clone();
        let start = Instant::now();
        let handle = std::thread::spawn(move || {
            tok2.wait_timeout(Duration::from_secs(5));
            tok2.is_cancelled()
        });
        std::thread::sleep(Duration::from_millis(20));
        tok.nudge();
        let was_cancelled = handle.join().unwrap();
        assert!(!was_cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
