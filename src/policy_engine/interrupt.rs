//! Interruptible waits between retry attempts.
//!
//! An interrupt cuts the current wait short. The flag stays raised
//! afterwards, so every later wait returns immediately until `clear` is
//! called; the retry loop itself keeps going.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Interrupted,
}

#[derive(Default)]
struct InterruptState {
    interrupted: Mutex<bool>,
    wakeup: Condvar,
}

/// Shared handle used to interrupt retry waits from another thread.
#[derive(Clone, Default)]
pub struct RetryInterrupter {
    state: Arc<InterruptState>,
}

impl RetryInterrupter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the interrupt flag and wake every waiting thread.
    pub fn interrupt(&self) {
        let mut interrupted = self
            .state
            .interrupted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *interrupted = true;
        self.state.wakeup.notify_all();
    }

    pub fn is_interrupted(&self) -> bool {
        *self
            .state
            .interrupted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clear(&self) {
        *self
            .state
            .interrupted
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Block the calling thread for `duration` or until interrupted.
    pub fn wait(&self, duration: Duration) -> WaitOutcome {
        let guard = self
            .state
            .interrupted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .state
            .wakeup
            .wait_timeout_while(guard, duration, |interrupted| !*interrupted)
            .unwrap_or_else(PoisonError::into_inner);

        if *guard {
            WaitOutcome::Interrupted
        } else {
            WaitOutcome::Elapsed
        }
    }
}
