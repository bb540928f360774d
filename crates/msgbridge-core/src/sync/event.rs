//! Auto-reset event.
//!
//! An event is a boolean flag threads can wait on.  `set` raises it; the
//! first waiter to see it raised lowers it again on its way out, so each
//! `set` releases exactly one waiter.  A `set` with nobody waiting is
//! remembered until the next `wait`.

use std::time::Duration;

use crate::sync::monitor::Monitor;

#[derive(Debug, Default)]
pub struct Event {
    signalled: Monitor<bool>,
}

impl Event {
    /// A new, unsignalled event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals the event, releasing one waiter.
    pub fn set(&self) {
        let mut signalled = self.signalled.enter();
        *signalled = true;
        signalled.pulse();
    }

    /// Clears a pending signal.
    pub fn reset(&self) {
        *self.signalled.enter() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.signalled.enter()
    }

    /// Blocks until signalled, consuming the signal.
    pub fn wait(&self) {
        let mut signalled = self.signalled.enter();
        signalled.wait_while(|set| !*set);
        *signalled = false;
    }

    /// Blocks until signalled or `timeout` elapses.  Returns whether the
    /// signal was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut signalled = self.signalled.enter();
        if signalled.wait_while_timeout(|set| !*set, timeout) {
            return false;
        }
        *signalled = false;
        true
    }
}
