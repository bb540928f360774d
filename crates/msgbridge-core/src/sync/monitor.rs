//! A mutex bundled with a condition variable around one piece of state.
//!
//! ```rust
//! use std::sync::Arc;
//! use msgbridge_core::sync::Monitor;
//!
//! let queue = Arc::new(Monitor::new(Vec::<u32>::new()));
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     std::thread::spawn(move || {
//!         queue.enter().push(7);
//!         queue.pulse_all();
//!     })
//! };
//!
//! let mut guard = queue.enter();
//! guard.wait_while(|items| items.is_empty());
//! assert_eq!(guard.pop(), Some(7));
//! # drop(guard);
//! # producer.join().unwrap();
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

/// State `T` guarded by a mutex, plus a condition variable to wait on it.
pub struct Monitor<T> {
    state: Mutex<T>,
    condvar: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(value),
            condvar: Condvar::new(),
        }
    }

    /// Enters the monitor, blocking until the lock is free.
    ///
    /// Leaving the monitor is dropping the returned guard.
    pub fn enter(&self) -> MonitorGuard<'_, T> {
        MonitorGuard {
            guard: self.state.lock(),
            condvar: &self.condvar,
        }
    }

    /// Enters the monitor only if nobody else holds it.
    pub fn try_enter(&self) -> Option<MonitorGuard<'_, T>> {
        self.state.try_lock().map(|guard| MonitorGuard {
            guard,
            condvar: &self.condvar,
        })
    }

    /// Wakes one waiter.  Returns whether a thread was woken.
    pub fn pulse(&self) -> bool {
        self.condvar.notify_one()
    }

    /// Wakes every waiter.  Returns how many threads were woken.
    pub fn pulse_all(&self) -> usize {
        self.condvar.notify_all()
    }

    pub fn into_inner(self) -> T {
        self.state.into_inner()
    }
}

impl<T: Default> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor").field("state", &self.state).finish()
    }
}

/// Scoped ownership of a [`Monitor`].
///
/// Dereferences to the protected state.  Waiting releases the lock while
/// asleep and re-acquires it before returning, so the state must always be
/// re-checked after a wait.
pub struct MonitorGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    condvar: &'a Condvar,
}

impl<'a, T> MonitorGuard<'a, T> {
    /// Sleeps until pulsed.  May wake spuriously.
    pub fn wait(&mut self) {
        self.condvar.wait(&mut self.guard);
    }

    /// Sleeps until pulsed or `timeout` elapses.  Returns `true` on timeout.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        self.condvar.wait_for(&mut self.guard, timeout).timed_out()
    }

    /// Sleeps for as long as `condition` returns `true`.
    pub fn wait_while<F>(&mut self, condition: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        self.condvar.wait_while(&mut self.guard, condition);
    }

    /// Like [`wait_while`](Self::wait_while) but gives up after `timeout`.
    /// Returns `true` if it gave up with `condition` still holding.
    pub fn wait_while_timeout<F>(&mut self, condition: F, timeout: Duration) -> bool
    where
        F: FnMut(&mut T) -> bool,
    {
        self.condvar
            .wait_while_for(&mut self.guard, condition, timeout)
            .timed_out()
    }

    /// Wakes one waiter while still holding the monitor.
    pub fn pulse(&self) -> bool {
        self.condvar.notify_one()
    }

    /// Wakes every waiter while still holding the monitor.
    pub fn pulse_all(&self) -> usize {
        self.condvar.notify_all()
    }
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for MonitorGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
