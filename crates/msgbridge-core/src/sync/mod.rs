//! Concurrency primitives shared by the session and application threads.
//!
//! # Which primitive for what? (for beginners)
//!
//! - **[`Mutex`]** – exclusive access to a value.  The lock is released when
//!   the guard returned by `lock()` goes out of scope.
//! - **[`ConditionVariable`]** – lets a thread sleep until another thread
//!   announces that some shared state changed.  Always used together with a
//!   mutex.
//! - **[`Monitor`]** – a mutex and a condition variable bundled around one
//!   piece of state.  This is the workhorse: every blocking loop in the
//!   session is written as "enter the monitor, wait until the condition
//!   holds or the session is closing".
//! - **[`Semaphore`]** – a counter of available permits.
//! - **[`Event`]** – a one-shot auto-reset signal: `set` wakes exactly one
//!   waiter, after which the event is clear again.
//! - **[`ReaderWriterLock`]** – many readers *or* one writer, preferring
//!   writers so they are never starved.
//! - **[`Thread`]** – a named OS thread with timed join and cooperative
//!   suspend/resume.
//!
//! Mutex and condition variable come straight from `parking_lot`; the rest
//! are built on top of [`Monitor`].

pub mod event;
pub mod monitor;
pub mod rwlock;
pub mod semaphore;
pub mod thread;

pub use event::Event;
pub use monitor::{Monitor, MonitorGuard};
pub use parking_lot::{Condvar as ConditionVariable, Mutex, MutexGuard};
pub use rwlock::{ReaderGuard, ReaderWriterLock, WriterGuard};
pub use semaphore::Semaphore;
pub use thread::{Runnable, Thread, ThreadControl, ThreadError};
