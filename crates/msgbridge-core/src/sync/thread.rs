//! Named OS threads with timed join and cooperative suspend/resume.
//!
//! # Suspending a thread safely (for beginners)
//!
//! Freezing a thread at an arbitrary instruction is dangerous: it might be
//! holding a lock that every other thread then waits on forever.  Instead,
//! [`Thread::suspend`] only raises a flag.  The running code calls
//! [`ThreadControl::checkpoint`] at points where it holds nothing, and the
//! checkpoint parks there until [`Thread::resume`] is called.

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::sync::monitor::Monitor;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("thread {0} panicked")]
    Panicked(String),
}

// ── Runnable ──────────────────────────────────────────────────────────────────

/// Code run on a [`Thread`].
///
/// Implemented for every `FnOnce(&ThreadControl)` closure.
pub trait Runnable: Send + 'static {
    fn run(self: Box<Self>, control: &ThreadControl);
}

impl<F> Runnable for F
where
    F: FnOnce(&ThreadControl) + Send + 'static,
{
    fn run(self: Box<Self>, control: &ThreadControl) {
        (*self)(control)
    }
}

// ── ThreadControl ─────────────────────────────────────────────────────────────

/// Handle the running code uses to honour suspend requests.
#[derive(Debug, Clone, Default)]
pub struct ThreadControl {
    suspended: Arc<Monitor<bool>>,
}

impl ThreadControl {
    /// Parks the calling thread while a suspend is requested.
    pub fn checkpoint(&self) {
        let mut suspended = self.suspended.enter();
        suspended.wait_while(|s| *s);
    }

    pub fn is_suspended(&self) -> bool {
        *self.suspended.enter()
    }

    fn set_suspended(&self, value: bool) {
        let mut suspended = self.suspended.enter();
        *suspended = value;
        if !value {
            suspended.pulse_all();
        }
    }
}

/// Raises the finished flag when the thread body returns or unwinds.
struct FinishedSignal(Arc<Monitor<bool>>);

impl Drop for FinishedSignal {
    fn drop(&mut self) {
        let mut finished = self.0.enter();
        *finished = true;
        finished.pulse_all();
    }
}

// ── Thread ────────────────────────────────────────────────────────────────────

pub struct Thread {
    name: String,
    handle: Option<JoinHandle<()>>,
    control: ThreadControl,
    finished: Arc<Monitor<bool>>,
}

impl Thread {
    /// Spawns a named OS thread running `runnable`.
    pub fn start<R: Runnable>(name: impl Into<String>, runnable: R) -> Result<Self, ThreadError> {
        let name = name.into();
        let control = ThreadControl::default();
        let finished = Arc::new(Monitor::new(false));

        let body_control = control.clone();
        let signal = FinishedSignal(Arc::clone(&finished));
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _signal = signal;
                Box::new(runnable).run(&body_control);
            })
            .map_err(|source| ThreadError::Spawn {
                name: name.clone(),
                source,
            })?;

        debug!(thread = %name, "thread started");
        Ok(Self {
            name,
            handle: Some(handle),
            control,
            finished,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the body has returned (or panicked).
    pub fn is_finished(&self) -> bool {
        *self.finished.enter()
    }

    /// Requests the thread to park at its next checkpoint.
    pub fn suspend(&self) {
        self.control.set_suspended(true);
    }

    /// Releases a thread parked at a checkpoint.
    pub fn resume(&self) {
        self.control.set_suspended(false);
    }

    pub fn control(&self) -> &ThreadControl {
        &self.control
    }

    /// Waits for the thread to finish.  Joining twice is a no-op.
    pub fn join(&mut self) -> Result<(), ThreadError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ThreadError::Panicked(self.name.clone())),
            None => Ok(()),
        }
    }

    /// Waits at most `timeout` for the thread to finish.
    ///
    /// Returns `Ok(true)` once joined, `Ok(false)` if it is still running.
    pub fn join_timeout(&mut self, timeout: Duration) -> Result<bool, ThreadError> {
        if self.handle.is_none() {
            return Ok(true);
        }
        let timed_out = self
            .finished
            .enter()
            .wait_while_timeout(|finished| !*finished, timeout);
        if timed_out {
            return Ok(false);
        }
        self.join().map(|()| true)
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("joined", &self.handle.is_none())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_start_runs_closure_on_named_thread() {
        // Arrange
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&seen);

        // Act
        let mut thread = Thread::start("worker-1", move |_: &ThreadControl| {
            *sink.lock() = std::thread::current().name().map(str::to_string);
        })
        .unwrap();
        thread.join().unwrap();

        // Assert
        assert_eq!(seen.lock().as_deref(), Some("worker-1"));
        assert!(thread.is_finished());
    }

    #[test]
    fn test_join_timeout_returns_false_while_running() {
        let gate = Arc::new(crate::sync::Event::new());
        let body_gate = Arc::clone(&gate);
        let mut thread = Thread::start("blocked", move |_: &ThreadControl| {
            body_gate.wait();
        })
        .unwrap();

        assert!(!thread.join_timeout(Duration::from_millis(20)).unwrap());

        gate.set();
        assert!(thread.join_timeout(Duration::from_secs(5)).unwrap());
        assert!(thread.join().is_ok(), "joining twice is a no-op");
    }

    #[test]
    fn test_join_reports_panic() {
        let mut thread = Thread::start("doomed", |_: &ThreadControl| panic!("boom")).unwrap();
        assert!(matches!(thread.join(), Err(ThreadError::Panicked(name)) if name == "doomed"));
        assert!(thread.is_finished(), "a panicking body still counts as finished");
    }

    #[test]
    fn test_suspend_parks_at_checkpoint_until_resume() {
        // Arrange – a loop that counts passes through its checkpoint
        let passes = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let (body_passes, body_stop) = (Arc::clone(&passes), Arc::clone(&stop));
        let mut thread = Thread::start("looper", move |control: &ThreadControl| {
            while !body_stop.load(Ordering::SeqCst) {
                control.checkpoint();
                body_passes.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

        // Act
        thread.suspend();
        std::thread::sleep(Duration::from_millis(30));
        let frozen = passes.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));

        // Assert – at most one pass slipped through after the suspend landed
        assert!(passes.load(Ordering::SeqCst) <= frozen + 1);
        assert!(thread.control().is_suspended());

        thread.resume();
        stop.store(true, Ordering::SeqCst);
        assert!(thread.join_timeout(Duration::from_secs(5)).unwrap());
    }
}
