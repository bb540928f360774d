//! Writer-preferring reader/writer lock.
//!
//! Any number of readers may hold the lock at once, or a single writer.
//! As soon as a writer is waiting, new readers queue behind it, so a steady
//! stream of readers can never starve writers.

use crate::sync::monitor::Monitor;

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writers: usize,
    writers_pending: usize,
}

#[derive(Debug, Default)]
pub struct ReaderWriterLock {
    state: Monitor<LockState>,
}

impl ReaderWriterLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks while a writer holds or waits for the lock.
    pub fn acquire_reader_lock(&self) -> ReaderGuard<'_> {
        let mut state = self.state.enter();
        state.wait_while(|s| s.writers > 0 || s.writers_pending > 0);
        state.readers += 1;
        ReaderGuard { lock: self }
    }

    /// Blocks until no reader or writer holds the lock.
    pub fn acquire_writer_lock(&self) -> WriterGuard<'_> {
        let mut state = self.state.enter();
        state.writers_pending += 1;
        state.wait_while(|s| s.readers > 0 || s.writers > 0);
        state.writers_pending -= 1;
        state.writers = 1;
        WriterGuard { lock: self }
    }

    /// Current number of readers.  Only a snapshot.
    pub fn readers(&self) -> usize {
        self.state.enter().readers
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.enter().writers > 0
    }

    fn release_reader(&self) {
        let mut state = self.state.enter();
        state.readers -= 1;
        if state.readers == 0 {
            state.pulse_all();
        }
    }

    fn release_writer(&self) {
        let mut state = self.state.enter();
        state.writers = 0;
        state.pulse_all();
    }
}

/// Shared hold on a [`ReaderWriterLock`]; released on drop.
#[must_use = "the reader lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReaderGuard<'a> {
    lock: &'a ReaderWriterLock,
}

impl Drop for ReaderGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_reader();
    }
}

/// Exclusive hold on a [`ReaderWriterLock`]; released on drop.
#[must_use = "the writer lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct WriterGuard<'a> {
    lock: &'a ReaderWriterLock,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_writer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_readers_share_the_lock() {
        let lock = ReaderWriterLock::new();
        let first = lock.acquire_reader_lock();
        let second = lock.acquire_reader_lock();
        assert_eq!(lock.readers(), 2);
        drop(first);
        drop(second);
        assert_eq!(lock.readers(), 0);
    }

    #[test]
    fn test_writer_waits_for_readers_to_leave() {
        // Arrange
        let lock = Arc::new(ReaderWriterLock::new());
        let reader = lock.acquire_reader_lock();
        let acquired = Arc::new(AtomicBool::new(false));

        // Act
        let writer = {
            let lock = Arc::clone(&lock);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _w = lock.acquire_writer_lock();
                acquired.store(true, Ordering::SeqCst);
            })
        };
        thread::sleep(Duration::from_millis(30));

        // Assert
        assert!(!acquired.load(Ordering::SeqCst), "writer must wait for the reader");
        drop(reader);
        writer.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert!(!lock.is_write_locked());
    }

    #[test]
    fn test_pending_writer_blocks_new_readers() {
        // Arrange – a reader holds the lock and a writer queues behind it
        let lock = Arc::new(ReaderWriterLock::new());
        let first_reader = lock.acquire_reader_lock();
        let writer_done = Arc::new(AtomicBool::new(false));
        let writer = {
            let lock = Arc::clone(&lock);
            let writer_done = Arc::clone(&writer_done);
            thread::spawn(move || {
                let _w = lock.acquire_writer_lock();
                thread::sleep(Duration::from_millis(20));
                writer_done.store(true, Ordering::SeqCst);
            })
        };
        thread::sleep(Duration::from_millis(30));

        // Act – a late reader arrives while the writer is pending
        let late_reader = {
            let lock = Arc::clone(&lock);
            let writer_done = Arc::clone(&writer_done);
            thread::spawn(move || {
                let _r = lock.acquire_reader_lock();
                writer_done.load(Ordering::SeqCst)
            })
        };
        thread::sleep(Duration::from_millis(20));
        drop(first_reader);

        // Assert – the late reader only got in after the writer finished
        writer.join().unwrap();
        assert!(late_reader.join().unwrap(), "writer must go before the late reader");
    }

    #[test]
    fn test_second_writer_waits_for_first_writer() {
        // Arrange
        let lock = Arc::new(ReaderWriterLock::new());
        let first = lock.acquire_writer_lock();
        let acquired = Arc::new(AtomicBool::new(false));

        // Act
        let second = {
            let lock = Arc::clone(&lock);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _w = lock.acquire_writer_lock();
                acquired.store(true, Ordering::SeqCst);
            })
        };
        thread::sleep(Duration::from_millis(30));

        // Assert
        assert!(!acquired.load(Ordering::SeqCst), "writers must exclude each other");
        assert!(lock.is_write_locked());
        drop(first);
        second.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert!(!lock.is_write_locked());
    }
}
