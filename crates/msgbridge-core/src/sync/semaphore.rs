//! Counting semaphore.

use std::time::Duration;

use crate::sync::monitor::Monitor;

/// A pool of permits.  `acquire` takes one, blocking while none are left;
/// `release` returns any number.
#[derive(Debug)]
pub struct Semaphore {
    permits: Monitor<usize>,
}

impl Semaphore {
    pub fn new(initial: usize) -> Self {
        Self {
            permits: Monitor::new(initial),
        }
    }

    /// Takes one permit, blocking until one is available.
    pub fn acquire(&self) {
        let mut permits = self.permits.enter();
        permits.wait_while(|available| *available == 0);
        *permits -= 1;
    }

    /// Takes one permit if one is immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.enter();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Takes one permit, giving up after `timeout`.  Returns whether a
    /// permit was taken.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let mut permits = self.permits.enter();
        if permits.wait_while_timeout(|available| *available == 0, timeout) {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns `count` permits and wakes waiters.
    pub fn release(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut permits = self.permits.enter();
        *permits = permits.saturating_add(count);
        if count == 1 {
            permits.pulse();
        } else {
            permits.pulse_all();
        }
    }

    /// Permits currently available.  Only a snapshot.
    pub fn available(&self) -> usize {
        *self.permits.enter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_try_acquire_drains_permits() {
        // Arrange
        let sem = Semaphore::new(2);

        // Act / Assert
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire(), "no third permit");
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_acquire_timeout_gives_up_when_empty() {
        let sem = Semaphore::new(0);
        assert!(!sem.acquire_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_release_unblocks_waiting_acquire() {
        // Arrange
        let sem = Arc::new(Semaphore::new(0));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire_timeout(Duration::from_secs(5)))
        };

        // Act
        thread::sleep(Duration::from_millis(20));
        sem.release(1);

        // Assert
        assert!(waiter.join().unwrap());
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_release_many_wakes_many() {
        let sem = Arc::new(Semaphore::new(0));
        let acquired = Arc::new(AtomicUsize::new(0));
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let sem = Arc::clone(&sem);
                let acquired = Arc::clone(&acquired);
                thread::spawn(move || {
                    sem.acquire();
                    acquired.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        sem.release(3);
        for waiter in waiters {
            waiter.join().unwrap();
        }

        assert_eq!(acquired.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_release_zero_is_noop() {
        let sem = Semaphore::new(1);
        sem.release(0);
        assert_eq!(sem.available(), 1);
    }
}
