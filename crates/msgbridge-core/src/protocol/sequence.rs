//! Thread-safe subscription id allocator.
//!
//! # Why ids must never repeat (for beginners)
//!
//! Every `SUBSCRIBE` frame carries a client-chosen id, and the server echoes
//! that id back in its acknowledgement.  The session matches acknowledgements
//! to pending subscriptions purely by id, so if two live subscriptions ever
//! shared one, an ack could complete the wrong request.
//!
//! Ids therefore start at 1 and strictly increase for the lifetime of a
//! session.  They are never reused, even after a subscription is closed.
//! When the `i32` space is exhausted the allocator reports it instead of
//! wrapping around into ids that might still be live.
//!
//! # Thread safety
//!
//! The counter is an `AtomicI32` advanced with a compare-and-swap loop, so
//! concurrent callers always receive distinct ids without taking a lock.

use std::sync::atomic::{AtomicI32, Ordering};

/// A monotonically increasing allocator for subscription ids.
///
/// # Examples
///
/// ```rust
/// use msgbridge_core::protocol::SubscriptionIdAllocator;
///
/// let ids = SubscriptionIdAllocator::new();
/// assert_eq!(ids.next(), Some(1));
/// assert_eq!(ids.next(), Some(2));
/// ```
#[derive(Debug)]
pub struct SubscriptionIdAllocator {
    /// The id most recently handed out; `0` before the first call.
    last_id: AtomicI32,
}

impl SubscriptionIdAllocator {
    /// First id handed out by a fresh allocator.
    pub const FIRST_ID: i32 = 1;

    pub fn new() -> Self {
        Self {
            last_id: AtomicI32::new(Self::FIRST_ID - 1),
        }
    }

    /// Returns a fresh id, or `None` once every positive `i32` (including
    /// `i32::MAX`) has been used.
    pub fn next(&self) -> Option<i32> {
        // `fetch_update` retries the closure until no other thread raced us.
        // Once `i32::MAX` is out, `checked_add` fails and the counter stays
        // parked there, so exhaustion is sticky.
        self.last_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| last.checked_add(1))
            .ok()
            .map(|last| last + 1)
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> i32 {
        self.last_id.load(Ordering::Relaxed) - (Self::FIRST_ID - 1)
    }
}

impl Default for SubscriptionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_allocator_starts_at_one() {
        // Arrange
        let ids = SubscriptionIdAllocator::new();

        // Act
        let first = ids.next();

        // Assert
        assert_eq!(first, Some(1));
    }

    #[test]
    fn test_allocator_is_strictly_increasing() {
        let ids = SubscriptionIdAllocator::new();

        let values: Vec<i32> = (0..100).filter_map(|_| ids.next()).collect();

        for window in values.windows(2) {
            assert!(window[1] > window[0], "ids must strictly increase");
        }
        assert_eq!(ids.allocated(), 100);
    }

    #[test]
    fn test_allocator_reports_exhaustion_instead_of_wrapping() {
        // Arrange – only i32::MAX is left to hand out
        let ids = SubscriptionIdAllocator {
            last_id: AtomicI32::new(i32::MAX - 1),
        };

        // Act
        let last = ids.next();
        let exhausted = ids.next();

        // Assert
        assert_eq!(last, Some(i32::MAX));
        assert_eq!(exhausted, None);
        assert_eq!(ids.next(), None, "exhaustion must be sticky");
    }

    #[test]
    fn test_allocator_is_thread_safe() {
        // Arrange
        let ids = Arc::new(SubscriptionIdAllocator::new());
        let thread_count = 8;
        let per_thread = 500;

        // Act
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..per_thread).filter_map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<i32> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert – no id handed out twice
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), thread_count * per_thread);
    }
}
