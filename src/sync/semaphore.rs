//! Counting semaphores.

use super::condition::Condition;
use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

/// A counting semaphore.
///
/// Waiters blocked in [`acquire`](Self::acquire) are served in arrival order.
pub struct Semaphore {
    cond: Condition<usize>,
    ceiling: Option<usize>,
}

impl Semaphore {
    pub fn new(value: usize) -> Self {
        Self {
            cond: Condition::new(value),
            ceiling: None,
        }
    }

    fn bounded(value: usize) -> Self {
        Self {
            cond: Condition::new(value),
            ceiling: Some(value),
        }
    }

    /// Takes one permit.
    ///
    /// With `block == false` this never waits and reports whether a permit was
    /// available. Otherwise it waits up to `timeout` (`None` = forever) and
    /// returns false if none became available in time. A zero timeout with
    /// blocking requested is a usage error.
    pub fn acquire(&self, block: bool, timeout: Option<Duration>) -> Result<bool> {
        if block && timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::usage("'timeout' must be a positive duration"));
        }

        let mut count = self.cond.acquire();

        if !block {
            if *count > 0 {
                *count -= 1;
                return Ok(true);
            }
            return Ok(false);
        }

        if self.cond.wait_for_locked(&mut count, timeout, |c| *c > 0) {
            *count -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Non-blocking `acquire`.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.cond.acquire();
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks for a permit and returns it as a guard that gives it back on drop.
    pub fn permit(&self) -> SemaphorePermit<'_> {
        let mut count = self.cond.acquire();
        self.cond.wait_for_locked(&mut count, None, |c| *c > 0);
        *count -= 1;
        SemaphorePermit { sem: self }
    }

    /// Returns `n` permits and wakes up to `n` waiters.
    pub fn release(&self, n: usize) -> Result<()> {
        if n < 1 {
            return Err(Error::usage("n must be one or more"));
        }

        let mut count = self.cond.acquire();

        let raised = count
            .checked_add(n)
            .filter(|raised| self.ceiling.map_or(true, |ceiling| *raised <= ceiling))
            .ok_or_else(|| Error::usage("semaphore released too many times"))?;

        *count = raised;
        self.cond.notify_locked(&count, n);
        Ok(())
    }

    /// Drops every available permit.
    pub fn clear(&self) {
        *self.cond.acquire() = 0;
    }

    /// Snapshot of the available permits.
    pub fn value(&self) -> usize {
        *self.cond.acquire()
    }

    pub fn ceiling(&self) -> Option<usize> {
        self.ceiling
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("value", &self.value())
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

/// A semaphore that refuses to hold more permits than it started with.
#[derive(Debug)]
pub struct BoundedSemaphore {
    inner: Semaphore,
}

impl BoundedSemaphore {
    pub fn new(value: usize) -> Self {
        Self {
            inner: Semaphore::bounded(value),
        }
    }

    pub fn acquire(&self, block: bool, timeout: Option<Duration>) -> Result<bool> {
        self.inner.acquire(block, timeout)
    }

    pub fn try_acquire(&self) -> bool {
        self.inner.try_acquire()
    }

    pub fn permit(&self) -> SemaphorePermit<'_> {
        self.inner.permit()
    }

    /// Fails with [`Error::Usage`] if the count would pass the initial value.
    pub fn release(&self, n: usize) -> Result<()> {
        self.inner.release(n)
    }

    pub fn clear(&self) {
        self.inner.clear()
    }

    pub fn value(&self) -> usize {
        self.inner.value()
    }

    pub fn ceiling(&self) -> usize {
        self.inner.ceiling.unwrap_or_default()
    }
}

impl Default for BoundedSemaphore {
    fn default() -> Self {
        Self::new(1)
    }
}

/// One permit held from a [`Semaphore`]; released on drop.
#[must_use = "the permit is returned as soon as it is dropped"]
pub struct SemaphorePermit<'a> {
    sem: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sem.release(1) {
            tracing::warn!(error = %e, "semaphore permit could not be returned");
        }
    }
}

impl fmt::Debug for SemaphorePermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemaphorePermit").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_non_blocking_acquire() {
        let sem = Semaphore::new(1);
        assert!(sem.acquire(false, None).unwrap());
        assert!(!sem.acquire(false, None).unwrap());
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_zero_timeout_is_usage_error() {
        let sem = Semaphore::new(1);
        assert!(matches!(
            sem.acquire(true, Some(Duration::ZERO)),
            Err(Error::Usage(_))
        ));
        // Non-blocking calls ignore the timeout.
        assert!(sem.acquire(false, Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn test_blocking_acquire_times_out() {
        let sem = Semaphore::new(0);
        let start = Instant::now();
        assert!(!sem.acquire(true, Some(Duration::from_millis(40))).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_release_wakes_blocked_acquirer() {
        let sem = Arc::new(Semaphore::new(0));
        let remote = sem.clone();
        let handle = thread::spawn(move || remote.acquire(true, None).unwrap());

        thread::sleep(Duration::from_millis(20));
        sem.release(1).unwrap();

        assert!(handle.join().unwrap());
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_release_zero_is_usage_error() {
        let sem = Semaphore::new(0);
        assert!(matches!(sem.release(0), Err(Error::Usage(_))));
    }

    #[test]
    fn test_release_overflow_is_usage_error() {
        let bounded = BoundedSemaphore::new(1);
        assert!(matches!(bounded.release(usize::MAX), Err(Error::Usage(_))));
        assert_eq!(bounded.value(), 1);

        let plain = Semaphore::new(1);
        assert!(matches!(plain.release(usize::MAX), Err(Error::Usage(_))));
        assert_eq!(plain.value(), 1);

        plain.release(3).unwrap();
        assert_eq!(plain.value(), 4);
    }

    #[test]
    fn test_bounded_ceiling() {
        let sem = BoundedSemaphore::new(2);
        assert!(sem.acquire(true, None).unwrap());
        assert!(sem.acquire(true, None).unwrap());
        assert_eq!(sem.value(), 0);

        sem.release(1).unwrap();
        sem.release(1).unwrap();
        assert_eq!(sem.value(), 2);

        assert!(matches!(sem.release(1), Err(Error::Usage(_))));
        assert_eq!(sem.value(), 2);
        assert_eq!(sem.ceiling(), 2);
    }

    #[test]
    fn test_permit_returns_on_drop() {
        let sem = Semaphore::new(1);
        {
            let _permit = sem.permit();
            assert_eq!(sem.value(), 0);
            assert!(!sem.try_acquire());
        }
        assert_eq!(sem.value(), 1);
    }

    #[test]
    fn test_clear_then_release_burst() {
        // A worker consumes exactly the last burst of permits.
        let sem = Arc::new(Semaphore::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));

        sem.release(5).unwrap();
        sem.clear();
        sem.release(3).unwrap();

        let worker = {
            let sem = sem.clone();
            let ticks = ticks.clone();
            thread::spawn(move || {
                while sem.acquire(true, Some(Duration::from_millis(50))).unwrap() {
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        worker.join().unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_count_never_exceeds_ceiling_under_contention() {
        let sem = Arc::new(BoundedSemaphore::new(3));
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let sem = sem.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        if sem.acquire(true, Some(Duration::from_secs(5))).unwrap() {
                            assert!(sem.value() <= 3);
                            sem.release(1).unwrap();
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sem.value(), 3);
    }
}
