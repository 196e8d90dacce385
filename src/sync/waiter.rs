//! Single-use wait gate.

use crate::error::{Error, Result};
use crate::platform::RawLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

const ARMED: u8 = 0;
const NOTIFIED: u8 = 1;
const TIMED_OUT: u8 = 2;

/// A gate that starts closed and is opened exactly once.
///
/// The gate is a [`RawLock`] taken at construction. [`acquire`](Self::acquire)
/// blocks on it; [`release`](Self::release) from any thread opens it. When the
/// wait is bounded, the expiry and an explicit release race for the same
/// armed -> released transition and only the first one counts, so the gate is
/// never opened twice.
pub struct Waiter {
    gate: RawLock,
    state: AtomicU8,
    consumed: AtomicBool,
}

impl Waiter {
    pub fn new() -> Self {
        let gate = RawLock::new();
        gate.acquire();
        Self {
            gate,
            state: AtomicU8::new(ARMED),
            consumed: AtomicBool::new(false),
        }
    }

    /// Blocks until released or until `timeout` expires. `None` waits forever;
    /// a zero timeout only polls.
    ///
    /// Returns `Ok(true)` for a genuine release, `Ok(false)` for a timeout.
    /// A second call fails with [`Error::Usage`].
    pub fn acquire(&self, timeout: Option<Duration>) -> Result<bool> {
        if self.consumed.swap(true, Ordering::AcqRel) {
            return Err(Error::usage("waiter object can only be used once"));
        }
        Ok(self.park(timeout))
    }

    /// `acquire` for a waiter known to be fresh.
    pub(crate) fn park(&self, timeout: Option<Duration>) -> bool {
        let opened = match timeout {
            Some(timeout) => self.gate.try_acquire_for(timeout),
            None => {
                self.gate.acquire();
                true
            }
        };

        if opened {
            // SAFETY: we just took the gate ourselves.
            unsafe { self.gate.release() };
            return true;
        }

        match self
            .state
            .compare_exchange(ARMED, TIMED_OUT, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                // SAFETY: the gate is still held from construction and the
                // notifier can no longer win the transition.
                unsafe { self.gate.release() };
                false
            }
            Err(_) => {
                // A release won the race; its unlock is imminent.
                self.gate.acquire();
                // SAFETY: taken on the line above.
                unsafe { self.gate.release() };
                true
            }
        }
    }

    /// Opens the gate. Returns false, without touching the gate, if it was
    /// already opened or the wait already timed out.
    pub fn release(&self) -> bool {
        if self
            .state
            .compare_exchange(ARMED, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // SAFETY: held since construction; winning the transition makes us
            // the only party allowed to open it.
            unsafe { self.gate.release() };
            true
        } else {
            false
        }
    }

    /// Whether the gate has left the armed state, by release or by timeout.
    pub fn is_released(&self) -> bool {
        self.state.load(Ordering::Acquire) != ARMED
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.load(Ordering::Acquire) {
            ARMED => "armed",
            NOTIFIED => "notified",
            _ => "timed-out",
        };
        f.debug_struct("Waiter")
            .field("state", &state)
            .field("consumed", &self.consumed.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_release_before_acquire() {
        let waiter = Waiter::new();
        assert!(waiter.release());
        assert!(waiter.acquire(None).unwrap());
    }

    #[test]
    fn test_release_from_other_thread() {
        let waiter = Arc::new(Waiter::new());
        let remote = waiter.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.release()
        });

        assert!(waiter.acquire(None).unwrap());
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_timeout() {
        let waiter = Waiter::new();
        let start = Instant::now();
        assert!(!waiter.acquire(Some(Duration::from_millis(30))).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(30));

        // Too late: the timeout already claimed the gate.
        assert!(!waiter.release());
        assert!(waiter.is_released());
    }

    #[test]
    fn test_second_release_is_noop() {
        let waiter = Waiter::new();
        assert!(waiter.release());
        assert!(!waiter.release());
    }

    #[test]
    fn test_reuse_is_usage_error() {
        let waiter = Waiter::new();
        waiter.release();
        waiter.acquire(None).unwrap();
        assert!(matches!(waiter.acquire(None), Err(Error::Usage(_))));
    }

    #[test]
    fn test_zero_timeout_polls() {
        let waiter = Waiter::new();
        assert!(!waiter.acquire(Some(Duration::ZERO)).unwrap());

        let notified = Waiter::new();
        notified.release();
        assert!(notified.acquire(Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn test_timeout_racing_release() {
        for _ in 0..200 {
            let waiter = Arc::new(Waiter::new());
            let remote = waiter.clone();
            let releaser = thread::spawn(move || remote.release());

            let got = waiter.acquire(Some(Duration::from_micros(50))).unwrap();
            let released = releaser.join().unwrap();

            // Exactly one side wins the gate.
            assert_eq!(got, released);
        }
    }
}
