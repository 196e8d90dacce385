//! FIFO condition variable built from a [`Lock`] and per-wait [`Waiter`]s.

use super::lock::{Lock, LockGuard};
use super::waiter::Waiter;
use crate::error::{Error, Result};
use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::fmt;
use std::ptr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Condition variable over a shared [`Lock`].
///
/// Each wait registers a fresh [`Waiter`] at the back of the wait list while
/// the lock is still held, then releases the lock and blocks on the waiter.
/// Because registration happens before release, a notify issued after the
/// lock changes hands always finds the waiter. Notifies wake waiters in
/// registration order.
///
/// Several conditions may share one lock; each keeps its own wait list.
pub struct Condition<T: ?Sized = ()> {
    lock: Arc<Lock<T>>,
    // Only touched while `lock` is held by the current thread.
    waiters: UnsafeCell<VecDeque<Arc<Waiter>>>,
}

unsafe impl<T: ?Sized + Send> Send for Condition<T> {}
unsafe impl<T: ?Sized + Send> Sync for Condition<T> {}

impl<T> Condition<T> {
    /// A condition with its own lock around `value`.
    pub fn new(value: T) -> Self {
        Self::with_lock(Arc::new(Lock::new(value)))
    }
}

impl<T: ?Sized> Condition<T> {
    pub fn with_lock(lock: Arc<Lock<T>>) -> Self {
        Self {
            lock,
            waiters: UnsafeCell::new(VecDeque::new()),
        }
    }

    pub fn lock(&self) -> &Arc<Lock<T>> {
        &self.lock
    }

    pub fn acquire(&self) -> LockGuard<'_, T> {
        self.lock.acquire()
    }

    /// Releases the lock held by `guard`, waits for a notify or for `timeout`,
    /// and re-acquires the lock before returning.
    ///
    /// Returns `Ok(true)` if woken by a notify and `Ok(false)` on timeout.
    /// Fails with [`Error::Usage`] if `guard` belongs to a different lock.
    pub fn wait(&self, guard: &mut LockGuard<'_, T>, timeout: Option<Duration>) -> Result<bool> {
        self.check_guard(guard)?;
        Ok(self.wait_locked(guard, timeout))
    }

    /// Waits until `predicate` holds or `timeout` elapses in total, however
    /// many wakeups happen in between. Returns the last value of `predicate`.
    pub fn wait_for<F>(
        &self,
        guard: &mut LockGuard<'_, T>,
        timeout: Option<Duration>,
        predicate: F,
    ) -> Result<bool>
    where
        F: FnMut(&T) -> bool,
    {
        self.check_guard(guard)?;
        Ok(self.wait_for_locked(guard, timeout, predicate))
    }

    /// Wakes up to `n` waiters, oldest first. Returns how many were woken.
    ///
    /// The calling thread must hold the lock.
    pub fn notify(&self, n: usize) -> Result<usize> {
        self.check_owned()?;
        // SAFETY: the current thread holds the lock.
        Ok(unsafe { self.wake(n) })
    }

    pub fn notify_all(&self) -> Result<usize> {
        self.check_owned()?;
        // SAFETY: the current thread holds the lock.
        Ok(unsafe { self.wake(usize::MAX) })
    }

    /// Number of registered waiters. The calling thread must hold the lock.
    pub fn waiter_count(&self) -> Result<usize> {
        self.check_owned()?;
        // SAFETY: the current thread holds the lock.
        Ok(unsafe { self.waiters_mut() }.len())
    }

    pub(crate) fn wait_locked(&self, guard: &mut LockGuard<'_, T>, timeout: Option<Duration>) -> bool {
        let waiter = Arc::new(Waiter::new());
        // SAFETY: `guard` is for our lock (checked by callers) and lives on this thread.
        unsafe { self.waiters_mut() }.push_back(Arc::clone(&waiter));

        let notified = LockGuard::unlocked(guard, || waiter.park(timeout));

        if !notified {
            // SAFETY: the lock was re-acquired by `unlocked`.
            let waiters = unsafe { self.waiters_mut() };
            if let Some(pos) = waiters.iter().position(|w| Arc::ptr_eq(w, &waiter)) {
                waiters.remove(pos);
            }
        }

        notified
    }

    pub(crate) fn wait_for_locked<F>(
        &self,
        guard: &mut LockGuard<'_, T>,
        timeout: Option<Duration>,
        mut predicate: F,
    ) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if predicate(&**guard) {
                return true;
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            self.wait_locked(guard, remaining);
        }
    }

    /// Wake path for callers that already hold `guard` on this lock.
    pub(crate) fn notify_locked(&self, guard: &LockGuard<'_, T>, n: usize) -> usize {
        debug_assert!(self.owns(guard));
        // SAFETY: `guard` proves the current thread holds the lock.
        unsafe { self.wake(n) }
    }

    /// # Safety
    ///
    /// The current thread must hold `self.lock`.
    unsafe fn wake(&self, n: usize) -> usize {
        let waiters = self.waiters_mut();
        let mut woken = 0;

        while woken < n {
            let Some(waiter) = waiters.pop_front() else {
                break;
            };
            // A waiter whose timeout already fired refuses the release and is
            // about to deregister itself; it does not use up a wakeup.
            if waiter.release() {
                woken += 1;
            }
        }

        woken
    }

    /// # Safety
    ///
    /// The current thread must hold `self.lock`, and the returned reference
    /// must not outlive that hold or overlap another call.
    #[allow(clippy::mut_from_ref)]
    unsafe fn waiters_mut(&self) -> &mut VecDeque<Arc<Waiter>> {
        &mut *self.waiters.get()
    }

    fn owns(&self, guard: &LockGuard<'_, T>) -> bool {
        ptr::eq(LockGuard::lock(guard), Arc::as_ptr(&self.lock))
    }

    fn check_guard(&self, guard: &LockGuard<'_, T>) -> Result<()> {
        if self.owns(guard) {
            Ok(())
        } else {
            Err(Error::usage("cannot wait on un-acquired lock"))
        }
    }

    fn check_owned(&self) -> Result<()> {
        if self.lock.is_owned() {
            Ok(())
        } else {
            Err(Error::usage("cannot notify on un-acquired lock"))
        }
    }
}

impl<T: Default> Default for Condition<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}
