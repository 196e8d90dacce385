//! Owner-tracked mutual exclusion.

use crate::platform::{RawLock, ThreadIdent};
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A non-reentrant lock that remembers which thread holds it.
///
/// `Lock<()>` is a bare lock; any other `T` is the state it protects. Holding
/// is expressed by a [`LockGuard`], which releases the lock on every exit path
/// when dropped. Acquiring twice from the same thread deadlocks.
pub struct Lock<T: ?Sized = ()> {
    raw: RawLock,
    // 0 while free; the holder's ThreadIdent otherwise.
    owner: AtomicU64,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for Lock<T> {}
unsafe impl<T: ?Sized + Send> Sync for Lock<T> {}

impl<T> Lock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            raw: RawLock::new(),
            owner: AtomicU64::new(0),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Lock<T> {
    /// Blocks until the calling thread holds the lock.
    pub fn acquire(&self) -> LockGuard<'_, T> {
        self.raw.acquire();
        self.mark_held();
        LockGuard::new(self)
    }

    pub fn try_acquire(&self) -> Option<LockGuard<'_, T>> {
        if self.raw.try_acquire() {
            self.mark_held();
            Some(LockGuard::new(self))
        } else {
            None
        }
    }

    pub fn try_acquire_for(&self, timeout: Duration) -> Option<LockGuard<'_, T>> {
        if self.raw.try_acquire_for(timeout) {
            self.mark_held();
            Some(LockGuard::new(self))
        } else {
            None
        }
    }

    pub fn locked(&self) -> bool {
        self.raw.locked()
    }

    /// The current holder, or `None` while the lock is free.
    pub fn owner(&self) -> Option<ThreadIdent> {
        ThreadIdent::from_u64(self.owner.load(Ordering::Acquire))
    }

    /// Whether the calling thread is the holder.
    pub fn is_owned(&self) -> bool {
        self.owner() == Some(ThreadIdent::current())
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    fn mark_held(&self) {
        self.owner
            .store(ThreadIdent::current().as_u64(), Ordering::Release);
    }

    fn release_raw(&self) {
        self.owner.store(0, Ordering::Release);
        // SAFETY: only reached from a live guard (or its temporary unlock),
        // which stands for exactly one acquisition by this thread.
        unsafe { self.raw.release() };
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for Lock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("locked", &self.locked())
            .field("owner", &self.owner())
            .finish_non_exhaustive()
    }
}

/// Proof that the current thread holds a [`Lock`].
///
/// Not `Send`: ownership is tied to the acquiring thread's identity.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, T: ?Sized> {
    lock: &'a Lock<T>,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: ?Sized + Sync> Sync for LockGuard<'_, T> {}

impl<'a, T: ?Sized> LockGuard<'a, T> {
    fn new(lock: &'a Lock<T>) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }

    /// The lock this guard holds.
    pub fn lock(this: &Self) -> &'a Lock<T> {
        this.lock
    }

    /// Releases the lock now instead of at the end of scope.
    pub fn release(this: Self) {
        drop(this);
    }

    /// Runs `f` with the lock released, re-acquiring it before returning,
    /// also when `f` unwinds.
    pub(crate) fn unlocked<R>(this: &mut Self, f: impl FnOnce() -> R) -> R {
        struct Relock<'b, T: ?Sized>(&'b Lock<T>);

        impl<T: ?Sized> Drop for Relock<'_, T> {
            fn drop(&mut self) {
                self.0.raw.acquire();
                self.0.mark_held();
            }
        }

        this.lock.release_raw();
        let _relock = Relock(this.lock);
        f()
    }
}

impl<T: ?Sized> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for LockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_raw();
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for LockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
