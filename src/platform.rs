//! The two platform facilities everything else is built from.
//!
//! [`RawLock`] is a non-reentrant mutual-exclusion lock with no owner and no
//! guard: any thread may release it, which is what lets a [`Waiter`] be opened
//! by the notifying thread. Its timed acquire doubles as the one-shot timer used
//! to bound waits. [`spawn`] runs a callable on a fresh OS thread.
//!
//! [`Waiter`]: crate::sync::Waiter

use parking_lot::lock_api::{RawMutex as _, RawMutexTimed as _};
use std::cell::Cell;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct RawLock {
    inner: parking_lot::RawMutex,
}

impl RawLock {
    pub const fn new() -> Self {
        Self {
            inner: <parking_lot::RawMutex as parking_lot::lock_api::RawMutex>::INIT,
        }
    }

    /// Blocks until the lock is taken.
    pub fn acquire(&self) {
        self.inner.lock();
    }

    pub fn try_acquire(&self) -> bool {
        self.inner.try_lock()
    }

    /// Blocks for at most `timeout`. Returns false if the lock is still held
    /// by someone else when it expires.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        self.inner.try_lock_for(timeout)
    }

    pub fn locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Releases the lock. The releasing thread need not be the one that took it.
    ///
    /// # Safety
    ///
    /// The lock must currently be held, and the caller must be the single party
    /// entitled to release this particular acquisition.
    pub unsafe fn release(&self) {
        self.inner.unlock();
    }
}

impl Default for RawLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawLock")
            .field("locked", &self.locked())
            .finish()
    }
}

/// Global identity counter
static NEXT_IDENT: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_IDENT: Cell<Option<ThreadIdent>> = const { Cell::new(None) };
}

/// Process-unique identity of an OS thread.
///
/// Threads started through [`spawn`] get their identity before the target runs,
/// so the spawner knows it up front; any other thread is assigned one the first
/// time it asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadIdent(NonZeroU64);

impl ThreadIdent {
    pub(crate) fn next() -> Self {
        let raw = NEXT_IDENT.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 threads to wrap.
        ThreadIdent(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Identity of the calling thread.
    pub fn current() -> Self {
        CURRENT_IDENT.with(|cell| match cell.get() {
            Some(ident) => ident,
            None => {
                let ident = Self::next();
                cell.set(Some(ident));
                ident
            }
        })
    }

    pub fn as_u64(self) -> u64 {
        self.0.get()
    }

    pub(crate) fn from_u64(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ThreadIdent)
    }

    fn adopt(self) {
        CURRENT_IDENT.with(|cell| cell.set(Some(self)));
    }
}

impl fmt::Display for ThreadIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runs `f` on a new OS thread that carries `ident` as its identity.
pub(crate) fn spawn<F>(
    ident: ThreadIdent,
    name: Option<String>,
    stack_size: Option<usize>,
    f: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let mut builder = thread::Builder::new();

    if let Some(name) = name {
        builder = builder.name(name);
    }

    if let Some(stack_size) = stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder.spawn(move || {
        ident.adopt();
        f();
    })
}
