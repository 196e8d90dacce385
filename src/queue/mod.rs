//! Bounded blocking queues.
//!
//! A [`Queue`] is one [`Lock`] around its items plus two [`Condition`]s on that
//! lock: producers wait on "not full", consumers on "not empty". The [`Store`]
//! type parameter picks the ordering; [`FifoQueue`], [`LifoQueue`] and
//! [`PriorityQueue`] are the three stock ones.

pub mod store;

pub use store::{Fifo, Heap, Lifo, Store};

use crate::error::{Error, Result};
use crate::sync::{Condition, Lock};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Capacity used by `Default`.
pub const DEFAULT_CAPACITY: usize = 100;

pub type FifoQueue<T> = Queue<T, Fifo<T>>;
pub type LifoQueue<T> = Queue<T, Lifo<T>>;
pub type PriorityQueue<T> = Queue<T, Heap<T>>;

pub struct Queue<T, S: Store<T> = Fifo<T>> {
    capacity: usize,
    lock: Arc<Lock<S>>,
    not_empty: Condition<S>,
    not_full: Condition<S>,
    _item: PhantomData<fn(T) -> T>,
}

impl<T, S: Store<T>> Queue<T, S> {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_store(capacity, S::default())
    }

    fn with_store(capacity: usize, store: S) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("queue capacity must be > 0"));
        }
        if store.len() > capacity {
            return Err(Error::config(format!(
                "{} items exceed queue capacity {}",
                store.len(),
                capacity
            )));
        }

        Ok(Self::build(capacity, store))
    }

    fn build(capacity: usize, store: S) -> Self {
        let lock = Arc::new(Lock::new(store));
        Self {
            capacity,
            not_empty: Condition::with_lock(lock.clone()),
            not_full: Condition::with_lock(lock.clone()),
            lock,
            _item: PhantomData,
        }
    }

    /// Adds `item`.
    ///
    /// When the queue is full: with `block == false` fails with [`Error::Full`];
    /// otherwise waits up to `timeout` (`None` = forever) and fails with
    /// [`Error::Timeout`] if no room appeared. A zero timeout with blocking
    /// requested is a usage error.
    pub fn put(&self, item: T, block: bool, timeout: Option<Duration>) -> Result<()> {
        check_timeout(block, timeout)?;

        let mut store = self.not_full.acquire();
        let capacity = self.capacity;

        if !block {
            if store.len() >= capacity {
                return Err(Error::Full);
            }
        } else if !self
            .not_full
            .wait_for_locked(&mut store, timeout, |s| s.len() < capacity)
        {
            return Err(Error::Timeout);
        }

        store.push(item);
        self.not_empty.notify_locked(&store, 1);
        Ok(())
    }

    /// Removes the next item according to the queue's ordering.
    ///
    /// Mirrors [`put`](Self::put): [`Error::Empty`] when not blocking,
    /// [`Error::Timeout`] when a bounded wait expires.
    pub fn get(&self, block: bool, timeout: Option<Duration>) -> Result<T> {
        check_timeout(block, timeout)?;

        let mut store = self.not_empty.acquire();

        if !block {
            if store.is_empty() {
                return Err(Error::Empty);
            }
        } else if !self
            .not_empty
            .wait_for_locked(&mut store, timeout, |s| !s.is_empty())
        {
            return Err(Error::Timeout);
        }

        let item = store.pop().ok_or(Error::Empty)?;
        self.not_full.notify_locked(&store, 1);
        Ok(item)
    }

    pub fn try_put(&self, item: T) -> Result<()> {
        self.put(item, false, None)
    }

    pub fn try_get(&self) -> Result<T> {
        self.get(false, None)
    }

    pub fn size(&self) -> usize {
        self.lock.acquire().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discards every item and wakes blocked producers.
    pub fn clear(&self) {
        let mut store = self.lock.acquire();
        store.clear();
        self.not_full.notify_locked(&store, usize::MAX);
    }
}

impl<T: Ord> Queue<T, Heap<T>> {
    /// Builds a priority queue already holding `items`, heapified in O(n).
    pub fn from_vec(capacity: usize, items: Vec<T>) -> Result<Self> {
        Self::with_store(capacity, Heap::from_vec(items))
    }
}

impl<T, S: Store<T>> Default for Queue<T, S> {
    fn default() -> Self {
        Self::build(DEFAULT_CAPACITY, S::default())
    }
}

impl<T, S: Store<T>> fmt::Debug for Queue<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("size", &self.size())
            .field("capacity", &self.capacity)
            .finish()
    }
}

fn check_timeout(block: bool, timeout: Option<Duration>) -> Result<()> {
    if block && timeout.is_some_and(|t| t.is_zero()) {
        return Err(Error::usage("'timeout' must be a positive duration"));
    }
    Ok(())
}
