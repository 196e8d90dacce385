//! One-shot result handle shared between the thread doing the work and the
//! thread waiting for it.

use crate::error::{Error, Result};
use crate::sync::{Event, Lock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

enum Slot<T> {
    Empty,
    Ready(Result<T>),
    Taken,
}

struct Shared<T> {
    slot: Lock<Slot<T>>,
    finished: Event,
}

/// The eventual value, or error, of work running elsewhere.
///
/// Clones refer to the same result. It is completed once with
/// [`set`](Self::set) and read once with [`get`](Self::get).
pub struct AsyncResult<T> {
    shared: Arc<Shared<T>>,
}

impl<T> AsyncResult<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Lock::new(Slot::Empty),
                finished: Event::new(),
            }),
        }
    }

    /// Stores the outcome and wakes the reader. A second call fails with
    /// [`Error::Usage`] and leaves the first outcome in place.
    pub fn set(&self, outcome: Result<T>) -> Result<()> {
        {
            let mut slot = self.shared.slot.acquire();
            if !matches!(*slot, Slot::Empty) {
                return Err(Error::usage("result already set"));
            }
            *slot = Slot::Ready(outcome);
        }
        self.shared.finished.set();
        Ok(())
    }

    pub fn set_value(&self, value: T) -> Result<()> {
        self.set(Ok(value))
    }

    pub fn set_error(&self, error: Error) -> Result<()> {
        self.set(Err(error))
    }

    /// Blocks until the outcome is available, up to `timeout` (`None` =
    /// forever), and takes it.
    ///
    /// Returns the stored value or the stored error; [`Error::Timeout`] if the
    /// wait expired; [`Error::Usage`] if the outcome was already taken.
    pub fn get(&self, timeout: Option<Duration>) -> Result<T> {
        if !self.shared.finished.wait(timeout) {
            return Err(Error::Timeout);
        }

        let mut slot = self.shared.slot.acquire();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(outcome) => outcome,
            Slot::Taken => Err(Error::usage("result already taken")),
            Slot::Empty => {
                *slot = Slot::Empty;
                Err(Error::Timeout)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.shared.finished.is_set()
    }
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for AsyncResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("ready", &self.is_ready())
            .finish()
    }
}
