use super::condition::Condition;
use std::fmt;
use std::time::Duration;

/// A boolean flag that threads can wait on.
pub struct Event {
    cond: Condition<bool>,
}

impl Event {
    pub fn new() -> Self {
        Self {
            cond: Condition::new(false),
        }
    }

    /// Sets the flag and wakes every waiter.
    pub fn set(&self) {
        let mut flag = self.cond.acquire();
        *flag = true;
        self.cond.notify_locked(&flag, usize::MAX);
    }

    pub fn clear(&self) {
        *self.cond.acquire() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.cond.acquire()
    }

    /// Blocks until the flag is set or `timeout` elapses. Returns whether the
    /// flag was set; returns at once if it already is.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut flag = self.cond.acquire();
        self.cond.wait_for_locked(&mut flag, timeout, |set| *set)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("set", &self.is_set()).finish()
    }
}
