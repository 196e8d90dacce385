//! Task representation and execution.

use super::panic_handler::PanicHandler;
use super::result::AsyncResult;
use crate::error::{Error, Result};
use std::cmp::Ordering as CmpOrdering;
use std::fmt;

/// Scheduling priority: lower values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub i32);

impl Priority {
    pub const HIGHEST: Priority = Priority(i32::MIN);
    pub const HIGH: Priority = Priority(-10);
    pub const NORMAL: Priority = Priority(0);
    pub const LOW: Priority = Priority(10);
    pub const LOWEST: Priority = Priority(i32::MAX);
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A callable bundled with its priority, a name and the [`AsyncResult`] its
/// outcome is delivered to.
pub struct Task<T> {
    name: String,
    priority: Priority,
    func: Box<dyn FnOnce() -> Result<T> + Send + 'static>,
    result: AsyncResult<T>,
}

impl<T: Send + 'static> Task<T> {
    /// Create a new task with normal priority
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self::from_boxed(Box::new(move || Ok(f())))
    }

    /// A task whose target reports failure by returning `Err`; the error's
    /// `Display` becomes the [`Error::Target`] seen by the submitter.
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: fmt::Display,
    {
        Self::from_boxed(Box::new(move || f().map_err(|e| Error::target(e.to_string()))))
    }

    fn from_boxed(func: Box<dyn FnOnce() -> Result<T> + Send + 'static>) -> Self {
        Task {
            name: String::new(),
            priority: Priority::NORMAL,
            func,
            result: AsyncResult::new(),
        }
    }

    pub fn with_priority<P: Into<Priority>>(mut self, priority: P) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Handle to this task's outcome.
    pub fn result(&self) -> AsyncResult<T> {
        self.result.clone()
    }

    /// Runs the target on the calling thread and completes the result, with
    /// panics handled by a default [`PanicHandler`]. Returns whether the
    /// target succeeded.
    pub fn run(self) -> bool {
        self.run_with(&PanicHandler::default())
    }

    /// Like [`run`](Self::run), with panics going through `handler` so its
    /// strategy and counters apply.
    pub fn run_with(self, handler: &PanicHandler) -> bool {
        let Task {
            name,
            func,
            result,
            ..
        } = self;

        let outcome = match handler.execute_task(&name, func) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(task = %name, error = %e, "task returned an error");
                Err(e)
            }
            Err(info) => Err(Error::from(info)),
        };
        let succeeded = outcome.is_ok();

        if let Err(e) = result.set(outcome) {
            tracing::warn!(task = %name, error = %e, "task result already completed");
        }

        succeeded
    }

    /// Erases the output type so tasks of any `T` can share one queue.
    pub(crate) fn into_job(self, seq: u64) -> Job {
        Job {
            priority: self.priority,
            seq,
            name: self.name.clone(),
            run: Box::new(move |handler: &PanicHandler| self.run_with(handler)),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

impl<T> fmt::Display for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({:?}, priority {})", self.name, self.priority)
    }
}

/// Queue element of an executor.
///
/// Ordered by priority, then by submission sequence, so equal priorities run
/// first-in first-out.
pub(crate) struct Job {
    pub(crate) priority: Priority,
    pub(crate) seq: u64,
    pub(crate) name: String,
    run: Box<dyn FnOnce(&PanicHandler) -> bool + Send + 'static>,
}

impl Job {
    pub(crate) fn run(self, handler: &PanicHandler) -> bool {
        (self.run)(handler)
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish()
    }
}
