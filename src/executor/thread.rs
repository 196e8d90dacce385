//! Restartable OS thread wrapper whose every run yields an [`AsyncResult`].

use super::panic_handler::PanicHandler;
use super::result::AsyncResult;
use crate::error::{Error, Result};
use crate::platform::{self, ThreadIdent};
use crate::sync::Lock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Cooperative stop request shared between a [`Thread`] and its target.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }
}

type Target<T> = Arc<dyn Fn(&StopToken) -> T + Send + Sync>;

struct Running {
    ident: ThreadIdent,
    handle: JoinHandle<()>,
    stop: StopToken,
}

/// A unit of work that runs `target` on its own OS thread.
///
/// Each [`start`](Self::start) spawns a fresh thread and returns the
/// [`AsyncResult`] of that run. Panics in the target land in the result as
/// [`Error::Target`] instead of tearing the thread down uncaught.
///
/// There is no forced kill: [`stop`](Self::stop) raises the run's
/// [`StopToken`], and targets created with [`with_stop_token`](Self::with_stop_token)
/// are expected to check it at safe points.
pub struct Thread<T> {
    target: Target<T>,
    name: Option<String>,
    stack_size: Option<usize>,
    panic_handler: Arc<PanicHandler>,
    running: Lock<Option<Running>>,
}

impl<T: Send + 'static> Thread<T> {
    pub fn new<F>(target: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_stop_token(move |_| target())
    }

    pub fn with_stop_token<F>(target: F) -> Self
    where
        F: Fn(&StopToken) -> T + Send + Sync + 'static,
    {
        Self {
            target: Arc::new(target),
            name: None,
            stack_size: None,
            panic_handler: Arc::new(PanicHandler::default()),
            running: Lock::new(None),
        }
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn panic_handler(mut self, handler: Arc<PanicHandler>) -> Self {
        self.panic_handler = handler;
        self
    }

    /// Spawns the target unless a previous run is still alive.
    ///
    /// Returns `Ok(None)` when already running.
    pub fn start(&self) -> Result<Option<AsyncResult<T>>> {
        let mut running = self.running.acquire();

        if running.as_ref().is_some_and(Running::is_alive) {
            return Ok(None);
        }

        let result = AsyncResult::new();
        let ident = ThreadIdent::next();
        let stop = StopToken::new();

        let target = Arc::clone(&self.target);
        let handler = Arc::clone(&self.panic_handler);
        let outcome_slot = result.clone();
        let token = stop.clone();

        let handle = platform::spawn(ident, self.name.clone(), self.stack_size, move || {
            let outcome = handler.execute(|| target(&token)).map_err(Error::from);
            if let Err(e) = outcome_slot.set(outcome) {
                tracing::warn!(error = %e, "thread result already completed");
            }
        })
        .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

        *running = Some(Running {
            ident,
            handle,
            stop,
        });

        Ok(Some(result))
    }

    /// Asks the current run to stop. Returns whether a run was alive.
    pub fn stop(&self) -> bool {
        let running = self.running.acquire();
        match running.as_ref() {
            Some(run) if run.is_alive() => {
                run.stop.stop();
                true
            }
            _ => false,
        }
    }

    /// Waits for the current run to finish.
    pub fn join(&self) -> Result<()> {
        let run = self.running.acquire().take();
        match run {
            Some(run) => run
                .handle
                .join()
                .map_err(|_| Error::WorkerPanic(format!("thread {} unwound", run.ident))),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.acquire().as_ref().is_some_and(Running::is_alive)
    }

    /// Identity of the most recent run.
    pub fn ident(&self) -> Option<ThreadIdent> {
        self.running.acquire().as_ref().map(|run| run.ident)
    }
}

impl Running {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl<T> fmt::Debug for Thread<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let running = self.running.acquire();
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("ident", &running.as_ref().map(|run| run.ident))
            .field("running", &running.as_ref().is_some_and(Running::is_alive))
            .finish()
    }
}
