use crate::error::Error;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Abort the process.
    Abort,
    /// Capture silently.
    Isolate,
    /// Capture and log.
    #[default]
    LogAndContinue,
}

/// Runs callables so that a panic becomes a value instead of unwinding into
/// the thread that ran them.
#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    panic_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            panic_count: AtomicUsize::new(0),
        }
    }

    /// Runs `f`, applying the strategy if it panics.
    pub fn execute<F, R>(&self, f: F) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        capture(f).map_err(|info| self.on_panic(None, info))
    }

    /// `execute` for a submitted task; `task` names it in the log record.
    pub fn execute_task<F, R>(&self, task: &str, f: F) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        capture(f).map_err(|info| self.on_panic(Some(task), info))
    }

    fn on_panic(&self, task: Option<&str>, info: PanicInfo) -> PanicInfo {
        self.panic_count.fetch_add(1, Ordering::Relaxed);

        let thread = info.thread.as_deref().unwrap_or("<unnamed>");
        let task = task.filter(|name| !name.is_empty()).unwrap_or("<anonymous>");

        match self.strategy {
            PanicStrategy::Abort => {
                tracing::error!(task, thread, message = %info.message, "panic under abort strategy, aborting");
                std::process::abort();
            }
            PanicStrategy::Isolate => {}
            PanicStrategy::LogAndContinue => {
                tracing::error!(task, thread, message = %info.message, "target panicked");
            }
        }

        info
    }

    pub fn panic_count(&self) -> usize {
        self.panic_count.load(Ordering::Relaxed)
    }

    pub fn reset_count(&self) {
        self.panic_count.store(0, Ordering::Relaxed);
    }

    pub fn strategy(&self) -> PanicStrategy {
        self.strategy
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::new(PanicStrategy::default())
    }
}

/// Calls `f`, turning a panic into `Err` without any bookkeeping.
pub(crate) fn capture<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}

#[derive(Debug, Clone)]
pub struct PanicInfo {
    pub message: String,
    pub thread: Option<String>,
}

impl PanicInfo {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(owned) => *owned,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map_or_else(|| "panic with a non-string payload".to_string(), |s| s.to_string()),
        };

        Self {
            message,
            thread: std::thread::current().name().map(String::from),
        }
    }
}

impl From<PanicInfo> for Error {
    fn from(info: PanicInfo) -> Self {
        Error::Target(info.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_isolate_returns_payload_message() {
        let handler = PanicHandler::new(PanicStrategy::Isolate);

        let info = handler.execute(|| -> u8 { panic!("gate broke") }).unwrap_err();

        assert_eq!(info.message, "gate broke");
        assert_eq!(handler.panic_count(), 1);
    }

    #[test]
    fn test_value_passes_through() {
        let handler = PanicHandler::default();
        assert_eq!(handler.execute(|| "ok").unwrap(), "ok");
        assert_eq!(handler.panic_count(), 0);
        assert_eq!(handler.strategy(), PanicStrategy::LogAndContinue);
    }

    #[test]
    fn test_formatted_payload_and_count_reset() {
        let handler = PanicHandler::new(PanicStrategy::LogAndContinue);

        for i in 0..3 {
            let info = handler.execute(|| panic!("attempt {}", i)).unwrap_err();
            assert_eq!(info.message, format!("attempt {}", i));
        }
        assert_eq!(handler.panic_count(), 3);

        handler.reset_count();
        assert_eq!(handler.panic_count(), 0);
    }

    #[test]
    fn test_execute_task_counts_like_execute() {
        let handler = PanicHandler::new(PanicStrategy::LogAndContinue);

        assert_eq!(handler.execute_task("blink", || 3).unwrap(), 3);
        let info = handler
            .execute_task("blink", || -> u8 { panic!("led stuck") })
            .unwrap_err();

        assert_eq!(info.message, "led stuck");
        assert_eq!(handler.panic_count(), 1);
    }

    #[test]
    fn test_records_thread_name() {
        let info = thread::Builder::new()
            .name("blinker".into())
            .spawn(|| capture(|| panic!("led stuck")).unwrap_err())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(info.thread.as_deref(), Some("blinker"));
        assert!(matches!(Error::from(info), Error::Target(msg) if msg == "led stuck"));
    }
}
