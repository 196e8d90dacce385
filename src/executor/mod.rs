//! Task execution infrastructure.
//!
//! This module provides the one-shot [`AsyncResult`], the restartable
//! [`Thread`] wrapper, prioritized [`Task`]s and the [`ThreadPoolExecutor`]
//! that runs them.

pub mod panic_handler;
pub mod pool;
pub mod result;
pub mod task;
pub mod thread;
pub mod worker;

pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use pool::ThreadPoolExecutor;
pub use result::AsyncResult;
pub use task::{Priority, Task};
pub use thread::{StopToken, Thread};
pub use worker::{ExecutorStats, StatsSnapshot, WorkerId};
