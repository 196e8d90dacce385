//! Commonly used items, for glob import.

pub use crate::config::{ExecutorConfig, QueueOrder};
pub use crate::error::{Error, Result};
pub use crate::executor::{
    AsyncResult, PanicStrategy, Priority, StopToken, Task, Thread, ThreadPoolExecutor,
};
pub use crate::platform::ThreadIdent;
pub use crate::queue::{FifoQueue, LifoQueue, PriorityQueue, Queue};
pub use crate::sync::{
    BoundedSemaphore, Condition, Event, Lock, LockGuard, Semaphore, SemaphorePermit, Waiter,
};
