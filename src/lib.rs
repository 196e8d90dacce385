//! lockstep - classic thread synchronization built from two primitives
//!
//! Every blocking type in this crate is layered on a raw, owner-less lock and
//! a thread spawner (see [`platform`]). On top of those sit an owner-tracked
//! [`Lock`], single-use [`Waiter`] gates, FIFO [`Condition`] variables,
//! [`Event`]s, counting and bounded [`Semaphore`]s, bounded blocking
//! [`Queue`]s in FIFO, LIFO and priority flavors, and a growth-only
//! [`ThreadPoolExecutor`] whose submissions resolve through [`AsyncResult`]s.
//!
//! # Quick Start
//!
//! ```no_run
//! use lockstep::prelude::*;
//! use std::time::Duration;
//!
//! let pool = ThreadPoolExecutor::with_max_workers(4).unwrap();
//!
//! let answer = pool.submit(|| 6 * 7).unwrap();
//! assert_eq!(answer.get(Some(Duration::from_secs(1))).unwrap(), 42);
//!
//! let urgent = Task::new(|| "first").with_priority(Priority::HIGH);
//! println!("{}", pool.submit_task(urgent).unwrap().get(None).unwrap());
//! ```
//!
//! # Features
//!
//! - **Scoped locking**: guards release on drop, and condition waits check ownership
//! - **FIFO wakeups**: condition waiters are notified in arrival order
//! - **Bounded waits**: every blocking call takes an optional timeout
//! - **Priority scheduling**: lower [`Priority`] values run first, ties run in submission order
//! - **Panic capture**: a panicking task fails its result, never its worker

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod platform;
pub mod prelude;
pub mod queue;
pub mod sync;

pub use config::{ExecutorConfig, ExecutorConfigBuilder, QueueOrder};
pub use error::{Error, Result};
pub use executor::{AsyncResult, Priority, StopToken, Task, Thread, ThreadPoolExecutor};
pub use platform::ThreadIdent;
pub use queue::{FifoQueue, LifoQueue, PriorityQueue, Queue};
pub use sync::{BoundedSemaphore, Condition, Event, Lock, LockGuard, Semaphore, Waiter};
