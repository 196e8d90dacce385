//! Blocking synchronization primitives.
//!
//! Everything here is layered on [`platform::RawLock`](crate::platform::RawLock):
//! [`Lock`] adds owner tracking, [`Waiter`] turns a raw lock into a one-shot
//! gate, [`Condition`] queues waiters in FIFO order, and [`Event`] and
//! [`Semaphore`] are thin state machines over a condition.

pub mod condition;
pub mod event;
pub mod lock;
pub mod semaphore;
pub mod waiter;

pub use condition::Condition;
pub use event::Event;
pub use lock::{Lock, LockGuard};
pub use semaphore::{BoundedSemaphore, Semaphore, SemaphorePermit};
pub use waiter::Waiter;
