use super::panic_handler::PanicHandler;
use super::result::AsyncResult;
use super::task::Task;
use super::thread::Thread;
use super::worker::{ExecutorStats, StatsSnapshot, WorkQueue, Worker};
use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::sync::Lock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A pool of worker threads fed from one bounded queue.
///
/// Workers are started lazily: every submission starts one more worker until
/// the configured limit is reached. The pool never shrinks; idle workers park
/// on the queue until [`shutdown`](Self::shutdown).
pub struct ThreadPoolExecutor {
    config: ExecutorConfig,
    max_workers: usize,
    queue: Arc<WorkQueue>,
    workers: Lock<Vec<Thread<()>>>,
    stats: Arc<ExecutorStats>,
    panic_handler: Arc<PanicHandler>,
    next_seq: AtomicU64,
}

impl ThreadPoolExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;

        let queue = WorkQueue::new(config.queue_order, config.queue_capacity)?;

        Ok(Self {
            max_workers: config.worker_limit(),
            queue: Arc::new(queue),
            workers: Lock::new(Vec::new()),
            stats: Arc::new(ExecutorStats::default()),
            panic_handler: Arc::new(PanicHandler::new(config.panic_strategy)),
            next_seq: AtomicU64::new(0),
            config,
        })
    }

    pub fn with_max_workers(max_workers: usize) -> Result<Self> {
        Self::new(ExecutorConfig::builder().max_workers(max_workers).build()?)
    }

    /// Queues `f` at normal priority.
    pub fn submit<F, T>(&self, f: F) -> Result<AsyncResult<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit_task(Task::new(f))
    }

    /// Queues `task`, blocking while the queue is full, and returns the handle
    /// its outcome will be delivered to.
    ///
    /// A worker is started before queuing so a full queue always has a
    /// consumer.
    pub fn submit_task<T: Send + 'static>(&self, task: Task<T>) -> Result<AsyncResult<T>> {
        let result = task.result();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        self.adjust_worker_count()?;
        self.queue.put(task.into_job(seq))?;

        Ok(result)
    }

    fn adjust_worker_count(&self) -> Result<()> {
        let mut workers = self.workers.acquire();
        if workers.len() >= self.max_workers {
            return Ok(());
        }

        let worker = Worker {
            id: workers.len(),
            queue: Arc::clone(&self.queue),
            stats: Arc::clone(&self.stats),
            panic_handler: Arc::clone(&self.panic_handler),
            poll_interval: self.config.poll_interval,
        };
        let name = format!("{}-{}", self.config.thread_name_prefix, worker.id);

        let mut thread = Thread::with_stop_token(move |stop| worker.run(stop))
            .name(name)
            .panic_handler(Arc::clone(&self.panic_handler));

        if let Some(stack_size) = self.config.stack_size {
            thread = thread.stack_size(stack_size);
        }

        thread.start()?;
        workers.push(thread);
        self.stats.workers_spawned.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(workers = workers.len(), max = self.max_workers, "spawned worker");
        Ok(())
    }

    /// Stops every worker and forgets them.
    ///
    /// Each worker finishes the task it is running, if any, and exits at its
    /// next stop check; this call waits for that. Tasks still queued stay
    /// queued, and a later submission starts new workers.
    pub fn shutdown(&self) {
        let workers = std::mem::take(&mut *self.workers.acquire());

        for worker in &workers {
            worker.stop();
        }

        for worker in &workers {
            if let Err(e) = worker.join() {
                tracing::warn!(error = %e, "worker did not exit cleanly");
            }
        }

        if !workers.is_empty() {
            tracing::info!(workers = workers.len(), "executor shut down");
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.acquire().len()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Tasks queued but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolExecutor")
            .field("max_workers", &self.max_workers)
            .field("workers", &self.worker_count())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueOrder;
    use crate::error::Error;
    use crate::executor::{PanicStrategy, Priority};
    use crate::sync::Event;
    use std::time::Duration;

    fn config(max_workers: usize) -> ExecutorConfig {
        ExecutorConfig::builder()
            .max_workers(max_workers)
            .poll_interval(Duration::from_millis(5))
            .panic_strategy(PanicStrategy::Isolate)
            .build()
            .unwrap()
    }

    #[test]
    fn test_submit_returns_value() {
        let pool = ThreadPoolExecutor::new(config(2)).unwrap();
        let result = pool.submit(|| 6 * 7).unwrap();
        assert_eq!(result.get(Some(Duration::from_secs(5))).unwrap(), 42);
    }

    #[test]
    fn test_workers_grow_lazily_to_cap() {
        let pool = ThreadPoolExecutor::new(config(3)).unwrap();
        assert_eq!(pool.worker_count(), 0);

        let results: Vec<_> = (0..10).map(|i| pool.submit(move || i).unwrap()).collect();
        assert_eq!(pool.worker_count(), 3);

        for (i, r) in results.into_iter().enumerate() {
            assert_eq!(r.get(Some(Duration::from_secs(5))).unwrap(), i);
        }
        assert_eq!(pool.stats().workers_spawned, 3);
    }

    #[test]
    fn test_task_error_does_not_kill_worker() {
        let pool = ThreadPoolExecutor::new(config(1)).unwrap();

        let bad = pool.submit(|| -> u8 { panic!("task failure") }).unwrap();
        let good = pool.submit(|| 9u8).unwrap();

        assert!(matches!(
            bad.get(Some(Duration::from_secs(5))),
            Err(Error::Target(_))
        ));
        assert_eq!(good.get(Some(Duration::from_secs(5))).unwrap(), 9);
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_task_panic_goes_through_configured_strategy() {
        let cfg = ExecutorConfig {
            panic_strategy: PanicStrategy::LogAndContinue,
            ..config(1)
        };
        let pool = ThreadPoolExecutor::new(cfg).unwrap();

        let bad = pool
            .submit_task(Task::new(|| -> u8 { panic!("boom") }).with_name("exploding"))
            .unwrap();
        assert!(matches!(
            bad.get(Some(Duration::from_secs(5))),
            Err(Error::Target(msg)) if msg == "boom"
        ));
        assert_eq!(pool.panic_handler.panic_count(), 1);
        assert_eq!(pool.panic_handler.strategy(), PanicStrategy::LogAndContinue);

        // A returned error is a failure but not a panic.
        let err = pool
            .submit_task(Task::fallible(|| Err::<u8, _>("refused")))
            .unwrap();
        assert!(err.get(Some(Duration::from_secs(5))).is_err());
        assert_eq!(pool.panic_handler.panic_count(), 1);

        assert_eq!(pool.submit(|| 1u8).unwrap().get(Some(Duration::from_secs(5))).unwrap(), 1);
    }

    #[test]
    fn test_isolate_strategy_still_counts() {
        let pool = ThreadPoolExecutor::new(config(2)).unwrap();
        for _ in 0..3 {
            let r = pool.submit(|| {
                panic!("quiet");
            })
            .unwrap();
            assert!(r.get(Some(Duration::from_secs(5))).is_err());
        }
        assert_eq!(pool.panic_handler.panic_count(), 3);
    }

    #[test]
    fn test_priority_order() {
        let cfg = ExecutorConfig {
            queue_order: QueueOrder::Priority,
            ..config(1)
        };
        let pool = ThreadPoolExecutor::new(cfg).unwrap();

        let gate = Arc::new(Event::new());
        let order = Arc::new(Lock::new(Vec::new()));

        let blocker = {
            let gate = gate.clone();
            pool.submit(move || gate.wait(Some(Duration::from_secs(5))))
                .unwrap()
        };

        let mut results = Vec::new();
        for prio in [5, 1, 3] {
            let order = order.clone();
            let task = Task::new(move || order.acquire().push(prio)).with_priority(Priority(prio));
            results.push(pool.submit_task(task).unwrap());
        }

        gate.set();
        assert!(blocker.get(Some(Duration::from_secs(5))).unwrap());
        for r in results {
            r.get(Some(Duration::from_secs(5))).unwrap();
        }

        assert_eq!(*order.acquire(), vec![1, 3, 5]);
    }

    #[test]
    fn test_shutdown_stops_workers() {
        let pool = ThreadPoolExecutor::new(config(2)).unwrap();
        pool.submit(|| ()).unwrap().get(Some(Duration::from_secs(5))).unwrap();
        pool.submit(|| ()).unwrap().get(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(pool.worker_count(), 2);

        pool.shutdown();
        assert_eq!(pool.worker_count(), 0);

        // Submitting again starts fresh workers.
        let again = pool.submit(|| "back").unwrap();
        assert_eq!(again.get(Some(Duration::from_secs(5))).unwrap(), "back");
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            ThreadPoolExecutor::with_max_workers(0),
            Err(Error::Config(_))
        ));
    }
}
