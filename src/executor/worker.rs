// worker thread stuff
use super::panic_handler::PanicHandler;
use super::task::Job;
use super::thread::StopToken;
use crate::config::QueueOrder;
use crate::error::{Error, Result};
use crate::queue::{FifoQueue, PriorityQueue, Queue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub type WorkerId = usize;

/// The queue every worker of one executor pulls from.
pub(crate) enum WorkQueue {
    Fifo(FifoQueue<Job>),
    Priority(PriorityQueue<Job>),
}

impl WorkQueue {
    pub(crate) fn new(order: QueueOrder, capacity: usize) -> Result<Self> {
        Ok(match order {
            QueueOrder::Fifo => WorkQueue::Fifo(Queue::new(capacity)?),
            QueueOrder::Priority => WorkQueue::Priority(Queue::new(capacity)?),
        })
    }

    /// Blocks until there is room.
    pub(crate) fn put(&self, job: Job) -> Result<()> {
        match self {
            WorkQueue::Fifo(q) => q.put(job, true, None),
            WorkQueue::Priority(q) => q.put(job, true, None),
        }
    }

    pub(crate) fn get(&self, timeout: Duration) -> Result<Job> {
        match self {
            WorkQueue::Fifo(q) => q.get(true, Some(timeout)),
            WorkQueue::Priority(q) => q.get(true, Some(timeout)),
        }
    }

    pub(crate) fn size(&self) -> usize {
        match self {
            WorkQueue::Fifo(q) => q.size(),
            WorkQueue::Priority(q) => q.size(),
        }
    }
}

// counters shared by all workers of an executor
#[derive(Debug, Default)]
pub struct ExecutorStats {
    pub tasks_executed: AtomicU64,
    pub tasks_failed: AtomicU64,
    pub workers_spawned: AtomicU64,
}

impl ExecutorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub tasks_executed: u64,
    pub tasks_failed: u64,
    pub workers_spawned: u64,
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub queue: Arc<WorkQueue>,
    pub stats: Arc<ExecutorStats>,
    pub panic_handler: Arc<PanicHandler>,
    pub poll_interval: Duration,
}

impl Worker {
    // main loop: idle on the queue, run one task, back to idle, until stopped
    pub fn run(&self, stop: &StopToken) {
        loop {
            if stop.is_stopped() {
                tracing::debug!(worker = self.id, "worker stopping");
                break;
            }

            // Nothing escaping one pull/run step may end the worker.
            match self.panic_handler.execute(|| self.step()) {
                Ok(Ok(())) | Ok(Err(Error::Timeout)) => {}
                Ok(Err(e)) => {
                    tracing::error!(worker = self.id, error = %e, "failed to pull task");
                }
                Err(_) => {}
            }
        }
    }

    fn step(&self) -> Result<()> {
        let job = self.queue.get(self.poll_interval)?;
        let name = job.name.clone();

        self.stats.tasks_executed.fetch_add(1, Ordering::Relaxed);
        if !job.run(&self.panic_handler) {
            self.stats.tasks_failed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(worker = self.id, task = %name, "task failed; error delivered to its result");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{PanicStrategy, Task};
    use std::thread;

    fn worker(queue: Arc<WorkQueue>) -> Worker {
        Worker {
            id: 0,
            queue,
            stats: Arc::new(ExecutorStats::default()),
            panic_handler: Arc::new(PanicHandler::new(PanicStrategy::Isolate)),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_worker_runs_queued_tasks_and_stops() {
        let queue = Arc::new(WorkQueue::new(QueueOrder::Fifo, 8).unwrap());
        let ok = Task::new(|| 1);
        let bad = Task::new(|| -> i32 { panic!("bad task") });
        let ok_result = ok.result();
        let bad_result = bad.result();

        queue.put(ok.into_job(0)).unwrap();
        queue.put(bad.into_job(1)).unwrap();

        let w = Arc::new(worker(queue.clone()));
        let stop = StopToken::new();

        let handle = {
            let w = w.clone();
            let stop = stop.clone();
            thread::spawn(move || w.run(&stop))
        };

        assert_eq!(ok_result.get(Some(Duration::from_secs(5))).unwrap(), 1);
        assert!(matches!(
            bad_result.get(Some(Duration::from_secs(5))),
            Err(Error::Target(_))
        ));

        stop.stop();
        handle.join().unwrap();

        let stats = w.stats.snapshot();
        assert_eq!(stats.tasks_executed, 2);
        assert_eq!(stats.tasks_failed, 1);
        assert_eq!(w.panic_handler.panic_count(), 1);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_idle_worker_observes_stop() {
        let queue = Arc::new(WorkQueue::new(QueueOrder::Priority, 1).unwrap());
        let w = worker(queue);
        let stop = StopToken::new();
        stop.stop();

        // Returns without ever touching the queue.
        w.run(&stop);
        assert_eq!(w.stats.snapshot(), StatsSnapshot::default());
    }
}
