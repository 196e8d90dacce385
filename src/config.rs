use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::time::Duration;

/// Order in which an executor hands queued tasks to its workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueOrder {
    /// Submission order.
    #[default]
    Fifo,
    /// Lowest `Priority` first; equal priorities in submission order.
    Priority,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_workers: Option<usize>,
    pub queue_order: QueueOrder,
    pub queue_capacity: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
    pub poll_interval: Duration,
    pub panic_strategy: PanicStrategy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            queue_order: QueueOrder::default(),
            queue_capacity: 100,
            thread_name_prefix: "lockstep-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            poll_interval: Duration::from_millis(50),
            panic_strategy: PanicStrategy::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_workers {
            if n == 0 {
                return Err(Error::config("max_workers must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("max_workers too large (max 1024)"));
            }
        }

        if self.queue_capacity == 0 {
            return Err(Error::config("queue_capacity must be > 0"));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::config("poll_interval must be > 0"));
        }

        Ok(())
    }

    /// Upper bound on live workers; one per logical CPU unless set.
    pub fn worker_limit(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
        }
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = Some(n);
        self
    }

    pub fn queue_order(mut self, order: QueueOrder) -> Self {
        self.config.queue_order = order;
        self
    }

    /// Shorthand for `queue_order(QueueOrder::Priority)`.
    pub fn enable_priority(self, enable: bool) -> Self {
        self.queue_order(if enable {
            QueueOrder::Priority
        } else {
            QueueOrder::Fifo
        })
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<ExecutorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExecutorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_order, QueueOrder::Fifo);
        assert_eq!(config.queue_capacity, 100);
        assert!(config.worker_limit() >= 1);
    }

    #[test]
    fn test_builder_rejects_zero_workers() {
        let result = ExecutorConfig::builder().max_workers(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_capacity() {
        let result = ExecutorConfig::builder().queue_capacity(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_poll_interval() {
        let result = ExecutorConfig::builder()
            .poll_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_enable_priority() {
        let config = ExecutorConfig::builder()
            .max_workers(4)
            .enable_priority(true)
            .thread_name_prefix("business")
            .build()
            .unwrap();

        assert_eq!(config.queue_order, QueueOrder::Priority);
        assert_eq!(config.worker_limit(), 4);
        assert_eq!(config.thread_name_prefix, "business");
    }
}
