pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("timed out")]
    Timeout,

    #[error("queue is full")]
    Full,

    #[error("queue is empty")]
    Empty,

    #[error("usage error: {0}")]
    Usage(String),

    #[error("target failed: {0}")]
    Target(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("worker panic: {0}")]
    WorkerPanic(String),
}

impl Error {
    pub fn usage<S: Into<String>>(msg: S) -> Self {
        Error::Usage(msg.into())
    }

    pub fn target<S: Into<String>>(msg: S) -> Self {
        Error::Target(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    /// True for errors a bounded wait reports when its deadline passes.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}
