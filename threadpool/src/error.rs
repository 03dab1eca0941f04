use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("thread pool needs at least one worker thread")]
    InvalidThreadCount,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("thread pool is shut down, job rejected")]
    ShutDown,
}
