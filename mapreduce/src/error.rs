use std::collections::TryReserveError;
use thiserror::Error;
use threadpool::PoolError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("partition store needs at least one partition")]
    NoPartitions,

    #[error("out of memory growing partition storage: {0}")]
    Allocation(#[from] TryReserveError),
}

#[derive(Debug, Error)]
pub enum MapReduceError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
