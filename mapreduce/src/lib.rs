//! In-process MapReduce on top of the [`threadpool`] SJF scheduler.
//!
//! A run maps every input on the pool, accumulating emitted pairs into a
//! fixed set of independently locked partitions, then reduces each
//! partition in its own job with keys visited in lexicographic order.

pub mod config;
mod context;
mod engine;
mod error;
pub mod logging;
mod partition;
mod partitioner;

pub use config::RunConfig;
pub use context::{MapContext, ReduceContext};
pub use engine::{run, MapReduce, Mapper, Reducer, RunSummary, MAP_JOB_SIZE, REDUCE_JOB_SIZE};
pub use error::{MapReduceError, StoreError};
pub use logging::init_logger;
pub use partition::{KeyValuePair, Partition, PartitionStore};
pub use partitioner::{djb2, partition_for, Djb2, Partitioner};
pub use threadpool::{PoolError, ThreadPool};

/// An intermediate pair as produced by an application's `map`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
