//! A fixed-size worker pool with a Shortest-Job-First queue.
//!
//! Jobs carry a caller-declared size; smaller jobs are dequeued first and
//! jobs of equal size run in submission order. [`ThreadPool::barrier`]
//! blocks until every job submitted so far has finished. The submitted and
//! completed counters are never reset, so one pool can host several
//! successive workloads separated by barriers.

mod error;
mod job;
mod pool;
mod queue;

pub use error::PoolError;
pub use job::Job;
pub use pool::{PoolHandle, PoolStats, ThreadPool, DEFAULT_THREAD_NAME};
pub use queue::JobQueue;
