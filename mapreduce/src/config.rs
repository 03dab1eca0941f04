//! Run configuration.
//!
//! Values come from code, from `MR_WORKERS` / `MR_PARTITIONS` in the
//! environment, or from the command line of the `mr` binary.

use crate::MapReduceError;
use std::{env, num::NonZeroUsize, thread};
use threadpool::DEFAULT_THREAD_NAME;

pub const DEFAULT_PARTITIONS: usize = 10;
pub const WORKERS_ENV: &str = "MR_WORKERS";
pub const PARTITIONS_ENV: &str = "MR_PARTITIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub workers: usize,
    pub partitions: usize,
    pub thread_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
            partitions: DEFAULT_PARTITIONS,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl RunConfig {
    pub fn new(workers: usize, partitions: usize) -> Self {
        Self {
            workers,
            partitions,
            ..Self::default()
        }
    }

    /// Defaults overridden by `MR_WORKERS` and `MR_PARTITIONS` when set.
    pub fn from_env() -> Result<Self, MapReduceError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MapReduceError> {
        let mut config = Self::default();
        if let Some(workers) = parse_count(&lookup, WORKERS_ENV)? {
            config.workers = workers;
        }
        if let Some(partitions) = parse_count(&lookup, PARTITIONS_ENV)? {
            config.partitions = partitions;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn validate(&self) -> Result<(), MapReduceError> {
        if self.workers == 0 {
            return Err(MapReduceError::InvalidConfig(
                "worker count must be at least 1".into(),
            ));
        }
        if self.partitions == 0 {
            return Err(MapReduceError::InvalidConfig(
                "partition count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_count(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<usize>, MapReduceError> {
    lookup(name)
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|e| {
                MapReduceError::InvalidConfig(format!("{name}={raw:?} is not a count: {e}"))
            })
        })
        .transpose()
}
