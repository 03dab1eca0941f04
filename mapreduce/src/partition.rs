use crate::{Djb2, Partitioner, StoreError};
use parking_lot::Mutex;
use std::{
    collections::{TryReserveError, VecDeque},
    fmt,
    sync::Arc,
};

const INITIAL_PAIRS: usize = 10;
const INITIAL_VALUES: usize = 10;

/// Grows `vec` by doubling when it is full.
fn reserve_one<T>(vec: &mut Vec<T>) -> Result<(), TryReserveError> {
    if vec.len() == vec.capacity() {
        vec.try_reserve_exact(vec.capacity().max(1))?;
    }
    Ok(())
}

/// A key and its values in emission order.
#[derive(Debug)]
pub struct KeyValuePair {
    key: String,
    values: Vec<String>,
}

impl KeyValuePair {
    fn new(key: &str, value: &str) -> Result<Self, StoreError> {
        let mut values = Vec::new();
        values.try_reserve_exact(INITIAL_VALUES)?;
        values.push(value.to_owned());
        Ok(Self {
            key: key.to_owned(),
            values,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Values not yet taken by [`PartitionStore::pop`].
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// One shard of the key space with its own lock.
#[derive(Debug)]
pub struct Partition {
    pairs: Mutex<VecDeque<KeyValuePair>>,
}

impl Partition {
    fn new() -> Self {
        Self {
            pairs: Mutex::new(VecDeque::with_capacity(INITIAL_PAIRS)),
        }
    }

    fn insert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut pairs = self.pairs.lock();
        if let Some(pair) = pairs.iter_mut().find(|pair| pair.key == key) {
            reserve_one(&mut pair.values)?;
            pair.values.push(value.to_owned());
            return Ok(());
        }
        let pair = KeyValuePair::new(key, value)?;
        if pairs.len() == pairs.capacity() {
            let extra = pairs.capacity().max(1);
            pairs.try_reserve_exact(extra)?;
        }
        pairs.push_back(pair);
        Ok(())
    }

    fn pop(&self, key: &str) -> Option<String> {
        self.pairs
            .lock()
            .iter_mut()
            .find(|pair| pair.key == key)?
            .values
            .pop()
    }

    fn sorted_keys(&self) -> Vec<String> {
        let mut pairs = self.pairs.lock();
        pairs
            .make_contiguous()
            .sort_unstable_by(|a, b| a.key.cmp(&b.key));
        pairs.iter().map(|pair| pair.key.clone()).collect()
    }

    fn release(&self, key: &str) -> Option<KeyValuePair> {
        let mut pairs = self.pairs.lock();
        // keys are released in sorted order, so this is normally the front
        if pairs.front().is_some_and(|pair| pair.key == key) {
            return pairs.pop_front();
        }
        let at = pairs.iter().position(|pair| pair.key == key)?;
        pairs.remove(at)
    }

    pub fn len(&self) -> usize {
        self.pairs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.pairs.lock().iter().map(|pair| pair.key.clone()).collect()
    }

    pub fn value_count(&self, key: &str) -> Option<usize> {
        self.pairs
            .lock()
            .iter()
            .find(|pair| pair.key == key)
            .map(KeyValuePair::remaining)
    }
}

/// Fixed array of partitions shared by every job of one run.
///
/// Writes to different partitions never contend; writes to the same
/// partition are serialized even for different keys.
pub struct PartitionStore {
    partitions: Vec<Partition>,
    partitioner: Arc<dyn Partitioner>,
}

impl PartitionStore {
    pub fn new(partitions: usize) -> Result<Self, StoreError> {
        Self::with_partitioner(partitions, Arc::new(Djb2))
    }

    pub fn with_partitioner(
        partitions: usize,
        partitioner: Arc<dyn Partitioner>,
    ) -> Result<Self, StoreError> {
        if partitions == 0 {
            return Err(StoreError::NoPartitions);
        }
        Ok(Self {
            partitions: (0..partitions).map(|_| Partition::new()).collect(),
            partitioner,
        })
    }

    pub fn partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Partition index for `key`. Out-of-range answers from a custom
    /// partitioner are reduced modulo the partition count.
    pub fn partition_of(&self, key: &str) -> usize {
        self.partitioner.partition(key, self.partitions.len()) % self.partitions.len()
    }

    pub fn partition(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    /// Appends `value` under `key`. An empty key is dropped silently.
    pub fn insert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Ok(());
        }
        self.partitions[self.partition_of(key)].insert(key, value)
    }

    /// Takes the most recently emitted value still stored under `key`.
    ///
    /// `None` when the index is out of range, the key is absent, or every
    /// value has already been taken.
    pub fn pop(&self, key: &str, index: usize) -> Option<String> {
        self.partitions.get(index)?.pop(key)
    }

    /// Sorts the partition by key and returns the keys in that order.
    pub fn sorted_keys(&self, index: usize) -> Vec<String> {
        self.partitions
            .get(index)
            .map(Partition::sorted_keys)
            .unwrap_or_default()
    }

    /// Drops `key` and any values left under it.
    pub fn release(&self, key: &str, index: usize) -> Option<KeyValuePair> {
        self.partitions.get(index)?.release(key)
    }

    /// Total number of distinct keys across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Partition::is_empty)
    }
}

impl fmt::Debug for PartitionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionStore")
            .field("partitions", &self.partitions)
            .finish_non_exhaustive()
    }
}
