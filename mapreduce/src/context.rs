use crate::{PartitionStore, StoreError};

/// Handed to the mapper for one input.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    store: &'a PartitionStore,
    input: &'a str,
}

impl<'a> MapContext<'a> {
    pub(crate) fn new(store: &'a PartitionStore, input: &'a str) -> Self {
        Self { store, input }
    }

    /// Appends `value` under `key`; an empty key is ignored.
    pub fn emit(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store.insert(key, value)
    }

    /// The input identifier this map job was submitted for.
    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn partitions(&self) -> usize {
        self.store.partitions()
    }
}

/// Handed to the reducer while its partition is being reduced.
#[derive(Debug, Clone, Copy)]
pub struct ReduceContext<'a> {
    store: &'a PartitionStore,
    partition: usize,
}

impl<'a> ReduceContext<'a> {
    pub(crate) fn new(store: &'a PartitionStore, partition: usize) -> Self {
        Self { store, partition }
    }

    /// Pops the newest unread value of `key`. Each value is returned at
    /// most once; `None` once exhausted or for a bad key/partition.
    pub fn get_next(&self, key: &str, partition: usize) -> Option<String> {
        self.store.pop(key, partition)
    }

    /// Drains the remaining values of `key` in this context's partition.
    pub fn values<'k>(&'k self, key: &'k str) -> impl Iterator<Item = String> + 'k {
        std::iter::from_fn(move || self.get_next(key, self.partition))
    }

    pub fn partition(&self) -> usize {
        self.partition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_then_drain() {
        let store = PartitionStore::new(3).unwrap();
        let map = MapContext::new(&store, "input.txt");
        assert_eq!(map.input(), "input.txt");
        assert_eq!(map.partitions(), 3);
        map.emit("foo", "1").unwrap();
        map.emit("foo", "2").unwrap();
        map.emit("", "ignored").unwrap();

        let partition = store.partition_of("foo");
        let reduce = ReduceContext::new(&store, partition);
        assert_eq!(reduce.partition(), partition);
        assert_eq!(reduce.values("foo").collect::<Vec<_>>(), vec!["2", "1"]);
        assert_eq!(reduce.get_next("foo", partition), None);
        assert_eq!(store.len(), 1);
    }
}
