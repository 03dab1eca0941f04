/// Maps a key to one of `partitions` shards.
///
/// Must be deterministic: a key has to land in the same partition for
/// every emit of a run.
pub trait Partitioner: Send + Sync {
    fn partition(&self, key: &str, partitions: usize) -> usize;
}

/// `hash * 33 + byte`, seeded with 5381.
#[derive(Debug, Default, Clone, Copy)]
pub struct Djb2;

impl Partitioner for Djb2 {
    fn partition(&self, key: &str, partitions: usize) -> usize {
        (djb2(key) % partitions as u64) as usize
    }
}

pub fn djb2(key: &str) -> u64 {
    key.bytes()
        .fold(5381u64, |hash, byte| hash.wrapping_mul(33).wrapping_add(byte as u64))
}

pub fn partition_for(key: &str, partitions: usize) -> usize {
    Djb2.partition(key, partitions)
}
