//! Inverted index: for every word, the inputs it appears in.

use itertools::Itertools;
use mapreduce::KeyValue;

pub fn map(filename: &str, contents: &str) -> Vec<KeyValue> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .unique()
        .map(|w| KeyValue::new(w, filename))
        .collect()
}

/// `"<count> <file>,<file>,..."` with file names sorted.
pub fn reduce(_key: &str, values: Vec<String>) -> String {
    let files = values.into_iter().sorted().dedup().collect_vec();
    format!("{} {}", files.len(), files.join(","))
}
