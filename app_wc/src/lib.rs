//! Word count: how many times each word occurs across all inputs.

use mapreduce::KeyValue;

pub fn map(_filename: &str, contents: &str) -> Vec<KeyValue> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| KeyValue::new(w, "1"))
        .collect()
}

pub fn reduce(_key: &str, values: Vec<String>) -> String {
    values
        .iter()
        .filter_map(|v| v.parse::<u64>().ok())
        .sum::<u64>()
        .to_string()
}
