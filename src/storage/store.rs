use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// This node's share of the cache.
///
/// Disjoint keys never contend; writes to the same key are last-write-wins.
/// Entries live until the process exits.
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: DashMap<String, Value>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of every entry, ordered by key.
    pub fn dump(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
