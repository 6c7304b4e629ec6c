//! In-memory key-value store
//!
//! Keys and values are opaque strings. Assignment is last-writer-wins per
//! key, which makes re-delivered writes idempotent. The store lives from
//! process start to process exit and is replaced wholesale when a snapshot
//! is installed.

use std::collections::HashMap;

/// The replica's key-value store
#[derive(Debug, Default, Clone)]
pub struct KvStore {
    entries: HashMap<String, String>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Assign a value to a key. Last writer wins.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Full copy of the store for a snapshot transfer.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.clone()
    }

    /// Replace the entire contents with an installed snapshot.
    pub fn install(&mut self, snapshot: HashMap<String, String>) {
        self.entries = snapshot;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
