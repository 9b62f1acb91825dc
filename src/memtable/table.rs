//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

/// In-memory table of live bindings
pub struct MemTable {
    data: RwLock<BTreeMap<Bytes, Bytes>>,

    /// Sum of key and value lengths
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair (write lock)
    ///
    /// Returns the previous value, if any.
    pub fn put(&self, key: Bytes, value: Bytes) -> Option<Bytes> {
        let added = key.len() + value.len();
        let previous = self.data.write().insert(key.clone(), value);

        match &previous {
            Some(old) => {
                self.size.fetch_add(added, Ordering::Relaxed);
                self.size.fetch_sub(key.len() + old.len(), Ordering::Relaxed);
            }
            None => {
                self.size.fetch_add(added, Ordering::Relaxed);
            }
        }
        previous
    }

    /// Remove a key (write lock)
    ///
    /// Returns the removed value, if any.
    pub fn delete(&self, key: &[u8]) -> Option<Bytes> {
        let removed = self.data.write().remove(key);
        if let Some(value) = &removed {
            self.size.fetch_sub(key.len() + value.len(), Ordering::Relaxed);
        }
        removed
    }

    /// Check whether a key is bound
    pub fn contains(&self, key: &[u8]) -> bool {
        self.data.read().contains_key(key)
    }

    /// All keys in byte order
    pub fn keys(&self) -> Vec<Bytes> {
        self.data.read().keys().cloned().collect()
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Snapshot iterator over all entries in sorted key order
    pub fn iter(&self) -> MemTableIterator {
        let entries: Vec<(Bytes, Bytes)> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        MemTableIterator {
            inner: entries.into_iter(),
        }
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a point-in-time copy of the MemTable
pub struct MemTableIterator {
    inner: std::vec::IntoIter<(Bytes, Bytes)>,
}

impl Iterator for MemTableIterator {
    type Item = (Bytes, Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
