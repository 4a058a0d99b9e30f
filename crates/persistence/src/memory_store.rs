//! In-memory store used by tests and light tooling.

use crate::{BatchOp, PersistenceResult, Store, StoreBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A `BTreeMap`-backed store; iteration order is the natural byte order.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> PersistenceResult<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> PersistenceResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn seek(
        &self,
        prefix: &[u8],
        callback: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> PersistenceResult<()> {
        let entries = self.entries.read();
        for (key, value) in entries.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if !callback(key, value) {
                break;
            }
        }
        Ok(())
    }

    fn put_batch(&self, batch: StoreBatch) -> PersistenceResult<()> {
        let mut entries = self.entries.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_is_ordered_and_prefix_bounded() {
        let store = MemoryStore::new();
        store.put(&[1, 2], b"a").unwrap();
        store.put(&[1, 1], b"b").unwrap();
        store.put(&[2, 0], b"c").unwrap();

        let mut seen = Vec::new();
        store
            .seek(&[1], &mut |key, _| {
                seen.push(key.to_vec());
                true
            })
            .unwrap();
        assert_eq!(seen, vec![vec![1, 1], vec![1, 2]]);
    }

    #[test]
    fn seek_stops_when_callback_returns_false() {
        let store = MemoryStore::new();
        store.put(&[1, 1], b"a").unwrap();
        store.put(&[1, 2], b"b").unwrap();
        let mut count = 0;
        store
            .seek(&[1], &mut |_, _| {
                count += 1;
                false
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn batch_applies_all_operations() {
        let store = MemoryStore::new();
        store.put(b"gone", b"x").unwrap();
        let mut batch = StoreBatch::new();
        batch.put(b"kept".to_vec(), b"y".to_vec());
        batch.delete(b"gone".to_vec());
        store.put_batch(batch).unwrap();
        assert_eq!(store.get(b"kept").unwrap(), Some(b"y".to_vec()));
        assert_eq!(store.get(b"gone").unwrap(), None);
    }
}
