//! RocksDB-backed store.

use crate::{BatchOp, PersistenceError, PersistenceResult, Store, StoreBatch};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::info;

/// A store over an embedded RocksDB database.
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    /// Opens (or creates) a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let db = DB::open(&options, path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened rocksdb store");
        Ok(Self { db })
    }
}

impl Store for RocksDbStore {
    fn get(&self, key: &[u8]) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> PersistenceResult<()> {
        Ok(self.db.put(key, value)?)
    }

    fn delete(&self, key: &[u8]) -> PersistenceResult<()> {
        Ok(self.db.delete(key)?)
    }

    fn seek(
        &self,
        prefix: &[u8],
        callback: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> PersistenceResult<()> {
        let iterator = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        for entry in iterator {
            let (key, value) = entry?;
            if !key.starts_with(prefix) {
                break;
            }
            if !callback(&key, &value) {
                break;
            }
        }
        Ok(())
    }

    fn put_batch(&self, batch: StoreBatch) -> PersistenceResult<()> {
        let mut write_batch = WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => write_batch.put(key, value),
                BatchOp::Delete { key } => write_batch.delete(key),
            }
        }
        self.db
            .write(write_batch)
            .map_err(|e| PersistenceError::storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn roundtrip_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        store.put(b"key", b"value").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));
        store.delete(b"key").unwrap();
        assert_eq!(store.get(b"key").unwrap(), None);
    }

    #[test]
    fn seek_respects_prefix_order() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        store.put(&[0x70, 2], b"b").unwrap();
        store.put(&[0x70, 1], b"a").unwrap();
        store.put(&[0x71, 0], b"other").unwrap();

        let mut keys = Vec::new();
        store
            .seek(&[0x70], &mut |key, _| {
                keys.push(key.to_vec());
                true
            })
            .unwrap();
        assert_eq!(keys, vec![vec![0x70, 1], vec![0x70, 2]]);
    }

    #[test]
    fn batch_is_atomic_over_restart() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            let mut batch = StoreBatch::new();
            batch.put(b"a".to_vec(), b"1".to_vec());
            batch.put(b"b".to_vec(), b"2".to_vec());
            store.put_batch(batch).unwrap();
        }
        let store = RocksDbStore::open(dir.path()).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }
}
