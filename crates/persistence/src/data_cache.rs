//! The DAO: a typed, layered view over the storage driver.
//!
//! A `DataCache` either sits directly on a [`Store`] (the root layer) or on
//! another `DataCache` (a nested layer). Writes always land in the topmost
//! layer; reads fall through. Transaction execution nests a layer per
//! transaction, merges it on `Halt` and drops it on `Fault`; the root layer
//! turns into one atomic batch when the block commits.

use crate::{keys, PersistenceResult, Store, StoreBatch};
use neo3_core::{Block, Transaction, UInt160, UInt256};
use neo3_io::SerializableExt;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tracked {
    Changed(Vec<u8>),
    Deleted,
}

enum Backing {
    Store(Arc<dyn Store>),
    Nested(Box<DataCache>),
}

/// A stacked write-through cache with typed accessors.
pub struct DataCache {
    backing: Backing,
    entries: BTreeMap<Vec<u8>, Tracked>,
}

impl DataCache {
    /// Creates a root cache over a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            backing: Backing::Store(store),
            entries: BTreeMap::new(),
        }
    }

    /// Wraps this cache in a fresh layer. Writes to the returned cache stay
    /// invisible to readers of the wrapped one until [`DataCache::commit`].
    pub fn nest(self) -> Self {
        Self {
            backing: Backing::Nested(Box::new(self)),
            entries: BTreeMap::new(),
        }
    }

    /// Merges this layer into its parent and returns the parent.
    /// On the root layer this is a no-op returning the cache itself; use
    /// [`DataCache::persist`] to flush the root.
    pub fn commit(mut self) -> Self {
        match self.backing {
            Backing::Nested(mut parent) => {
                for (key, tracked) in std::mem::take(&mut self.entries) {
                    parent.entries.insert(key, tracked);
                }
                *parent
            }
            Backing::Store(_) => self,
        }
    }

    /// Drops this layer's writes. Nested layers return their parent; the
    /// root layer clears its pending writes and returns itself.
    pub fn discard(mut self) -> Self {
        match self.backing {
            Backing::Nested(parent) => *parent,
            Backing::Store(_) => {
                self.entries.clear();
                self
            }
        }
    }

    /// Whether this is the root layer.
    pub fn is_root(&self) -> bool {
        matches!(self.backing, Backing::Store(_))
    }

    /// Flushes the root layer into one atomic batch, returning the number
    /// of operations written.
    pub fn persist(&mut self) -> PersistenceResult<usize> {
        match &self.backing {
            Backing::Store(store) => {
                let mut batch = StoreBatch::new();
                for (key, tracked) in std::mem::take(&mut self.entries) {
                    match tracked {
                        Tracked::Changed(value) => batch.put(key, value),
                        Tracked::Deleted => batch.delete(key),
                    }
                }
                let count = batch.len();
                store.put_batch(batch)?;
                Ok(count)
            }
            Backing::Nested(_) => Err(crate::PersistenceError::invalid_operation(
                "persist is only valid on the root cache",
            )),
        }
    }

    /// Pending writes of this layer in ascending key order, deletions as
    /// `None`. The ledger feeds these to the state trie before persisting.
    pub fn dirty_entries(&self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        self.entries
            .iter()
            .map(|(key, tracked)| {
                let value = match tracked {
                    Tracked::Changed(value) => Some(value.clone()),
                    Tracked::Deleted => None,
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Gets a raw value, reading through the layers.
    pub fn get(&self, key: &[u8]) -> PersistenceResult<Option<Vec<u8>>> {
        if let Some(tracked) = self.entries.get(key) {
            return Ok(match tracked {
                Tracked::Changed(value) => Some(value.clone()),
                Tracked::Deleted => None,
            });
        }
        match &self.backing {
            Backing::Store(store) => store.get(key),
            Backing::Nested(parent) => parent.get(key),
        }
    }

    /// Stores a raw value in this layer.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, Tracked::Changed(value));
    }

    /// Deletes a raw key in this layer.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.entries.insert(key, Tracked::Deleted);
    }

    fn collect(
        &self,
        prefix: &[u8],
        merged: &mut BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) -> PersistenceResult<()> {
        match &self.backing {
            Backing::Store(store) => {
                store.seek(prefix, &mut |key, value| {
                    merged.insert(key.to_vec(), Some(value.to_vec()));
                    true
                })?;
            }
            Backing::Nested(parent) => parent.collect(prefix, merged)?,
        }
        for (key, tracked) in self.entries.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            let value = match tracked {
                Tracked::Changed(value) => Some(value.clone()),
                Tracked::Deleted => None,
            };
            merged.insert(key.clone(), value);
        }
        Ok(())
    }

    /// Finds every live pair under `prefix` in ascending key order, merging
    /// the overlay over the backing layers.
    pub fn find(&self, prefix: &[u8]) -> PersistenceResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged = BTreeMap::new();
        self.collect(prefix, &mut merged)?;
        Ok(merged
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    // === Typed accessors ===

    /// Stores a block together with its index mapping. A block hash appears
    /// in the index mapping iff the block record exists.
    pub fn put_block(&mut self, block: &Block) -> PersistenceResult<()> {
        let hash = block
            .hash()
            .map_err(|e| crate::PersistenceError::corruption(e.to_string()))?;
        self.put(keys::block(&hash), block.to_array()?);
        self.put(keys::block_by_index(block.index()), hash.to_vec());
        Ok(())
    }

    /// Gets a block by hash.
    pub fn get_block(&self, hash: &UInt256) -> PersistenceResult<Option<Block>> {
        match self.get(&keys::block(hash))? {
            Some(bytes) => Ok(Some(Block::from_array(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Gets the hash of the block at `index`.
    pub fn get_block_hash(&self, index: u32) -> PersistenceResult<Option<UInt256>> {
        match self.get(&keys::block_by_index(index))? {
            Some(bytes) => Ok(Some(
                UInt256::from_bytes(&bytes)
                    .map_err(|e| crate::PersistenceError::corruption(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// Stores a transaction with the height of the block that includes it.
    pub fn put_transaction(
        &mut self,
        transaction: &Transaction,
        height: u32,
    ) -> PersistenceResult<()> {
        let hash = transaction
            .hash()
            .map_err(|e| crate::PersistenceError::corruption(e.to_string()))?;
        let mut value = height.to_le_bytes().to_vec();
        value.extend_from_slice(&transaction.to_array()?);
        self.put(keys::transaction(&hash), value);
        Ok(())
    }

    /// Gets a transaction and its inclusion height.
    pub fn get_transaction(
        &self,
        hash: &UInt256,
    ) -> PersistenceResult<Option<(Transaction, u32)>> {
        match self.get(&keys::transaction(hash))? {
            Some(bytes) if bytes.len() > 4 => {
                let height = u32::from_le_bytes(bytes[..4].try_into().expect("length checked"));
                let transaction = Transaction::from_array(&bytes[4..])?;
                Ok(Some((transaction, height)))
            }
            Some(_) => Err(crate::PersistenceError::corruption(
                "transaction record too short",
            )),
            None => Ok(None),
        }
    }

    /// Whether a transaction is already on the chain.
    pub fn contains_transaction(&self, hash: &UInt256) -> PersistenceResult<bool> {
        Ok(self.get(&keys::transaction(hash))?.is_some())
    }

    /// Stores a contract storage item.
    pub fn put_storage_item(&mut self, contract_id: i32, key: &[u8], value: Vec<u8>) {
        self.put(keys::storage(contract_id, key), value);
    }

    /// Gets a contract storage item.
    pub fn get_storage_item(
        &self,
        contract_id: i32,
        key: &[u8],
    ) -> PersistenceResult<Option<Vec<u8>>> {
        self.get(&keys::storage(contract_id, key))
    }

    /// Deletes a contract storage item.
    pub fn delete_storage_item(&mut self, contract_id: i32, key: &[u8]) {
        self.delete(keys::storage(contract_id, key));
    }

    /// Finds a contract's storage items under `prefix`, returning keys with
    /// the contract namespace stripped.
    pub fn find_storage(
        &self,
        contract_id: i32,
        prefix: &[u8],
    ) -> PersistenceResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let full_prefix = keys::storage(contract_id, prefix);
        let namespace_len = keys::storage_prefix(contract_id).len();
        Ok(self
            .find(&full_prefix)?
            .into_iter()
            .map(|(key, value)| (key[namespace_len..].to_vec(), value))
            .collect())
    }

    /// Updates the current block pointer.
    pub fn set_current_block(&mut self, hash: &UInt256, index: u32) {
        let mut value = hash.to_vec();
        value.extend_from_slice(&index.to_le_bytes());
        self.put(keys::current_block(), value);
    }

    /// Gets the current block height, if any block has been persisted.
    pub fn get_current_block_index(&self) -> PersistenceResult<Option<u32>> {
        match self.get(&keys::current_block())? {
            Some(bytes) if bytes.len() == 36 => Ok(Some(u32::from_le_bytes(
                bytes[32..].try_into().expect("length checked"),
            ))),
            Some(_) => Err(crate::PersistenceError::corruption(
                "current block pointer malformed",
            )),
            None => Ok(None),
        }
    }

    /// Gets the current block hash, if any block has been persisted.
    pub fn get_current_block_hash(&self) -> PersistenceResult<Option<UInt256>> {
        match self.get(&keys::current_block())? {
            Some(bytes) if bytes.len() == 36 => Ok(Some(
                UInt256::from_bytes(&bytes[..32])
                    .map_err(|e| crate::PersistenceError::corruption(e.to_string()))?,
            )),
            Some(_) => Err(crate::PersistenceError::corruption(
                "current block pointer malformed",
            )),
            None => Ok(None),
        }
    }

    /// Stores an application execution result. Results persist together
    /// with their block: both live in the same root batch.
    pub fn put_exec_result(&mut self, hash: &UInt256, bytes: Vec<u8>) {
        self.put(keys::exec_result(hash), bytes);
    }

    /// Gets an application execution result.
    pub fn get_exec_result(&self, hash: &UInt256) -> PersistenceResult<Option<Vec<u8>>> {
        self.get(&keys::exec_result(hash))
    }

    /// Stores a serialized MPT node.
    pub fn put_mpt_node(&mut self, hash: &UInt256, bytes: Vec<u8>) {
        self.put(keys::mpt_node(hash), bytes);
    }

    /// Gets a serialized MPT node.
    pub fn get_mpt_node(&self, hash: &UInt256) -> PersistenceResult<Option<Vec<u8>>> {
        self.get(&keys::mpt_node(hash))
    }

    /// Stores a serialized state root for a height.
    pub fn put_state_root(&mut self, index: u32, bytes: Vec<u8>) {
        self.put(keys::state_root(index), bytes);
    }

    /// Gets the serialized state root for a height.
    pub fn get_state_root(&self, index: u32) -> PersistenceResult<Option<Vec<u8>>> {
        self.get(&keys::state_root(index))
    }

    /// Stores a serialized contract state and its id mapping.
    pub fn put_contract(&mut self, hash: &UInt160, id: i32, bytes: Vec<u8>) {
        self.put(keys::contract(hash), bytes);
        self.put(keys::contract_by_id(id), hash.to_vec());
    }

    /// Gets a serialized contract state by script hash.
    pub fn get_contract(&self, hash: &UInt160) -> PersistenceResult<Option<Vec<u8>>> {
        self.get(&keys::contract(hash))
    }

    /// Gets a contract script hash by id.
    pub fn get_contract_hash_by_id(&self, id: i32) -> PersistenceResult<Option<UInt160>> {
        match self.get(&keys::contract_by_id(id))? {
            Some(bytes) => Ok(Some(
                UInt160::from_bytes(&bytes)
                    .map_err(|e| crate::PersistenceError::corruption(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// Deletes a contract state and its id mapping.
    pub fn delete_contract(&mut self, hash: &UInt160, id: i32) {
        self.delete(keys::contract(hash));
        self.delete(keys::contract_by_id(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn root() -> DataCache {
        DataCache::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn nested_commit_merges_into_parent() {
        let mut cache = root();
        cache.put(b"a".to_vec(), b"1".to_vec());

        let mut child = cache.nest();
        child.put(b"b".to_vec(), b"2".to_vec());
        child.delete(b"a".to_vec());
        assert_eq!(child.get(b"a").unwrap(), None);

        let cache = child.commit();
        assert_eq!(cache.get(b"a").unwrap(), None);
        assert_eq!(cache.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn nested_discard_leaves_parent_untouched() {
        let mut cache = root();
        cache.put(b"a".to_vec(), b"1".to_vec());

        let mut child = cache.nest();
        child.put(b"a".to_vec(), b"2".to_vec());
        child.put(b"b".to_vec(), b"2".to_vec());

        let cache = child.discard();
        assert_eq!(cache.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(cache.get(b"b").unwrap(), None);
    }

    #[test]
    fn persist_flushes_root_to_store() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = DataCache::new(store.clone());
        cache.put(b"x".to_vec(), b"y".to_vec());
        assert_eq!(store.get(b"x").unwrap(), None);

        let written = cache.persist().unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.get(b"x").unwrap(), Some(b"y".to_vec()));
        // The cache keeps reading through after the flush.
        assert_eq!(cache.get(b"x").unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn persist_rejected_on_nested_layer() {
        let cache = root();
        let mut child = cache.nest();
        assert!(child.persist().is_err());
    }

    #[test]
    fn find_merges_overlay_in_order() {
        let store = Arc::new(MemoryStore::new());
        store.put(&[0x70, 1], b"backing").unwrap();
        store.put(&[0x70, 3], b"dropped").unwrap();

        let mut cache = DataCache::new(store);
        cache.put(vec![0x70, 2], b"overlay".to_vec());
        cache.delete(vec![0x70, 3]);

        let found = cache.find(&[0x70]).unwrap();
        assert_eq!(
            found,
            vec![
                (vec![0x70, 1], b"backing".to_vec()),
                (vec![0x70, 2], b"overlay".to_vec()),
            ]
        );
    }

    #[test]
    fn block_index_mapping_written_with_block() {
        let mut cache = root();
        let block = Block::default();
        cache.put_block(&block).unwrap();
        let hash = block.hash().unwrap();
        assert_eq!(cache.get_block_hash(0).unwrap(), Some(hash));
        assert!(cache.get_block(&hash).unwrap().is_some());
    }

    #[test]
    fn storage_items_scoped_by_contract() {
        let mut cache = root();
        cache.put_storage_item(-7, &[0x01], vec![10]);
        cache.put_storage_item(-8, &[0x01], vec![20]);
        assert_eq!(cache.get_storage_item(-7, &[0x01]).unwrap(), Some(vec![10]));
        let found = cache.find_storage(-8, &[]).unwrap();
        assert_eq!(found, vec![(vec![0x01], vec![20])]);
    }
}
