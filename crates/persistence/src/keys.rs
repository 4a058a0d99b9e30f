//! The persisted key layout.
//!
//! Single-byte prefixes partition the key space per category; the byte
//! values are stable across releases because they are what lives on disk.

use neo3_core::{UInt160, UInt256};

/// Block bytes by hash.
pub const DATA_BLOCK: u8 = 0x01;
/// Transaction bytes (with inclusion height) by hash.
pub const DATA_TRANSACTION: u8 = 0x02;
/// Serialized MPT nodes by hash.
pub const DATA_MPT_NODE: u8 = 0x03;
/// Application execution results by transaction or block hash.
pub const DATA_EXEC_RESULT: u8 = 0x04;
/// Block hash by index.
pub const IX_BLOCK_BY_INDEX: u8 = 0x09;
/// Serialized state roots by index.
pub const ST_STATE_ROOT: u8 = 0x0b;
/// Contract state by script hash.
pub const ST_CONTRACT: u8 = 0x50;
/// Contract script hash by id.
pub const ST_CONTRACT_ID: u8 = 0x51;
/// Contract storage items.
pub const ST_STORAGE: u8 = 0x70;
/// Header hash list pages.
pub const IX_HEADER_HASH_LIST: u8 = 0x80;
/// Current block pointer.
pub const SYS_CURRENT_BLOCK: u8 = 0xc0;
/// Current header pointer.
pub const SYS_CURRENT_HEADER: u8 = 0xc1;
/// Storage format version.
pub const SYS_VERSION: u8 = 0xf0;

/// Key of a block record.
pub fn block(hash: &UInt256) -> Vec<u8> {
    prefixed(DATA_BLOCK, hash.as_bytes())
}

/// Key of a transaction record.
pub fn transaction(hash: &UInt256) -> Vec<u8> {
    prefixed(DATA_TRANSACTION, hash.as_bytes())
}

/// Key of an MPT node record.
pub fn mpt_node(hash: &UInt256) -> Vec<u8> {
    prefixed(DATA_MPT_NODE, hash.as_bytes())
}

/// Key of an application execution result.
pub fn exec_result(hash: &UInt256) -> Vec<u8> {
    prefixed(DATA_EXEC_RESULT, hash.as_bytes())
}

/// Key of the index-to-hash block mapping.
pub fn block_by_index(index: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(IX_BLOCK_BY_INDEX);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// Key of a persisted state root.
pub fn state_root(index: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(ST_STATE_ROOT);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// Key of a contract state record.
pub fn contract(hash: &UInt160) -> Vec<u8> {
    prefixed(ST_CONTRACT, hash.as_bytes())
}

/// Key of the id-to-hash contract mapping. Native contracts use negative
/// ids, so the id is encoded little-endian signed.
pub fn contract_by_id(id: i32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(ST_CONTRACT_ID);
    key.extend_from_slice(&id.to_le_bytes());
    key
}

/// Key of a contract storage item: prefix, contract id little-endian
/// signed, then the contract-chosen key bytes.
pub fn storage(contract_id: i32, item_key: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + item_key.len());
    key.push(ST_STORAGE);
    key.extend_from_slice(&contract_id.to_le_bytes());
    key.extend_from_slice(item_key);
    key
}

/// Prefix covering every storage item of one contract.
pub fn storage_prefix(contract_id: i32) -> Vec<u8> {
    storage(contract_id, &[])
}

/// Key of the current block pointer.
pub fn current_block() -> Vec<u8> {
    vec![SYS_CURRENT_BLOCK]
}

/// Key of the current header pointer.
pub fn current_header() -> Vec<u8> {
    vec![SYS_CURRENT_HEADER]
}

/// Key of the storage format version.
pub fn version() -> Vec<u8> {
    vec![SYS_VERSION]
}

fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + body.len());
    key.push(prefix);
    key.extend_from_slice(body);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_layout() {
        let key = storage(-5, &[0x14]);
        assert_eq!(key[0], ST_STORAGE);
        assert_eq!(&key[1..5], &(-5i32).to_le_bytes());
        assert_eq!(key[5], 0x14);
    }

    #[test]
    fn index_keys_sort_by_height() {
        // Big-endian index encoding keeps seek order equal to height order.
        assert!(block_by_index(1) < block_by_index(2));
        assert!(block_by_index(255) < block_by_index(256));
    }
}
