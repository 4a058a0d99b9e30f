// Copyright (C) 2015-2025 The Neo Project.
//
// block.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Blocks and block headers.

use crate::{CoreResult, Transaction, UInt160, UInt256, Witness};
use neo3_config::MAX_TRANSACTIONS_PER_BLOCK;
use neo3_cryptography::hash::hash256;
use neo3_cryptography::MerkleTree;
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A block header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub prev_hash: UInt256,
    /// Merkle root over the hashes of the block's transactions.
    pub merkle_root: UInt256,
    /// Milliseconds since the Unix epoch; strictly increasing along the chain.
    pub timestamp: u64,
    pub nonce: u64,
    pub index: u32,
    /// Index of the primary (speaker) validator for this round.
    pub primary: u8,
    /// Script hash of the multisig account of the next round's validators.
    pub next_consensus: UInt160,
    pub witness: Witness,
    #[serde(skip)]
    hash_cache: OnceLock<UInt256>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: 0,
            prev_hash: UInt256::zero(),
            merkle_root: UInt256::zero(),
            timestamp: 0,
            nonce: 0,
            index: 0,
            primary: 0,
            next_consensus: UInt160::zero(),
            witness: Witness::default(),
            hash_cache: OnceLock::new(),
        }
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.prev_hash == other.prev_hash
            && self.merkle_root == other.merkle_root
            && self.timestamp == other.timestamp
            && self.nonce == other.nonce
            && self.index == other.index
            && self.primary == other.primary
            && self.next_consensus == other.next_consensus
            && self.witness == other.witness
    }
}

impl Eq for Header {}

impl Header {
    /// Gets the header hash, computing and caching it on first use.
    pub fn hash(&self) -> CoreResult<UInt256> {
        if let Some(hash) = self.hash_cache.get() {
            return Ok(*hash);
        }
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize_unsigned(&mut writer)?;
        let hash = UInt256::from_array(hash256(&writer.to_bytes()));
        Ok(*self.hash_cache.get_or_init(|| hash))
    }

    /// Gets the digest the consensus witness signs.
    pub fn sign_data(&self, network: u32) -> CoreResult<Vec<u8>> {
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.hash()?.as_bytes());
        Ok(data)
    }

    /// Serializes everything the hash covers.
    pub fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.version)?;
        Serializable::serialize(&self.prev_hash, writer)?;
        Serializable::serialize(&self.merkle_root, writer)?;
        writer.write_u64(self.timestamp)?;
        writer.write_u64(self.nonce)?;
        writer.write_u32(self.index)?;
        writer.write_byte(self.primary)?;
        Serializable::serialize(&self.next_consensus, writer)
    }
}

impl Serializable for Header {
    fn size(&self) -> usize {
        4 + 32 + 32 + 8 + 8 + 4 + 1 + 20 + 1 + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        // Exactly one witness, count-prefixed like every witness list.
        writer.write_var_int(1)?;
        Serializable::serialize(&self.witness, writer)
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let version = reader.read_u32()?;
        let prev_hash = Serializable::deserialize(reader)?;
        let merkle_root = Serializable::deserialize(reader)?;
        let timestamp = reader.read_u64()?;
        let nonce = reader.read_u64()?;
        let index = reader.read_u32()?;
        let primary = reader.read_byte()?;
        let next_consensus = Serializable::deserialize(reader)?;
        let witness_count = reader.read_var_int(1)?;
        if witness_count != 1 {
            return Err(IoError::format_exception(
                "header".to_string(),
                format!("expected one witness, got {witness_count}"),
            ));
        }
        let witness = Serializable::deserialize(reader)?;
        Ok(Self {
            version,
            prev_hash,
            merkle_root,
            timestamp,
            nonce,
            index,
            primary,
            next_consensus,
            witness,
            hash_cache: OnceLock::new(),
        })
    }
}

/// A block: a header plus its ordered transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Gets the block hash, which is the header hash.
    pub fn hash(&self) -> CoreResult<UInt256> {
        self.header.hash()
    }

    /// Gets the block height.
    pub fn index(&self) -> u32 {
        self.header.index
    }

    /// Computes the Merkle root over the transaction hashes.
    pub fn compute_merkle_root(&self) -> CoreResult<UInt256> {
        let mut leaves = Vec::with_capacity(self.transactions.len());
        for transaction in &self.transactions {
            leaves.push(*transaction.hash()?.as_bytes());
        }
        Ok(UInt256::from_array(MerkleTree::compute_root(&leaves)))
    }

    /// Recomputes and stores the Merkle root in the header.
    pub fn rebuild_merkle_root(&mut self) -> CoreResult<()> {
        self.header.merkle_root = self.compute_merkle_root()?;
        Ok(())
    }
}

impl Serializable for Block {
    fn size(&self) -> usize {
        self.header.size() + helper::get_array_size(&self.transactions)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        Serializable::serialize(&self.header, writer)?;
        writer.write_serializable_vec(&self.transactions)
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let header = Serializable::deserialize(reader)?;
        let count = reader.read_var_int(MAX_TRANSACTIONS_PER_BLOCK as u64)? as usize;
        let mut transactions = Vec::with_capacity(count);
        for _ in 0..count {
            transactions.push(Serializable::deserialize(reader)?);
        }
        Ok(Self {
            header,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Signer, WitnessScope};
    use neo3_io::SerializableExt;

    fn sample_block() -> Block {
        let transaction = Transaction {
            valid_until_block: 10,
            signers: vec![Signer::new(
                UInt160::from_array([1u8; 20]),
                WitnessScope::CALLED_BY_ENTRY,
            )],
            script: vec![0x40],
            witnesses: vec![Witness::default()],
            ..Default::default()
        };
        let mut block = Block {
            header: Header {
                prev_hash: UInt256::from_array([7u8; 32]),
                timestamp: 1_600_000_000_000,
                index: 1,
                ..Default::default()
            },
            transactions: vec![transaction],
        };
        block.rebuild_merkle_root().unwrap();
        block
    }

    #[test]
    fn roundtrip() {
        let block = sample_block();
        let bytes = block.to_array().unwrap();
        assert_eq!(bytes.len(), block.size());
        let decoded = Block::from_array(&bytes).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash().unwrap(), block.hash().unwrap());
    }

    #[test]
    fn merkle_root_tracks_transactions() {
        let block = sample_block();
        assert_eq!(
            block.header.merkle_root,
            UInt256::from_array(neo3_cryptography::MerkleTree::compute_root(&[
                *block.transactions[0].hash().unwrap().as_bytes()
            ]))
        );
    }

    #[test]
    fn empty_block_merkle_root_is_zero() {
        let mut block = Block::default();
        block.rebuild_merkle_root().unwrap();
        assert!(block.header.merkle_root.is_zero());
    }
}
