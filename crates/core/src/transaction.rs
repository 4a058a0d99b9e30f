// Copyright (C) 2015-2025 The Neo Project.
//
// transaction.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Transactions and their canonical encodings.

use crate::{
    AttributeType, CoreError, CoreResult, Signer, TransactionAttribute, UInt160, UInt256, Witness,
};
use neo3_config::{MAX_SCRIPT_SIZE, MAX_TRANSACTION_ATTRIBUTES};
use neo3_cryptography::hash::hash256;
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Fixed-size part of the unsigned encoding: version, nonce, both fees and
/// the expiry height.
pub const TRANSACTION_HEADER_SIZE: usize = 1 + 4 + 8 + 8 + 4;

/// A Neo N3 transaction.
///
/// Identity is the double-SHA256 of the unsigned encoding. The `network`
/// magic is not part of the encoding; it is mixed into the digest that
/// witnesses sign and is attached when the transaction enters the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u8,
    pub nonce: u32,
    /// GAS consumed by script execution, in datoshi.
    pub system_fee: i64,
    /// GAS paid for size and witness verification, in datoshi.
    pub network_fee: i64,
    /// Last height at which this transaction may be included.
    pub valid_until_block: u32,
    pub signers: Vec<Signer>,
    pub attributes: Vec<TransactionAttribute>,
    pub script: Vec<u8>,
    pub witnesses: Vec<Witness>,
    /// Network magic this transaction is bound to.
    #[serde(skip)]
    pub network: u32,
    #[serde(skip)]
    hash_cache: OnceLock<UInt256>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: 0,
            nonce: 0,
            system_fee: 0,
            network_fee: 0,
            valid_until_block: 0,
            signers: Vec::new(),
            attributes: Vec::new(),
            script: Vec::new(),
            witnesses: Vec::new(),
            network: 0,
            hash_cache: OnceLock::new(),
        }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.nonce == other.nonce
            && self.system_fee == other.system_fee
            && self.network_fee == other.network_fee
            && self.valid_until_block == other.valid_until_block
            && self.signers == other.signers
            && self.attributes == other.attributes
            && self.script == other.script
            && self.witnesses == other.witnesses
    }
}

impl Eq for Transaction {}

impl Transaction {
    /// Gets the sender: the account of the first signer, which pays the fees.
    pub fn sender(&self) -> UInt160 {
        self.signers.first().map(|s| s.account).unwrap_or_default()
    }

    /// Gets the transaction hash, computing and caching it on first use.
    pub fn hash(&self) -> CoreResult<UInt256> {
        if let Some(hash) = self.hash_cache.get() {
            return Ok(*hash);
        }
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize_unsigned(&mut writer)?;
        let hash = UInt256::from_array(hash256(&writer.to_bytes()));
        Ok(*self.hash_cache.get_or_init(|| hash))
    }

    /// Gets the digest witnesses sign: network magic followed by the hash.
    pub fn sign_data(&self, network: u32) -> CoreResult<Vec<u8>> {
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.hash()?.as_bytes());
        Ok(data)
    }

    /// Gets the serialized size in bytes.
    pub fn size(&self) -> usize {
        TRANSACTION_HEADER_SIZE
            + helper::get_array_size(&self.signers)
            + helper::get_array_size(&self.attributes)
            + helper::get_var_bytes_size(&self.script)
            + helper::get_array_size(&self.witnesses)
    }

    /// Network fee per byte of encoded size, rounded down.
    pub fn fee_per_byte(&self) -> i64 {
        let size = self.size() as i64;
        if size == 0 {
            0
        } else {
            self.network_fee / size
        }
    }

    /// Iterates the attributes of one kind.
    pub fn get_attributes(
        &self,
        kind: AttributeType,
    ) -> impl Iterator<Item = &TransactionAttribute> {
        self.attributes
            .iter()
            .filter(move |a| a.attribute_type() == kind)
    }

    /// Whether any attribute of the given kind is present.
    pub fn has_attribute(&self, kind: AttributeType) -> bool {
        self.get_attributes(kind).next().is_some()
    }

    /// Hashes this transaction declares conflicts with.
    pub fn conflicts_hashes(&self) -> Vec<UInt256> {
        self.attributes
            .iter()
            .filter_map(|a| match a {
                TransactionAttribute::Conflicts { hash } => Some(*hash),
                _ => None,
            })
            .collect()
    }

    /// Gets the oracle response attribute, if any.
    pub fn oracle_response(&self) -> Option<(u64, crate::OracleResponseCode)> {
        self.attributes.iter().find_map(|a| match a {
            TransactionAttribute::OracleResponse { id, code, .. } => Some((*id, *code)),
            _ => None,
        })
    }

    /// Whether `account` appears among the signers.
    pub fn is_signed_by(&self, account: &UInt160) -> bool {
        self.signers.iter().any(|s| s.account == *account)
    }

    /// Structural validation shared by deserialization and relay intake.
    pub fn check_structure(&self) -> CoreResult<()> {
        if self.signers.is_empty() {
            return Err(CoreError::invalid_data("transaction has no signers"));
        }
        let mut accounts = HashSet::with_capacity(self.signers.len());
        for signer in &self.signers {
            signer.validate()?;
            if !accounts.insert(signer.account) {
                return Err(CoreError::invalid_data("duplicate signer"));
            }
        }
        if self.signers.len() + self.attributes.len() > MAX_TRANSACTION_ATTRIBUTES {
            return Err(CoreError::invalid_data("too many signers and attributes"));
        }
        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            let kind = attribute.attribute_type();
            if !kind.allow_multiple() && !seen.insert(kind) {
                return Err(CoreError::invalid_data(format!(
                    "duplicate attribute {kind:?}"
                )));
            }
        }
        if self.script.is_empty() {
            return Err(CoreError::invalid_data("empty script"));
        }
        if self.system_fee < 0 || self.network_fee < 0 {
            return Err(CoreError::invalid_data("negative fee"));
        }
        if !self.witnesses.is_empty() && self.witnesses.len() != self.signers.len() {
            return Err(CoreError::invalid_data(
                "witness count differs from signer count",
            ));
        }
        Ok(())
    }

    /// Serializes everything the hash covers.
    pub fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_byte(self.version)?;
        writer.write_u32(self.nonce)?;
        writer.write_i64(self.system_fee)?;
        writer.write_i64(self.network_fee)?;
        writer.write_u32(self.valid_until_block)?;
        writer.write_serializable_vec(&self.signers)?;
        writer.write_serializable_vec(&self.attributes)?;
        writer.write_var_bytes(&self.script)
    }
}

impl Serializable for Transaction {
    fn size(&self) -> usize {
        Transaction::size(self)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        writer.write_serializable_vec(&self.witnesses)
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let version = reader.read_byte()?;
        if version != 0 {
            return Err(IoError::format_exception(
                "transaction version".to_string(),
                format!("{version}"),
            ));
        }
        let nonce = reader.read_u32()?;
        let system_fee = reader.read_i64()?;
        let network_fee = reader.read_i64()?;
        let valid_until_block = reader.read_u32()?;

        let signer_count = reader.read_var_int(MAX_TRANSACTION_ATTRIBUTES as u64)? as usize;
        let mut signers = Vec::with_capacity(signer_count);
        for _ in 0..signer_count {
            signers.push(Serializable::deserialize(reader)?);
        }

        let attribute_count = reader.read_var_int(MAX_TRANSACTION_ATTRIBUTES as u64)? as usize;
        let mut attributes = Vec::with_capacity(attribute_count);
        for _ in 0..attribute_count {
            attributes.push(Serializable::deserialize(reader)?);
        }

        let script = reader.read_var_bytes(MAX_SCRIPT_SIZE)?;

        let witness_count = reader.read_var_int(MAX_TRANSACTION_ATTRIBUTES as u64)? as usize;
        let mut witnesses = Vec::with_capacity(witness_count);
        for _ in 0..witness_count {
            witnesses.push(Serializable::deserialize(reader)?);
        }

        let transaction = Self {
            version,
            nonce,
            system_fee,
            network_fee,
            valid_until_block,
            signers,
            attributes,
            script,
            witnesses,
            network: 0,
            hash_cache: OnceLock::new(),
        };
        transaction
            .check_structure()
            .map_err(|e| IoError::format_exception("transaction", &e.to_string()))?;
        if transaction.witnesses.len() != transaction.signers.len() {
            return Err(IoError::format_exception(
                "transaction",
                "witness count differs from signer count",
            ));
        }
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WitnessScope;
    use neo3_io::SerializableExt;

    fn sample_transaction() -> Transaction {
        Transaction {
            version: 0,
            nonce: 0x01020304,
            system_fee: 100,
            network_fee: 200,
            valid_until_block: 1000,
            signers: vec![Signer::new(
                UInt160::from_array([1u8; 20]),
                WitnessScope::CALLED_BY_ENTRY,
            )],
            attributes: vec![TransactionAttribute::HighPriority],
            script: vec![0x40],
            witnesses: vec![Witness::new(vec![0x01], vec![0x02])],
            ..Default::default()
        }
    }

    #[test]
    fn roundtrip() {
        let transaction = sample_transaction();
        let bytes = transaction.to_array().unwrap();
        assert_eq!(bytes.len(), transaction.size());
        let decoded = Transaction::from_array(&bytes).unwrap();
        assert_eq!(decoded, transaction);
        assert_eq!(decoded.hash().unwrap(), transaction.hash().unwrap());
    }

    #[test]
    fn hash_covers_unsigned_part_only() {
        let mut transaction = sample_transaction();
        let before = transaction.hash().unwrap();
        transaction.witnesses[0].invocation_script = vec![0xFF];
        // A fresh equal-bodied transaction with different witnesses hashes the same.
        let rebuilt = Transaction {
            witnesses: transaction.witnesses.clone(),
            ..sample_transaction()
        };
        assert_eq!(rebuilt.hash().unwrap(), before);
    }

    #[test]
    fn duplicate_signers_rejected() {
        let mut transaction = sample_transaction();
        transaction.signers.push(transaction.signers[0].clone());
        transaction.witnesses.push(Witness::default());
        assert!(transaction.check_structure().is_err());
    }

    #[test]
    fn duplicate_single_instance_attribute_rejected() {
        let mut transaction = sample_transaction();
        transaction.attributes.push(TransactionAttribute::HighPriority);
        assert!(transaction.check_structure().is_err());
    }

    #[test]
    fn repeated_conflicts_allowed() {
        let mut transaction = sample_transaction();
        transaction.attributes = vec![
            TransactionAttribute::Conflicts {
                hash: UInt256::from_array([1u8; 32]),
            },
            TransactionAttribute::Conflicts {
                hash: UInt256::from_array([2u8; 32]),
            },
        ];
        assert!(transaction.check_structure().is_ok());
        assert_eq!(transaction.conflicts_hashes().len(), 2);
    }

    #[test]
    fn sender_is_first_signer() {
        let transaction = sample_transaction();
        assert_eq!(transaction.sender(), UInt160::from_array([1u8; 20]));
    }

    #[test]
    fn sign_data_prefixes_network() {
        let transaction = sample_transaction();
        let data = transaction.sign_data(0x4e).unwrap();
        assert_eq!(&data[..4], &0x4eu32.to_le_bytes());
        assert_eq!(&data[4..], transaction.hash().unwrap().as_bytes());
    }
}
