//! Protocol settings and network constants for the Neo N3 node.
//!
//! Everything in this crate is immutable once the node has started. Any
//! parameter that can change at runtime lives in the Policy native contract
//! and is read through the DAO instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Milliseconds between two consecutive blocks on the default profile.
pub const MILLISECONDS_PER_BLOCK: u64 = 15_000;

/// Maximum size of a serialized transaction in bytes.
pub const MAX_TRANSACTION_SIZE: usize = 102_400;

/// Maximum size of a serialized block in bytes.
pub const MAX_BLOCK_SIZE: usize = 1_048_576;

/// Maximum number of transactions in a single block.
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 512;

/// Maximum number of blocks a transaction may stay valid after submission.
pub const MAX_VALID_UNTIL_BLOCK_INCREMENT: u32 = 5760;

/// Maximum number of blocks that can be traced back (about one year).
pub const MAX_TRACEABLE_BLOCKS: u32 = 2_102_400;

/// Size of a hash (UInt256) in bytes.
pub const HASH_SIZE: usize = 32;

/// Size of an account address (UInt160) in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Maximum contract script size in bytes.
pub const MAX_SCRIPT_SIZE: usize = 65_536;

/// Maximum contract storage key size in bytes.
pub const MAX_STORAGE_KEY_SIZE: usize = 64;

/// Maximum contract storage value size in bytes.
pub const MAX_STORAGE_VALUE_SIZE: usize = 65_535;

/// Maximum number of signers/attributes carried by one transaction.
pub const MAX_TRANSACTION_ATTRIBUTES: usize = 16;

/// Maximum number of nodes that can be designated for one role.
pub const MAX_NODE_COUNT: usize = 32;

/// Default capacity of the memory pool.
pub const DEFAULT_MEMPOOL_SIZE: usize = 50_000;

/// Errors raised while building protocol settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A standby committee key could not be decoded.
    #[error("invalid committee key at position {position}: {reason}")]
    InvalidCommitteeKey { position: usize, reason: String },

    /// The validator count does not fit the committee.
    #[error("validators count {validators} exceeds committee size {committee}")]
    InvalidValidatorsCount { validators: usize, committee: usize },
}

/// Well-known networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NetworkType {
    MainNet,
    TestNet,
    #[default]
    Private,
}

impl NetworkType {
    /// Gets the network magic number.
    pub fn magic(&self) -> u32 {
        match self {
            NetworkType::MainNet => 0x334f454e,
            NetworkType::TestNet => 0x3254334e,
            NetworkType::Private => 0x0000004e,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::MainNet => write!(f, "mainnet"),
            NetworkType::TestNet => write!(f, "testnet"),
            NetworkType::Private => write!(f, "private"),
        }
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(NetworkType::MainNet),
            "testnet" | "test" => Ok(NetworkType::TestNet),
            "private" | "privnet" => Ok(NetworkType::Private),
            _ => Err(format!("Unknown network type: {}", s)),
        }
    }
}

/// Protocol-level settings shared by every subsystem of the node.
///
/// Deserialized once from the node configuration file by the CLI and then
/// passed around behind an `Arc`; nothing here mutates after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProtocolSettings {
    /// Network identifier mixed into every signed payload.
    pub magic: u32,
    /// Number of blocks a stored transaction stays reachable.
    pub max_traceable_blocks: u32,
    /// Target interval between blocks.
    pub milliseconds_per_block: u64,
    /// Upper bound for `valid_until_block - current_height`.
    pub max_valid_until_block_increment: u32,
    /// Capacity of the memory pool.
    pub mem_pool_size: usize,
    /// Hex-encoded compressed public keys of the standby committee.
    pub standby_committee: Vec<String>,
    /// Number of consensus validators drawn from the committee.
    pub validators_count: usize,
    /// Whether incoming blocks are fully verified before persisting.
    pub verify_blocks: bool,
    /// Whether relayed transactions are verified before pooling.
    pub verify_transactions: bool,
    /// Gates the `NotValidBefore`, `Conflicts` and `NotaryAssisted`
    /// transaction attributes.
    #[serde(rename = "P2PSigExtensions")]
    pub p2p_sig_extensions: bool,
    /// Native contract name to the list of heights at which successive
    /// versions of the contract activate.
    pub native_activations: HashMap<String, Vec<u32>>,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            magic: NetworkType::Private.magic(),
            max_traceable_blocks: MAX_TRACEABLE_BLOCKS,
            milliseconds_per_block: MILLISECONDS_PER_BLOCK,
            max_valid_until_block_increment: MAX_VALID_UNTIL_BLOCK_INCREMENT,
            mem_pool_size: DEFAULT_MEMPOOL_SIZE,
            standby_committee: Vec::new(),
            validators_count: 0,
            verify_blocks: true,
            verify_transactions: true,
            p2p_sig_extensions: false,
            native_activations: HashMap::new(),
        }
    }
}

impl ProtocolSettings {
    /// Gets the network magic.
    pub fn network(&self) -> u32 {
        self.magic
    }

    /// Gets the seconds-per-block interval.
    pub fn seconds_per_block(&self) -> u64 {
        self.milliseconds_per_block / 1000
    }

    /// Decodes the standby committee keys.
    ///
    /// The returned keys are the raw 33-byte compressed encodings in the
    /// configured order; validation of the curve points is left to the
    /// cryptography layer.
    pub fn committee_keys(&self) -> Result<Vec<[u8; 33]>, ConfigError> {
        let mut keys = Vec::with_capacity(self.standby_committee.len());
        for (position, entry) in self.standby_committee.iter().enumerate() {
            let bytes = hex::decode(entry).map_err(|e| ConfigError::InvalidCommitteeKey {
                position,
                reason: e.to_string(),
            })?;
            let key: [u8; 33] =
                bytes
                    .try_into()
                    .map_err(|_| ConfigError::InvalidCommitteeKey {
                        position,
                        reason: "expected 33 bytes".to_string(),
                    })?;
            keys.push(key);
        }
        Ok(keys)
    }

    /// Gets the standby validator keys: the first `validators_count` entries
    /// of the committee.
    pub fn validator_keys(&self) -> Result<Vec<[u8; 33]>, ConfigError> {
        let committee = self.committee_keys()?;
        if self.validators_count > committee.len() {
            return Err(ConfigError::InvalidValidatorsCount {
                validators: self.validators_count,
                committee: committee.len(),
            });
        }
        Ok(committee[..self.validators_count].to_vec())
    }

    /// Gets the heights at which the named native contract activates.
    /// A native that never appears in the map activates at genesis.
    pub fn native_activation_heights(&self, name: &str) -> Vec<u32> {
        self.native_activations.get(name).cloned().unwrap_or_else(|| vec![0])
    }

    /// True if the named native contract is active at the given height.
    pub fn is_native_active(&self, name: &str, height: u32) -> bool {
        self.native_activation_heights(name)
            .first()
            .map(|&h| height >= h)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_private_net() {
        let settings = ProtocolSettings::default();
        assert_eq!(settings.magic, NetworkType::Private.magic());
        assert_eq!(settings.mem_pool_size, DEFAULT_MEMPOOL_SIZE);
        assert!(settings.verify_blocks);
        assert!(!settings.p2p_sig_extensions);
    }

    #[test]
    fn committee_keys_roundtrip() {
        let mut settings = ProtocolSettings::default();
        settings.standby_committee = vec![
            "02486fd15702c4490a26703112a5cc1d0923fd697a33406bd5a1c00e0013b09a70".to_string(),
        ];
        settings.validators_count = 1;
        let keys = settings.committee_keys().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0][0], 0x02);
        assert_eq!(settings.validator_keys().unwrap().len(), 1);
    }

    #[test]
    fn committee_key_rejects_bad_hex() {
        let mut settings = ProtocolSettings::default();
        settings.standby_committee = vec!["zz".to_string()];
        assert!(matches!(
            settings.committee_keys(),
            Err(ConfigError::InvalidCommitteeKey { position: 0, .. })
        ));
    }

    #[test]
    fn validators_count_must_fit_committee() {
        let mut settings = ProtocolSettings::default();
        settings.validators_count = 3;
        assert!(matches!(
            settings.validator_keys(),
            Err(ConfigError::InvalidValidatorsCount { .. })
        ));
    }

    #[test]
    fn native_activation_defaults_to_genesis() {
        let settings = ProtocolSettings::default();
        assert!(settings.is_native_active("PolicyContract", 0));
        assert_eq!(settings.native_activation_heights("NeoToken"), vec![0]);
    }

    #[test]
    fn settings_deserialize_from_json() {
        let json = r#"{
            "Magic": 860833102,
            "MemPoolSize": 100,
            "StandbyCommittee": [],
            "ValidatorsCount": 0,
            "P2PSigExtensions": true
        }"#;
        let settings: ProtocolSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.magic, 860833102);
        assert_eq!(settings.mem_pool_size, 100);
        assert!(settings.p2p_sig_extensions);
    }
}
