//! Deployed contract state and the NEF container.

use crate::manifest::ContractManifest;
use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_config::MAX_SCRIPT_SIZE;
use neo3_cryptography::hash::{hash160, sha256};
use serde::{Deserialize, Serialize};

/// Magic bytes identifying a NEF container ("NEF3").
pub const NEF_MAGIC: u32 = 0x3346_454E;

/// The executable container of a contract: compiler tag, script and a
/// checksum binding both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NefFile {
    pub compiler: String,
    pub source: String,
    pub script: Vec<u8>,
    pub checksum: u32,
}

impl NefFile {
    /// Builds a NEF over `script`, computing the checksum.
    pub fn new(compiler: String, source: String, script: Vec<u8>) -> ContractResult<Self> {
        if script.is_empty() || script.len() > MAX_SCRIPT_SIZE {
            return Err(ContractError::InvalidNef(format!(
                "script of {} bytes",
                script.len()
            )));
        }
        let checksum = Self::compute_checksum(&script);
        Ok(Self {
            compiler,
            source,
            script,
            checksum,
        })
    }

    /// First four little-endian bytes of the double SHA-256 of the script.
    pub fn compute_checksum(script: &[u8]) -> u32 {
        let digest = sha256(&sha256(script));
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Validates magic-independent invariants.
    pub fn validate(&self) -> ContractResult<()> {
        if self.script.is_empty() || self.script.len() > MAX_SCRIPT_SIZE {
            return Err(ContractError::InvalidNef("script size".to_string()));
        }
        if self.checksum != Self::compute_checksum(&self.script) {
            return Err(ContractError::InvalidNef("checksum mismatch".to_string()));
        }
        Ok(())
    }
}

/// The state of a deployed (or native) contract.
///
/// Ids are unique small integers; natives use reserved negative ids
/// assigned at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    pub id: i32,
    pub update_counter: u16,
    pub hash: UInt160,
    pub nef: NefFile,
    pub manifest: ContractManifest,
}

impl ContractState {
    /// Serializes for the DAO.
    pub fn to_bytes(&self) -> ContractResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ContractError::Storage(e.to_string()))
    }

    /// Deserializes from the DAO.
    pub fn from_bytes(bytes: &[u8]) -> ContractResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ContractError::Storage(e.to_string()))
    }
}

/// Derives a contract hash from its deployment parameters: the deployer,
/// the NEF checksum and the manifest name feed a pseudo-script whose
/// script hash becomes the contract address.
pub fn contract_hash(sender: &UInt160, nef_checksum: u32, name: &str) -> UInt160 {
    let mut script = Vec::with_capacity(1 + 20 + 4 + name.len());
    script.push(0x38); // ABORT keeps the pseudo-script unexecutable
    script.extend_from_slice(sender.as_bytes());
    script.extend_from_slice(&nef_checksum.to_le_bytes());
    script.extend_from_slice(name.as_bytes());
    UInt160::from_array(hash160(&script))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nef_checksum_binds_script() {
        let nef = NefFile::new("neon".to_string(), String::new(), vec![0x40]).unwrap();
        assert!(nef.validate().is_ok());
        let mut tampered = nef.clone();
        tampered.script = vec![0x41, 0x40];
        assert!(tampered.validate().is_err());
    }

    #[test]
    fn empty_script_rejected() {
        assert!(NefFile::new("neon".to_string(), String::new(), Vec::new()).is_err());
    }

    #[test]
    fn contract_hash_depends_on_all_inputs() {
        let sender = UInt160::from_array([1u8; 20]);
        let base = contract_hash(&sender, 7, "Token");
        assert_ne!(base, contract_hash(&sender, 8, "Token"));
        assert_ne!(base, contract_hash(&sender, 7, "Other"));
        assert_ne!(base, contract_hash(&UInt160::zero(), 7, "Token"));
        // Deterministic.
        assert_eq!(base, contract_hash(&sender, 7, "Token"));
    }
}
