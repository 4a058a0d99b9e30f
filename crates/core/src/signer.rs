//! Transaction signers.

use crate::{CoreError, UInt160, WitnessScope};
use neo3_cryptography::ECPoint;
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum number of contracts or groups a signer may scope to.
pub const MAX_SUBITEMS: usize = 16;

/// A signer ties an account to the scopes under which its witness holds.
///
/// The first signer of a transaction is the sender and pays its fees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub account: UInt160,
    pub scopes: WitnessScope,
    /// Contracts the witness extends to under `CUSTOM_CONTRACTS`.
    pub allowed_contracts: Vec<UInt160>,
    /// Groups the witness extends to under `CUSTOM_GROUPS`.
    pub allowed_groups: Vec<ECPoint>,
}

impl Signer {
    /// Creates a signer with the given scope and no custom lists.
    pub fn new(account: UInt160, scopes: WitnessScope) -> Self {
        Self {
            account,
            scopes,
            allowed_contracts: Vec::new(),
            allowed_groups: Vec::new(),
        }
    }

    /// Validates scope combination and custom list bounds.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.scopes.validate()?;
        if self.scopes.has_flag(WitnessScope::CUSTOM_CONTRACTS)
            && (self.allowed_contracts.is_empty() || self.allowed_contracts.len() > MAX_SUBITEMS)
        {
            return Err(CoreError::invalid_data(
                "custom contracts scope requires 1..=16 contracts",
            ));
        }
        if self.scopes.has_flag(WitnessScope::CUSTOM_GROUPS)
            && (self.allowed_groups.is_empty() || self.allowed_groups.len() > MAX_SUBITEMS)
        {
            return Err(CoreError::invalid_data(
                "custom groups scope requires 1..=16 groups",
            ));
        }
        Ok(())
    }
}

impl Serializable for Signer {
    fn size(&self) -> usize {
        let mut size = self.account.size() + 1;
        if self.scopes.has_flag(WitnessScope::CUSTOM_CONTRACTS) {
            size += helper::get_array_size(&self.allowed_contracts);
        }
        if self.scopes.has_flag(WitnessScope::CUSTOM_GROUPS) {
            size += helper::get_var_size(self.allowed_groups.len() as u64)
                + self.allowed_groups.len() * 33;
        }
        size
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        Serializable::serialize(&self.account, writer)?;
        writer.write_byte(self.scopes.0)?;
        if self.scopes.has_flag(WitnessScope::CUSTOM_CONTRACTS) {
            writer.write_serializable_vec(&self.allowed_contracts)?;
        }
        if self.scopes.has_flag(WitnessScope::CUSTOM_GROUPS) {
            writer.write_var_int(self.allowed_groups.len() as u64)?;
            for group in &self.allowed_groups {
                writer.write_bytes(group.as_bytes())?;
            }
        }
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let account = Serializable::deserialize(reader)?;
        let scopes = WitnessScope(reader.read_byte()?);
        scopes
            .validate()
            .map_err(|e| IoError::format_exception("signer scopes", &e.to_string()))?;

        let mut allowed_contracts = Vec::new();
        if scopes.has_flag(WitnessScope::CUSTOM_CONTRACTS) {
            let count = reader.read_var_int(MAX_SUBITEMS as u64)? as usize;
            for _ in 0..count {
                allowed_contracts.push(Serializable::deserialize(reader)?);
            }
        }

        let mut allowed_groups = Vec::new();
        if scopes.has_flag(WitnessScope::CUSTOM_GROUPS) {
            let count = reader.read_var_int(MAX_SUBITEMS as u64)? as usize;
            for _ in 0..count {
                let bytes = reader.read_bytes(33)?;
                let point = ECPoint::from_bytes(&bytes)
                    .map_err(|e| IoError::format_exception("signer group", &e.to_string()))?;
                allowed_groups.push(point);
            }
        }

        Ok(Self {
            account,
            scopes,
            allowed_contracts,
            allowed_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn roundtrip_with_custom_contracts() {
        let signer = Signer {
            account: UInt160::from_array([3u8; 20]),
            scopes: WitnessScope::CALLED_BY_ENTRY | WitnessScope::CUSTOM_CONTRACTS,
            allowed_contracts: vec![UInt160::from_array([5u8; 20])],
            allowed_groups: Vec::new(),
        };
        let bytes = signer.to_array().unwrap();
        assert_eq!(bytes.len(), signer.size());
        assert_eq!(Signer::from_array(&bytes).unwrap(), signer);
    }

    #[test]
    fn deserialize_rejects_invalid_scope() {
        let mut bytes = UInt160::zero().to_vec();
        bytes.push(0x81); // global + called-by-entry
        assert!(Signer::from_array(&bytes).is_err());
    }

    #[test]
    fn custom_contracts_require_entries() {
        let signer = Signer::new(
            UInt160::zero(),
            WitnessScope::CUSTOM_CONTRACTS,
        );
        assert!(signer.validate().is_err());
    }
}
