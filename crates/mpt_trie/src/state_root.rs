//! The signed per-height state root payload.

use neo3_core::{CoreResult, UInt256, Witness};
use neo3_cryptography::hash::hash256;
use neo3_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// The state root of a height, optionally carrying the aggregated witness
/// of the designated state validators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRoot {
    pub version: u8,
    pub index: u32,
    pub root: UInt256,
    /// Empty until a validator quorum signs the root.
    pub witness: Option<Witness>,
}

impl StateRoot {
    /// Creates an unsigned state root.
    pub fn new(index: u32, root: UInt256) -> Self {
        Self {
            version: 0,
            index,
            root,
            witness: None,
        }
    }

    /// Gets the digest validators sign: the double SHA-256 of the unsigned
    /// encoding.
    pub fn signed_hash(&self) -> CoreResult<UInt256> {
        let mut writer = BinaryWriter::with_capacity(1 + 4 + 32);
        self.serialize_unsigned(&mut writer)?;
        Ok(UInt256::from_array(hash256(&writer.to_bytes())))
    }

    /// Gets the network-scoped signing payload.
    pub fn sign_data(&self, network: u32) -> CoreResult<Vec<u8>> {
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.signed_hash()?.as_bytes());
        Ok(data)
    }

    fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_byte(self.version)?;
        writer.write_u32(self.index)?;
        Serializable::serialize(&self.root, writer)
    }
}

impl Serializable for StateRoot {
    fn size(&self) -> usize {
        1 + 4 + 32 + 1 + self.witness.as_ref().map(Serializable::size).unwrap_or(0)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        match &self.witness {
            Some(witness) => {
                writer.write_var_int(1)?;
                Serializable::serialize(witness, writer)
            }
            None => writer.write_var_int(0),
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let version = reader.read_byte()?;
        let index = reader.read_u32()?;
        let root = Serializable::deserialize(reader)?;
        let witness = match reader.read_var_int(1)? {
            0 => None,
            1 => Some(Serializable::deserialize(reader)?),
            _ => {
                return Err(IoError::format_exception(
                    "state root",
                    "more than one witness",
                ))
            }
        };
        Ok(Self {
            version,
            index,
            root,
            witness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn roundtrip_signed_and_unsigned() {
        let mut root = StateRoot::new(7, UInt256::from_array([1u8; 32]));
        let bytes = root.to_array().unwrap();
        assert_eq!(StateRoot::from_array(&bytes).unwrap(), root);

        root.witness = Some(Witness::new(vec![1], vec![2]));
        let bytes = root.to_array().unwrap();
        assert_eq!(bytes.len(), root.size());
        assert_eq!(StateRoot::from_array(&bytes).unwrap(), root);
    }

    #[test]
    fn signed_hash_ignores_witness() {
        let unsigned = StateRoot::new(7, UInt256::from_array([1u8; 32]));
        let mut signed = unsigned.clone();
        signed.witness = Some(Witness::new(vec![1], vec![2]));
        assert_eq!(signed.signed_hash().unwrap(), unsigned.signed_hash().unwrap());
    }
}
