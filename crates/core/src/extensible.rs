//! Extensible payloads: the generic witnessed broadcast envelope used for
//! state-root and consensus traffic.

use crate::{CoreResult, UInt160, UInt256, Witness};
use neo3_cryptography::hash::sha256;
use neo3_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum size of the embedded data.
pub const MAX_PAYLOAD_DATA: usize = 0xffff;

/// A network-scoped, height-bounded envelope carrying opaque service data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensiblePayload {
    /// Network magic the payload is bound to.
    pub network: u32,
    /// First height at which the payload is valid.
    pub valid_block_start: u32,
    /// Height after which the payload expires.
    pub valid_block_end: u32,
    /// Account whose witness authorizes the payload.
    pub sender: UInt160,
    pub data: Vec<u8>,
    pub witness: Witness,
}

impl ExtensiblePayload {
    /// Gets the digest the sender signs: a single SHA-256 over the unsigned
    /// encoding.
    pub fn signed_hash(&self) -> CoreResult<UInt256> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize_unsigned(&mut writer)?;
        Ok(UInt256::from_array(sha256(&writer.to_bytes())))
    }

    fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.network)?;
        writer.write_u32(self.valid_block_start)?;
        writer.write_u32(self.valid_block_end)?;
        Serializable::serialize(&self.sender, writer)?;
        writer.write_var_bytes(&self.data)
    }
}

impl Serializable for ExtensiblePayload {
    fn size(&self) -> usize {
        4 + 4 + 4 + 20 + helper::get_var_bytes_size(&self.data) + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        Serializable::serialize(&self.witness, writer)
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let network = reader.read_u32()?;
        let valid_block_start = reader.read_u32()?;
        let valid_block_end = reader.read_u32()?;
        let sender = Serializable::deserialize(reader)?;
        let data = reader.read_var_bytes(MAX_PAYLOAD_DATA)?;
        let witness = Serializable::deserialize(reader)?;
        Ok(Self {
            network,
            valid_block_start,
            valid_block_end,
            sender,
            data,
            witness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn roundtrip() {
        let payload = ExtensiblePayload {
            network: 0x4e,
            valid_block_start: 10,
            valid_block_end: 5770,
            sender: UInt160::from_array([2u8; 20]),
            data: vec![1, 2, 3],
            witness: Witness::new(vec![9], vec![8]),
        };
        let bytes = payload.to_array().unwrap();
        assert_eq!(bytes.len(), payload.size());
        assert_eq!(ExtensiblePayload::from_array(&bytes).unwrap(), payload);
    }

    #[test]
    fn signed_hash_ignores_witness() {
        let mut payload = ExtensiblePayload {
            network: 1,
            data: vec![5],
            ..Default::default()
        };
        let before = payload.signed_hash().unwrap();
        payload.witness = Witness::new(vec![1, 2], vec![3]);
        assert_eq!(payload.signed_hash().unwrap(), before);
    }
}
