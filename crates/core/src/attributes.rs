//! Transaction attributes.

use crate::UInt256;
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum size of an oracle response result payload.
pub const MAX_ORACLE_RESULT_SIZE: usize = 0xffff;

/// The discriminator byte of a transaction attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttributeType {
    /// Priority class that bypasses fee ordering in the mempool.
    HighPriority = 0x01,
    /// Marks a transaction as the response to an oracle request.
    OracleResponse = 0x11,
    /// The transaction is invalid before the given height.
    NotValidBefore = 0x20,
    /// The transaction excludes another one from the chain.
    Conflicts = 0x21,
    /// The transaction was assisted by a notary service.
    NotaryAssisted = 0x22,
}

impl AttributeType {
    /// Decodes the discriminator byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::HighPriority),
            0x11 => Some(Self::OracleResponse),
            0x20 => Some(Self::NotValidBefore),
            0x21 => Some(Self::Conflicts),
            0x22 => Some(Self::NotaryAssisted),
            _ => None,
        }
    }

    /// Whether a transaction may carry more than one attribute of this kind.
    pub fn allow_multiple(&self) -> bool {
        matches!(self, Self::Conflicts)
    }

    /// Whether the kind is gated by the `P2PSigExtensions` setting.
    pub fn requires_sig_extensions(&self) -> bool {
        matches!(
            self,
            Self::NotValidBefore | Self::Conflicts | Self::NotaryAssisted
        )
    }
}

/// Result codes an oracle can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OracleResponseCode {
    Success = 0x00,
    ProtocolNotSupported = 0x10,
    ConsensusUnreachable = 0x12,
    NotFound = 0x14,
    Timeout = 0x16,
    Forbidden = 0x18,
    ResponseTooLarge = 0x1a,
    InsufficientFunds = 0x1c,
    ContentTypeNotSupported = 0x1f,
    Error = 0xff,
}

impl OracleResponseCode {
    /// Decodes the code byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Success),
            0x10 => Some(Self::ProtocolNotSupported),
            0x12 => Some(Self::ConsensusUnreachable),
            0x14 => Some(Self::NotFound),
            0x16 => Some(Self::Timeout),
            0x18 => Some(Self::Forbidden),
            0x1a => Some(Self::ResponseTooLarge),
            0x1c => Some(Self::InsufficientFunds),
            0x1f => Some(Self::ContentTypeNotSupported),
            0xff => Some(Self::Error),
            _ => None,
        }
    }
}

/// A transaction attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAttribute {
    HighPriority,
    OracleResponse {
        id: u64,
        code: OracleResponseCode,
        result: Vec<u8>,
    },
    NotValidBefore {
        height: u32,
    },
    Conflicts {
        hash: UInt256,
    },
    NotaryAssisted {
        n_keys: u8,
    },
}

impl TransactionAttribute {
    /// Gets the attribute kind.
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Self::HighPriority => AttributeType::HighPriority,
            Self::OracleResponse { .. } => AttributeType::OracleResponse,
            Self::NotValidBefore { .. } => AttributeType::NotValidBefore,
            Self::Conflicts { .. } => AttributeType::Conflicts,
            Self::NotaryAssisted { .. } => AttributeType::NotaryAssisted,
        }
    }
}

impl Serializable for TransactionAttribute {
    fn size(&self) -> usize {
        1 + match self {
            Self::HighPriority => 0,
            Self::OracleResponse { result, .. } => 8 + 1 + helper::get_var_bytes_size(result),
            Self::NotValidBefore { .. } => 4,
            Self::Conflicts { hash } => hash.size(),
            Self::NotaryAssisted { .. } => 1,
        }
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_byte(self.attribute_type() as u8)?;
        match self {
            Self::HighPriority => Ok(()),
            Self::OracleResponse { id, code, result } => {
                writer.write_u64(*id)?;
                writer.write_byte(*code as u8)?;
                writer.write_var_bytes(result)
            }
            Self::NotValidBefore { height } => writer.write_u32(*height),
            Self::Conflicts { hash } => Serializable::serialize(hash, writer),
            Self::NotaryAssisted { n_keys } => writer.write_byte(*n_keys),
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let type_byte = reader.read_byte()?;
        let attribute_type = AttributeType::from_byte(type_byte).ok_or_else(|| {
            IoError::format_exception("attribute type".to_string(), format!("{type_byte:#04x}"))
        })?;
        match attribute_type {
            AttributeType::HighPriority => Ok(Self::HighPriority),
            AttributeType::OracleResponse => {
                let id = reader.read_u64()?;
                let code_byte = reader.read_byte()?;
                let code = OracleResponseCode::from_byte(code_byte).ok_or_else(|| {
                    IoError::format_exception(
                        "oracle response code".to_string(),
                        format!("{code_byte:#04x}"),
                    )
                })?;
                let result = reader.read_var_bytes(MAX_ORACLE_RESULT_SIZE)?;
                if code != OracleResponseCode::Success && !result.is_empty() {
                    return Err(IoError::format_exception(
                        "oracle response",
                        "non-success response carries a result",
                    ));
                }
                Ok(Self::OracleResponse { id, code, result })
            }
            AttributeType::NotValidBefore => Ok(Self::NotValidBefore {
                height: reader.read_u32()?,
            }),
            AttributeType::Conflicts => Ok(Self::Conflicts {
                hash: Serializable::deserialize(reader)?,
            }),
            AttributeType::NotaryAssisted => Ok(Self::NotaryAssisted {
                n_keys: reader.read_byte()?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn roundtrip_each_kind() {
        let attributes = [
            TransactionAttribute::HighPriority,
            TransactionAttribute::OracleResponse {
                id: 42,
                code: OracleResponseCode::Success,
                result: vec![1, 2, 3],
            },
            TransactionAttribute::NotValidBefore { height: 100 },
            TransactionAttribute::Conflicts {
                hash: UInt256::from_array([8u8; 32]),
            },
            TransactionAttribute::NotaryAssisted { n_keys: 4 },
        ];
        for attribute in attributes {
            let bytes = attribute.to_array().unwrap();
            assert_eq!(bytes.len(), attribute.size());
            assert_eq!(TransactionAttribute::from_array(&bytes).unwrap(), attribute);
        }
    }

    #[test]
    fn only_conflicts_allows_multiple() {
        assert!(AttributeType::Conflicts.allow_multiple());
        assert!(!AttributeType::HighPriority.allow_multiple());
        assert!(!AttributeType::OracleResponse.allow_multiple());
        assert!(!AttributeType::NotValidBefore.allow_multiple());
    }

    #[test]
    fn failed_oracle_response_must_be_empty() {
        let attribute = TransactionAttribute::OracleResponse {
            id: 7,
            code: OracleResponseCode::Timeout,
            result: vec![0xAA],
        };
        let bytes = attribute.to_array().unwrap();
        assert!(TransactionAttribute::from_array(&bytes).is_err());
    }

    #[test]
    fn unknown_type_byte_rejected() {
        assert!(TransactionAttribute::from_array(&[0x7f]).is_err());
    }
}
