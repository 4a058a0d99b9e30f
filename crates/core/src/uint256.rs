// Copyright (C) 2015-2025 The Neo Project.
//
// uint256.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! 256-bit opaque identifier used for block, transaction and root hashes.

use crate::CoreError;
use neo3_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The length of UInt256 values in bytes.
pub const UINT256_SIZE: usize = 32;

/// A 256-bit identifier stored in little-endian byte order.
///
/// The textual form is the big-endian (reversed) hex string with a `0x`
/// prefix, which is how hashes appear at the RPC layer. Ordering is by raw
/// little-endian bytes.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct UInt256([u8; UINT256_SIZE]);

impl UInt256 {
    /// Returns the zero hash.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Checks whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Creates a value from exactly 32 little-endian bytes.
    pub fn from_bytes(value: &[u8]) -> Result<Self, CoreError> {
        let bytes: [u8; UINT256_SIZE] = value
            .try_into()
            .map_err(|_| CoreError::invalid_format(format!("invalid length: {}", value.len())))?;
        Ok(Self(bytes))
    }

    /// Wraps a raw 32-byte array.
    pub fn from_array(value: [u8; UINT256_SIZE]) -> Self {
        Self(value)
    }

    /// Gets the little-endian byte representation.
    pub fn as_bytes(&self) -> &[u8; UINT256_SIZE] {
        &self.0
    }

    /// Copies the bytes into a vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Serializable for UInt256 {
    fn size(&self) -> usize {
        UINT256_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.0)
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let bytes = reader.read_bytes(UINT256_SIZE)?;
        Ok(Self(bytes.try_into().expect("read_bytes returned 32 bytes")))
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "0x{}", hex::encode(reversed))
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for UInt256 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(trimmed)
            .map_err(|e| CoreError::invalid_format(format!("invalid hex: {e}")))?;
        if bytes.len() != UINT256_SIZE {
            return Err(CoreError::invalid_format(format!(
                "invalid length: {}",
                bytes.len()
            )));
        }
        bytes.reverse();
        Ok(Self(bytes.try_into().expect("length checked above")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn display_reverses_bytes() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        let value = UInt256::from_array(bytes);
        let text = value.to_string();
        assert!(text.starts_with("0x"));
        assert!(text.ends_with("01"));
    }

    #[test]
    fn parse_roundtrip() {
        let value =
            UInt256::from_str("0xd42561e3d30e15be6400b6df2f328e02d2bf6354c41dce433bc57687c82144bf")
                .unwrap();
        assert_eq!(value.to_string().parse::<UInt256>().unwrap(), value);
    }

    #[test]
    fn serialization_roundtrip() {
        let value = UInt256::from_array([9u8; 32]);
        let bytes = value.to_array().unwrap();
        assert_eq!(bytes.len(), UINT256_SIZE);
        assert_eq!(UInt256::from_array(bytes.try_into().unwrap()), value);
    }

    #[test]
    fn ordering_is_by_raw_bytes() {
        let a = UInt256::from_array([1u8; 32]);
        let b = UInt256::from_array([2u8; 32]);
        assert!(a < b);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(UInt256::from_bytes(&[0u8; 31]).is_err());
        assert!(UInt256::from_str("0xabcd").is_err());
    }
}
