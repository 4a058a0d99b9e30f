// Copyright (C) 2015-2025 The Neo Project.
//
// uint160.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! 160-bit opaque identifier used for account and contract script hashes.

use crate::CoreError;
use neo3_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The length of UInt160 values in bytes.
pub const UINT160_SIZE: usize = 20;

/// A 160-bit identifier stored in little-endian byte order.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct UInt160([u8; UINT160_SIZE]);

impl UInt160 {
    /// Returns the zero address.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Checks whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Creates a value from exactly 20 little-endian bytes.
    pub fn from_bytes(value: &[u8]) -> Result<Self, CoreError> {
        let bytes: [u8; UINT160_SIZE] = value
            .try_into()
            .map_err(|_| CoreError::invalid_format(format!("invalid length: {}", value.len())))?;
        Ok(Self(bytes))
    }

    /// Wraps a raw 20-byte array.
    pub fn from_array(value: [u8; UINT160_SIZE]) -> Self {
        Self(value)
    }

    /// Computes the script hash of a verification or contract script.
    pub fn from_script(script: &[u8]) -> Self {
        Self(neo3_cryptography::hash::hash160(script))
    }

    /// Gets the little-endian byte representation.
    pub fn as_bytes(&self) -> &[u8; UINT160_SIZE] {
        &self.0
    }

    /// Copies the bytes into a vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Serializable for UInt160 {
    fn size(&self) -> usize {
        UINT160_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.0)
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let bytes = reader.read_bytes(UINT160_SIZE)?;
        Ok(Self(bytes.try_into().expect("read_bytes returned 20 bytes")))
    }
}

impl fmt::Display for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "0x{}", hex::encode(reversed))
    }
}

impl fmt::Debug for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for UInt160 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(trimmed)
            .map_err(|e| CoreError::invalid_format(format!("invalid hex: {e}")))?;
        if bytes.len() != UINT160_SIZE {
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

    #[test]
    fn script_hash_matches_hash160() {
        let script = [0x0C, 0x21, 0x02, 0x41];
        assert_eq!(
            UInt160::from_script(&script).as_bytes(),
            &neo3_cryptography::hash::hash160(&script)
        );
    }

    #[test]
    fn parse_roundtrip() {
        let value = UInt160::from_str("0x49cf4e5378ffcd4dec034fd98a174c5491e395e2").unwrap();
        assert_eq!(value.to_string().parse::<UInt160>().unwrap(), value);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(UInt160::from_bytes(&[0u8; 21]).is_err());
        assert!(UInt160::from_str("0x00").is_err());
    }
}
