//! Compressed secp256r1 points.

use crate::error::{CryptoError, CryptoResult};
use p256::PublicKey;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A validated compressed secp256r1 public key.
///
/// Points order by their 33-byte compressed encoding, which is the ordering
/// used for multisig script construction and role designation lists.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ECPoint {
    encoded: [u8; 33],
}

impl Serialize for ECPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.encoded))
    }
}

impl<'de> Deserialize<'de> for ECPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

impl ECPoint {
    /// Decodes a compressed point, verifying it lies on the curve.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let encoded: [u8; 33] = bytes.try_into().map_err(|_| CryptoError::InvalidPoint {
            reason: format!("expected 33 bytes, got {}", bytes.len()),
        })?;
        if encoded[0] != 0x02 && encoded[0] != 0x03 {
            return Err(CryptoError::InvalidPoint {
                reason: format!("invalid compression prefix {:#04x}", encoded[0]),
            });
        }
        PublicKey::from_sec1_bytes(&encoded).map_err(|_| CryptoError::InvalidPoint {
            reason: "not a curve point".to_string(),
        })?;
        Ok(Self { encoded })
    }

    /// Gets the 33-byte compressed encoding.
    pub fn encoded(&self) -> &[u8; 33] {
        &self.encoded
    }

    /// Gets the encoding as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }
}

impl Ord for ECPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encoded.cmp(&other.encoded)
    }
}

impl PartialOrd for ECPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.encoded))
    }
}

impl fmt::Debug for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ECPoint({})", self)
    }
}

impl FromStr for ECPoint {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidPoint {
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn decode_rejects_garbage() {
        assert!(ECPoint::from_bytes(&[0u8; 33]).is_err());
        assert!(ECPoint::from_bytes(&[0u8; 20]).is_err());
        let mut bad_prefix = [0u8; 33];
        bad_prefix[0] = 0x05;
        assert!(ECPoint::from_bytes(&bad_prefix).is_err());
    }

    #[test]
    fn roundtrip_through_hex() {
        let key = KeyPair::generate();
        let point = key.public_key();
        let parsed: ECPoint = point.to_string().parse().unwrap();
        assert_eq!(parsed, point);
    }

    #[test]
    fn ordering_is_by_encoding() {
        let a = KeyPair::generate().public_key();
        let b = KeyPair::generate().public_key();
        assert_eq!(a.cmp(&b), a.encoded().cmp(b.encoded()));
    }
}
