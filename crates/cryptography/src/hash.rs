//! Hash functions used across the protocol.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA-256 of the input.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Double SHA-256, used for block, transaction and payload identities.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 over SHA-256, used for script hashes.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = sha256(data);
    let mut hasher = Ripemd160::new();
    hasher.update(sha);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        // SHA-256 of the empty string.
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        // hash160 is 20 bytes, hash256 is 32 bytes.
        assert_eq!(hash160(b"neo").len(), 20);
        assert_eq!(hash256(b"neo").len(), 32);
        // hash256 is sha256 applied twice.
        assert_eq!(hash256(b"x"), sha256(&sha256(b"x")));
    }
}
