//! secp256r1 key pairs and ECDSA signatures.

use crate::error::{CryptoError, CryptoResult};
use crate::ECPoint;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

/// A secp256r1 key pair.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Builds a key pair from a 32-byte private key.
    pub fn from_private_key(bytes: &[u8]) -> CryptoResult<Self> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|e| CryptoError::InvalidPrivateKey {
                reason: e.to_string(),
            })?;
        Ok(Self { signing_key })
    }

    /// Gets the compressed public key.
    pub fn public_key(&self) -> ECPoint {
        let verifying = self.signing_key.verifying_key();
        let encoded = verifying.to_encoded_point(true);
        ECPoint::from_bytes(encoded.as_bytes()).expect("verifying key is a valid point")
    }

    /// Signs a message, hashing it with SHA-256 first.
    ///
    /// Returns the 64-byte `r ‖ s` form used in invocation scripts.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_bytes().to_vec()
    }
}

/// Verifies a 64-byte `r ‖ s` signature over `message` for `public_key`.
pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &ECPoint) -> bool {
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_sec1_bytes(public_key.as_bytes()) else {
        return false;
    };
    verifying.verify(message, &signature).is_ok()
}

impl KeyPair {
    /// Verifies a signature produced by [`KeyPair::sign`].
    pub fn verify(message: &[u8], signature: &[u8], public_key: &ECPoint) -> bool {
        verify_signature(message, signature, public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let key = KeyPair::generate();
        let message = b"state root 42";
        let signature = key.sign(message);
        assert_eq!(signature.len(), 64);
        assert!(KeyPair::verify(message, &signature, &key.public_key()));
        assert!(!KeyPair::verify(b"other message", &signature, &key.public_key()));
        assert!(!KeyPair::verify(
            message,
            &signature,
            &KeyPair::generate().public_key()
        ));
    }

    #[test]
    fn private_key_roundtrip() {
        assert!(KeyPair::from_private_key(&[0u8; 32]).is_err());
        assert!(KeyPair::from_private_key(&[7u8; 32]).is_ok());
    }
}
