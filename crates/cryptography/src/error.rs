//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// An encoded elliptic-curve point could not be decoded.
    #[error("invalid point encoding: {reason}")]
    InvalidPoint { reason: String },

    /// A signature failed structural validation.
    #[error("invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// A private key is out of range or malformed.
    #[error("invalid private key: {reason}")]
    InvalidPrivateKey { reason: String },

    /// Multisig parameters out of range.
    #[error("invalid multisig parameters: m={m}, n={n}")]
    InvalidMultisig { m: usize, n: usize },
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;
