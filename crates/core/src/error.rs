//! Error types for the core crate.

use thiserror::Error;

/// Core data-model errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed binary or textual representation.
    #[error("invalid format: {message}")]
    InvalidFormat { message: String },

    /// Structurally valid data violating a model invariant.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Serialization failure bubbled up from the I/O layer.
    #[error("serialization error: {0}")]
    Io(#[from] neo3_io::IoError),

    /// Cryptographic failure bubbled up from the crypto layer.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] neo3_cryptography::CryptoError),
}

impl CoreError {
    /// Creates an invalid-format error.
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid-data error.
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
