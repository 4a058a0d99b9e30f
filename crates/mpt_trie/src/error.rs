//! Error types for the MPT crate.

use neo3_core::UInt256;
use thiserror::Error;

/// MPT operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MptError {
    /// A serialized node could not be decoded.
    #[error("invalid node format: {0}")]
    InvalidFormat(String),

    /// A referenced node is absent from the backing store.
    #[error("missing node {0}")]
    MissingNode(UInt256),

    /// A key is empty or too long for the trie.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl From<neo3_io::IoError> for MptError {
    fn from(error: neo3_io::IoError) -> Self {
        Self::InvalidFormat(error.to_string())
    }
}

/// Result type for MPT operations.
pub type MptResult<T> = std::result::Result<T, MptError>;
