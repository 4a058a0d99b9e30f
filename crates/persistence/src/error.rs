//! Error types for the persistence crate.

use thiserror::Error;

/// Persistence errors.
///
/// `Storage` failures during a block commit are fatal for the node; the
/// ledger stops accepting writes once one surfaces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The backing store failed an operation.
    #[error("storage failure: {message}")]
    Storage { message: String },

    /// Persisted data could not be decoded.
    #[error("corrupted state: {message}")]
    Corruption { message: String },

    /// An operation is not valid for this cache layer.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl PersistenceError {
    /// Creates a storage-failure error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption<S: Into<String>>(message: S) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid-operation error.
    pub fn invalid_operation<S: Into<String>>(message: S) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

impl From<rocksdb::Error> for PersistenceError {
    fn from(error: rocksdb::Error) -> Self {
        Self::storage(error.to_string())
    }
}

impl From<neo3_io::IoError> for PersistenceError {
    fn from(error: neo3_io::IoError) -> Self {
        Self::corruption(error.to_string())
    }
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;
