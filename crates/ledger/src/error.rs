//! Error types for the ledger crate.

use crate::VerifyResult;
use thiserror::Error;

/// Ledger-level errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A block failed validation and was rejected.
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// A transaction failed verification.
    #[error("transaction rejected: {0:?}")]
    TransactionRejected(VerifyResult),

    /// A state root or its signature failed validation.
    #[error("invalid state root: {0}")]
    InvalidStateRoot(String),

    /// The node refused the operation after a fatal storage failure.
    #[error("node is halted after a storage failure")]
    Halted,

    /// The underlying store failed; fatal when raised during commit.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Persisted state could not be interpreted.
    #[error("state inconsistency: {0}")]
    StateInconsistency(String),
}

impl From<neo3_persistence::PersistenceError> for LedgerError {
    fn from(error: neo3_persistence::PersistenceError) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<neo3_core::CoreError> for LedgerError {
    fn from(error: neo3_core::CoreError) -> Self {
        Self::StateInconsistency(error.to_string())
    }
}

impl From<neo3_io::IoError> for LedgerError {
    fn from(error: neo3_io::IoError) -> Self {
        Self::StateInconsistency(error.to_string())
    }
}

impl From<neo3_mpt_trie::MptError> for LedgerError {
    fn from(error: neo3_mpt_trie::MptError) -> Self {
        Self::StateInconsistency(error.to_string())
    }
}

impl From<neo3_smart_contract::ContractError> for LedgerError {
    fn from(error: neo3_smart_contract::ContractError) -> Self {
        Self::StateInconsistency(error.to_string())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
