//! Error types for the smart-contract crate.

use thiserror::Error;

/// Contract-layer errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// A manifest failed validation.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A NEF file failed validation.
    #[error("invalid nef: {0}")]
    InvalidNef(String),

    /// A contract was not found.
    #[error("contract not found: {0}")]
    ContractNotFound(String),

    /// A method does not exist or was called with wrong arguments.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// A native contract rejected the call.
    #[error("native contract error: {0}")]
    NativeContract(String),

    /// The caller lacks the required witness.
    #[error("witness check failed: {0}")]
    WitnessFailed(String),

    /// A storage limit or format constraint was violated.
    #[error("storage error: {0}")]
    Storage(String),

    /// VM failure bubbled up.
    #[error("vm error: {0}")]
    Vm(#[from] neo3_vm::VmError),

    /// Persistence failure bubbled up.
    #[error("persistence error: {0}")]
    Persistence(#[from] neo3_persistence::PersistenceError),
}

impl ContractError {
    /// Creates a native-contract error.
    pub fn native<S: Into<String>>(message: S) -> Self {
        Self::NativeContract(message.into())
    }
}

impl From<neo3_core::CoreError> for ContractError {
    fn from(error: neo3_core::CoreError) -> Self {
        Self::NativeContract(error.to_string())
    }
}

impl From<neo3_cryptography::CryptoError> for ContractError {
    fn from(error: neo3_cryptography::CryptoError) -> Self {
        Self::NativeContract(error.to_string())
    }
}

impl From<neo3_io::IoError> for ContractError {
    fn from(error: neo3_io::IoError) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Result type for contract operations.
pub type ContractResult<T> = std::result::Result<T, ContractError>;
