//! Error types for the VM crate.

use thiserror::Error;

/// VM execution errors. Every variant faults the engine when it reaches
/// the main loop; catchable ones can be intercepted by `TRY` handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// An opcode or operand could not be decoded.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// A stack operation was applied to too few or wrongly typed items.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A type conversion failed.
    #[error("invalid cast: {0}")]
    InvalidCast(String),

    /// An engine limit was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// The gas budget ran out.
    #[error("gas exhausted: consumed {consumed}, limit {limit}")]
    OutOfGas { consumed: i64, limit: i64 },

    /// A script-raised exception left uncaught.
    #[error("uncaught exception: {0}")]
    UncaughtException(String),

    /// A syscall was invoked without the required call flags.
    #[error("missing call flags: have {have:#04x}, need {need:#04x}")]
    MissingCallFlags { have: u8, need: u8 },

    /// An unknown syscall id.
    #[error("unknown syscall {0:#010x}")]
    UnknownSyscall(u32),

    /// `ABORT` reached or `ASSERT` failed; never catchable.
    #[error("execution aborted: {0}")]
    Aborted(String),
}

/// Result type for VM operations.
pub type VmResult<T> = std::result::Result<T, VmError>;
