//! Error types for the I/O crate.

use thiserror::Error;

/// I/O operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// Unexpected end of stream.
    #[error("unexpected end of stream: expected {expected} more bytes while reading {context}")]
    EndOfStream { expected: usize, context: String },

    /// Malformed data encountered while parsing.
    #[error("format exception: {context}, input: {input}")]
    FormatException { context: String, input: String },

    /// A length prefix exceeds the caller-supplied bound.
    #[error("length {length} exceeds maximum {max} while reading {context}")]
    LengthExceeded {
        length: u64,
        max: u64,
        context: String,
    },

    /// Invalid operation attempted on the stream.
    #[error("invalid operation: {operation} ({context})")]
    InvalidOperation { operation: String, context: String },

    /// Encoding/decoding error.
    #[error("encoding error: {encoding}, reason: {reason}")]
    Encoding { encoding: String, reason: String },
}

impl IoError {
    /// Creates an end-of-stream error.
    pub fn end_of_stream<S: Into<String>>(expected: usize, context: S) -> Self {
        Self::EndOfStream {
            expected,
            context: context.into(),
        }
    }

    /// Creates a format-exception error.
    pub fn format_exception<S: Into<String>>(context: S, input: S) -> Self {
        Self::FormatException {
            context: context.into(),
            input: input.into(),
        }
    }

    /// Creates a length-exceeded error.
    pub fn length_exceeded<S: Into<String>>(length: u64, max: u64, context: S) -> Self {
        Self::LengthExceeded {
            length,
            max,
            context: context.into(),
        }
    }

    /// Creates an invalid-operation error.
    pub fn invalid_operation<S: Into<String>>(operation: S, context: S) -> Self {
        Self::InvalidOperation {
            operation: operation.into(),
            context: context.into(),
        }
    }

    /// Creates an encoding error.
    pub fn encoding<S: Into<String>>(encoding: S, reason: S) -> Self {
        Self::Encoding {
            encoding: encoding.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::string::FromUtf8Error> for IoError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        IoError::encoding("utf8", &error.to_string())
    }
}

/// Result type for I/O operations.
pub type IoResult<T> = std::result::Result<T, IoError>;
