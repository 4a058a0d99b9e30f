//! Error types for the RPC client.

use thiserror::Error;

/// RPC client errors.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The transport failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// The response payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The client was configured with invalid parameters.
    #[error("configuration error: {0}")]
    Config(String),

    /// The server replied without a result.
    #[error("empty response for {method}")]
    EmptyResponse { method: String },
}

/// Result type for RPC operations.
pub type RpcResult<T> = std::result::Result<T, RpcError>;
