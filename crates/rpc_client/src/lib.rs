//! JSON-RPC client library for Neo N3 nodes.
//!
//! A thin typed wrapper over the node's JSON-RPC 2.0 surface. The client
//! is cheap to clone and safe to share across tasks.

mod client;
mod error;
mod methods;
pub mod models;

pub use client::{JsonRpcRequest, JsonRpcResponse, RpcClient, RpcConfig};
pub use error::{RpcError, RpcResult};
