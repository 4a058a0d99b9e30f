//! The JSON-RPC 2.0 transport.

use crate::{RpcError, RpcResult};
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub user_agent: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:10332".to_string(),
            timeout: 30,
            user_agent: format!("neo3-rpc-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[allow(dead_code)]
    pub id: Option<u64>,
}

/// The error object of a failed call.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// A typed JSON-RPC client over HTTP.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    config: RpcConfig,
    request_id: Arc<AtomicU64>,
}

impl RpcClient {
    /// Creates a client for `endpoint` with default configuration.
    pub fn new(endpoint: impl Into<String>) -> RpcResult<Self> {
        Self::with_config(RpcConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        })
    }

    /// Creates a client from a full configuration.
    pub fn with_config(config: RpcConfig) -> RpcResult<Self> {
        Url::parse(&config.endpoint)
            .map_err(|e| RpcError::Config(format!("invalid endpoint: {e}")))?;
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Sends one call and decodes the result.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };
        debug!(method, id = request.id, "rpc call");
        let response: JsonRpcResponse = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(RpcError::Protocol {
                code: error.code,
                message: error.message,
            });
        }
        let result = response.result.ok_or_else(|| RpcError::EmptyResponse {
            method: method.to_string(),
        })?;
        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_endpoint_rejected() {
        assert!(matches!(
            RpcClient::new("not a url"),
            Err(RpcError::Config(_))
        ));
        assert!(RpcClient::new("http://localhost:10332").is_ok());
    }

    #[test]
    fn request_ids_increase() {
        let client = RpcClient::new("http://localhost:10332").unwrap();
        let first = client.request_id.fetch_add(1, Ordering::Relaxed);
        let second = client.request_id.fetch_add(1, Ordering::Relaxed);
        assert!(second > first);
    }

    #[test]
    fn response_envelope_decodes_errors() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");
    }
}
