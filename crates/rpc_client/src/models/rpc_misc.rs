//! Version, contract-state and utility models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol parameters advertised by `getversion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVersionProtocol {
    pub network: u32,
    #[serde(rename = "msperblock")]
    pub ms_per_block: u64,
    #[serde(rename = "maxtraceableblocks")]
    pub max_traceable_blocks: u32,
    #[serde(rename = "maxvaliduntilblockincrement")]
    pub max_valid_until_block_increment: u32,
    #[serde(rename = "maxtransactionsperblock")]
    pub max_transactions_per_block: u32,
    #[serde(rename = "memorypoolmaxtransactions")]
    pub memory_pool_max_transactions: u32,
}

/// The `getversion` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVersion {
    #[serde(rename = "tcpport", default)]
    pub tcp_port: Option<u16>,
    pub nonce: u64,
    #[serde(rename = "useragent")]
    pub user_agent: String,
    pub protocol: RpcVersionProtocol,
}

/// The `getcontractstate` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcContractState {
    pub id: i32,
    #[serde(rename = "updatecounter")]
    pub update_counter: u16,
    pub hash: String,
    pub nef: Value,
    pub manifest: Value,
}

/// Reply of `sendrawtransaction` and `submitblock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSendResult {
    pub hash: String,
}

/// The `validateaddress` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcValidateAddressResult {
    pub address: String,
    #[serde(rename = "isvalid")]
    pub is_valid: bool,
}

/// The `calculatenetworkfee` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNetworkFee {
    #[serde(rename = "networkfee")]
    pub network_fee: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_version() {
        let raw = r#"{
            "tcpport": 10333,
            "nonce": 1234567890,
            "useragent": "/Neo:3.6.0/",
            "protocol": {
                "network": 860833102,
                "msperblock": 15000,
                "maxtraceableblocks": 2102400,
                "maxvaliduntilblockincrement": 5760,
                "maxtransactionsperblock": 512,
                "memorypoolmaxtransactions": 50000
            }
        }"#;
        let version: RpcVersion = serde_json::from_str(raw).unwrap();
        assert_eq!(version.protocol.network, 860833102);
        assert_eq!(version.protocol.max_valid_until_block_increment, 5760);
    }
}
