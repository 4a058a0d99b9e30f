//! Verbose transaction models.

use serde::{Deserialize, Serialize};

/// A witness pair, base64-encoded scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcWitness {
    pub invocation: String,
    pub verification: String,
}

/// A signer with its scopes in textual form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSigner {
    pub account: String,
    pub scopes: String,
    #[serde(default, rename = "allowedcontracts")]
    pub allowed_contracts: Vec<String>,
    #[serde(default, rename = "allowedgroups")]
    pub allowed_groups: Vec<String>,
}

/// A transaction as returned by `getrawtransaction` with `verbose = 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTransaction {
    pub hash: String,
    pub size: u32,
    pub version: u8,
    pub nonce: u32,
    pub sender: Option<String>,
    #[serde(rename = "sysfee")]
    pub system_fee: String,
    #[serde(rename = "netfee")]
    pub network_fee: String,
    #[serde(rename = "validuntilblock")]
    pub valid_until_block: u32,
    pub signers: Vec<RpcSigner>,
    pub script: String,
    pub witnesses: Vec<RpcWitness>,
    #[serde(default)]
    pub confirmations: Option<u32>,
    #[serde(default, rename = "blockhash")]
    pub block_hash: Option<String>,
    #[serde(default, rename = "blocktime")]
    pub block_time: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_verbose_transaction() {
        let raw = r#"{
            "hash": "0x2c5e3a84f892d1d6b0c7d9e9fbd1d39b24f13372f8dbc4be95b9c9a745a9f5b2",
            "size": 52,
            "version": 0,
            "nonce": 42,
            "sender": "NKuyBkoGdZZSLyPbJEetheRhMjeznFZszf",
            "sysfee": "100",
            "netfee": "200",
            "validuntilblock": 1000,
            "signers": [{"account": "0x0000000000000000000000000000000000000000", "scopes": "CalledByEntry"}],
            "script": "QA==",
            "witnesses": []
        }"#;
        let transaction: RpcTransaction = serde_json::from_str(raw).unwrap();
        assert_eq!(transaction.nonce, 42);
        assert_eq!(transaction.system_fee, "100");
        assert_eq!(transaction.signers[0].scopes, "CalledByEntry");
    }
}
