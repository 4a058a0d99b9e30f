//! The `getstateroot` model.

use super::rpc_transaction::RpcWitness;
use serde::{Deserialize, Serialize};

/// A per-height state root, witnessed once the validators signed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcStateRoot {
    pub version: u8,
    pub index: u32,
    #[serde(rename = "roothash")]
    pub root_hash: String,
    #[serde(default)]
    pub witnesses: Vec<RpcWitness>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_state_root() {
        let raw = r#"{
            "version": 0,
            "index": 160,
            "roothash": "0x1d1a1b2e1e3cb1a9b1e92e1c3b1a9b1e92e1c3b1a9b1e92e1c3b1a9b1e92e1c3",
            "witnesses": []
        }"#;
        let root: RpcStateRoot = serde_json::from_str(raw).unwrap();
        assert_eq!(root.index, 160);
        assert!(root.witnesses.is_empty());
    }
}
