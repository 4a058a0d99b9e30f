//! Verbose block models.

use super::rpc_transaction::{RpcTransaction, RpcWitness};
use serde::{Deserialize, Serialize};

/// A block header as returned by `getblockheader` with `verbose = 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBlockHeader {
    pub hash: String,
    pub size: u32,
    pub version: u32,
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: String,
    #[serde(rename = "merkleroot")]
    pub merkle_root: String,
    pub time: u64,
    pub nonce: String,
    pub index: u32,
    pub primary: u8,
    #[serde(rename = "nextconsensus")]
    pub next_consensus: String,
    pub witnesses: Vec<RpcWitness>,
    #[serde(default)]
    pub confirmations: Option<u32>,
    #[serde(default, rename = "nextblockhash")]
    pub next_block_hash: Option<String>,
}

/// A block as returned by `getblock` with `verbose = 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBlock {
    #[serde(flatten)]
    pub header: RpcBlockHeader,
    #[serde(default)]
    pub tx: Vec<RpcTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_verbose_block() {
        let raw = r#"{
            "hash": "0x1f4d1defa46faa5e7b9b8d3f79a06bec777d7c26c4aa5f6f5899a291daa87c15",
            "size": 114,
            "version": 0,
            "previousblockhash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "merkleroot": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "time": 1468595301000,
            "nonce": "7C2BAC1D",
            "index": 0,
            "primary": 0,
            "nextconsensus": "NKuyBkoGdZZSLyPbJEetheRhMjeznFZszf",
            "witnesses": [{"invocation": "", "verification": "EQ=="}],
            "tx": []
        }"#;
        let block: RpcBlock = serde_json::from_str(raw).unwrap();
        assert_eq!(block.header.index, 0);
        assert_eq!(block.header.witnesses.len(), 1);
        assert!(block.tx.is_empty());
    }
}
