//! The typed method surface of [`RpcClient`].

use crate::models::{
    RpcBlock, RpcBlockHeader, RpcContractState, RpcInvokeResult, RpcNetworkFee, RpcSendResult,
    RpcStateRoot, RpcValidateAddressResult, RpcVersion,
};
use crate::{RpcClient, RpcResult};
use serde_json::{json, Value};

impl RpcClient {
    /// Gets the node and protocol versions.
    pub async fn get_version(&self) -> RpcResult<RpcVersion> {
        self.call("getversion", json!([])).await
    }

    /// Gets the current block count (height + 1).
    pub async fn get_block_count(&self) -> RpcResult<u32> {
        self.call("getblockcount", json!([])).await
    }

    /// Gets the hash of the block at `index`.
    pub async fn get_block_hash(&self, index: u32) -> RpcResult<String> {
        self.call("getblockhash", json!([index])).await
    }

    /// Gets a block by index, verbose.
    pub async fn get_block_by_index(&self, index: u32) -> RpcResult<RpcBlock> {
        self.call("getblock", json!([index, 1])).await
    }

    /// Gets a block by hash, verbose.
    pub async fn get_block_by_hash(&self, hash: &str) -> RpcResult<RpcBlock> {
        self.call("getblock", json!([hash, 1])).await
    }

    /// Gets the raw base64 encoding of a block.
    pub async fn get_block_raw(&self, hash: &str) -> RpcResult<String> {
        self.call("getblock", json!([hash, 0])).await
    }

    /// Gets a block header by hash, verbose.
    pub async fn get_block_header(&self, hash: &str) -> RpcResult<RpcBlockHeader> {
        self.call("getblockheader", json!([hash, 1])).await
    }

    /// Gets a transaction, verbose.
    pub async fn get_raw_transaction(
        &self,
        hash: &str,
    ) -> RpcResult<crate::models::RpcTransaction> {
        self.call("getrawtransaction", json!([hash, 1])).await
    }

    /// Gets the raw base64 encoding of a transaction.
    pub async fn get_raw_transaction_raw(&self, hash: &str) -> RpcResult<String> {
        self.call("getrawtransaction", json!([hash, 0])).await
    }

    /// Gets the height at which a transaction was included.
    pub async fn get_transaction_height(&self, hash: &str) -> RpcResult<u32> {
        self.call("gettransactionheight", json!([hash])).await
    }

    /// Gets the state of a deployed contract.
    pub async fn get_contract_state(&self, hash: &str) -> RpcResult<RpcContractState> {
        self.call("getcontractstate", json!([hash])).await
    }

    /// Gets a contract storage item; key and result are base64.
    pub async fn get_storage(&self, contract: &str, key: &str) -> RpcResult<String> {
        self.call("getstorage", json!([contract, key])).await
    }

    /// Relays a signed transaction, base64-encoded.
    pub async fn send_raw_transaction(&self, raw: &str) -> RpcResult<RpcSendResult> {
        self.call("sendrawtransaction", json!([raw])).await
    }

    /// Relays a signed block, base64-encoded.
    pub async fn submit_block(&self, raw: &str) -> RpcResult<RpcSendResult> {
        self.call("submitblock", json!([raw])).await
    }

    /// Test-invokes a contract method.
    pub async fn invoke_function(
        &self,
        contract: &str,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<RpcInvokeResult> {
        self.call("invokefunction", json!([contract, method, params]))
            .await
    }

    /// Test-invokes a raw script, base64-encoded.
    pub async fn invoke_script(&self, script: &str) -> RpcResult<RpcInvokeResult> {
        self.call("invokescript", json!([script])).await
    }

    /// Gets the state root of a height.
    pub async fn get_state_root(&self, index: u32) -> RpcResult<RpcStateRoot> {
        self.call("getstateroot", json!([index])).await
    }

    /// Gets the hashes of the pooled transactions.
    pub async fn get_raw_mempool(&self) -> RpcResult<Vec<String>> {
        self.call("getrawmempool", json!([])).await
    }

    /// Validates an address.
    pub async fn validate_address(&self, address: &str) -> RpcResult<RpcValidateAddressResult> {
        self.call("validateaddress", json!([address])).await
    }

    /// Computes the network fee of a serialized transaction.
    pub async fn calculate_network_fee(&self, raw: &str) -> RpcResult<RpcNetworkFee> {
        self.call("calculatenetworkfee", json!([raw])).await
    }
}
