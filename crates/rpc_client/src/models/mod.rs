//! Response models of the node's JSON-RPC surface.

mod rpc_block;
mod rpc_invoke_result;
mod rpc_misc;
mod rpc_state_root;
mod rpc_transaction;

pub use rpc_block::{RpcBlock, RpcBlockHeader};
pub use rpc_invoke_result::{RpcInvokeResult, RpcNotification, RpcStackItem};
pub use rpc_misc::{
    RpcContractState, RpcNetworkFee, RpcSendResult, RpcValidateAddressResult, RpcVersion,
    RpcVersionProtocol,
};
pub use rpc_state_root::RpcStateRoot;
pub use rpc_transaction::{RpcSigner, RpcTransaction, RpcWitness};
