//! Rust implementation of the Neo N3 full node core.
//!
//! This crate re-exports the subsystem crates that make up the node:
//! the blockchain state machine, the memory pool, the NeoVM, the native
//! contracts, the Merkle-Patricia state trie and the persistence layer.
//!
//! External collaborators (the P2P transport, the JSON-RPC server, the CLI
//! and the wallet) consume this crate through the interfaces exposed by
//! [`ledger`] and [`persistence`].

pub use neo3_config as config;
pub use neo3_core as core;
pub use neo3_cryptography as cryptography;
pub use neo3_io as io;
pub use neo3_ledger as ledger;
pub use neo3_mpt_trie as mpt_trie;
pub use neo3_persistence as persistence;
pub use neo3_rpc_client as rpc_client;
pub use neo3_smart_contract as smart_contract;
pub use neo3_vm as vm;

pub use neo3_config::ProtocolSettings;
pub use neo3_core::{Block, Header, Transaction, UInt160, UInt256};
pub use neo3_ledger::{Blockchain, Mempool, StateRootService};
pub use neo3_vm::{ExecutionEngine, StackItem, VMState};
