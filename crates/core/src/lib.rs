//! Core data model for the Neo N3 node.
//!
//! Defines the fixed-width hash types, transactions with their signers,
//! attributes and witnesses, block headers, and the extensible payload
//! envelope used for state-root and consensus traffic.

mod attributes;
mod block;
mod error;
mod extensible;
mod signer;
mod transaction;
mod uint160;
mod uint256;
mod witness;
mod witness_scope;

pub use attributes::{AttributeType, OracleResponseCode, TransactionAttribute};
pub use block::{Block, Header};
pub use error::{CoreError, CoreResult};
pub use extensible::ExtensiblePayload;
pub use signer::Signer;
pub use transaction::Transaction;
pub use uint160::{UInt160, UINT160_SIZE};
pub use uint256::{UInt256, UINT256_SIZE};
pub use witness::Witness;
pub use witness_scope::WitnessScope;
