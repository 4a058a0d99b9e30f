//! Application engine, interop services and native contracts.
//!
//! The [`ApplicationEngine`] wraps the VM with triggers, the DAO layer of
//! the executing transaction and the interop dispatch; the native contracts
//! are in-process contracts at reserved negative ids reached through the
//! same dispatch surface as deployed ones.

mod application_engine;
mod contract_state;
mod error;
pub mod interop;
mod manifest;
pub mod native;
#[cfg(test)]
pub(crate) mod test_support;

pub use application_engine::{
    committee_address, ApplicationEngine, ApplicationExecResult, NotifyEvent, TriggerType,
};
pub use contract_state::{contract_hash, ContractState, NefFile};
pub use error::{ContractError, ContractResult};
pub use manifest::{ContractAbi, ContractGroup, ContractManifest, ContractMethod, ContractPermission};
pub use native::{NativeContract, NativeRegistry};
