//! Native contracts: in-process contracts at reserved negative ids.

mod contract_management;
mod fungible_token;
mod gas_token;
mod ledger_contract;
mod neo_token;
mod oracle_contract;
mod policy_contract;
mod role_management;

pub use contract_management::ContractManagement;
pub use gas_token::GasToken;
pub use ledger_contract::LedgerContract;
pub use neo_token::NeoToken;
pub use oracle_contract::OracleContract;
pub use policy_contract::{PolicyContract, DEFAULT_FEE_PER_BYTE};
pub use role_management::{Role, RoleManagement};

use crate::application_engine::ApplicationEngine;
use crate::contract_state::{contract_hash, ContractState, NefFile};
use crate::manifest::{ContractManifest, ContractMethod};
use crate::ContractResult;
use neo3_core::UInt160;
use neo3_vm::{CallFlags, StackItem};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata of a native method, dispatched through the same flat surface
/// as user contracts.
#[derive(Debug, Clone)]
pub struct NativeMethod {
    pub name: &'static str,
    /// Base price, multiplied by the execution fee factor.
    pub price: i64,
    pub required_call_flags: CallFlags,
    pub parameters: usize,
    pub safe: bool,
}

impl NativeMethod {
    /// A read-only method.
    pub fn safe(name: &'static str, price: i64, parameters: usize) -> Self {
        Self {
            name,
            price,
            required_call_flags: CallFlags::READ_STATES,
            parameters,
            safe: true,
        }
    }

    /// A state-mutating method.
    pub fn unsafe_method(name: &'static str, price: i64, parameters: usize) -> Self {
        Self {
            name,
            price,
            required_call_flags: CallFlags::STATES,
            parameters,
            safe: false,
        }
    }
}

/// A native contract.
///
/// Natives see the same DAO layer and gas accounting as deployed contracts
/// but dispatch through direct procedure calls.
pub trait NativeContract: Send + Sync {
    /// The manifest name.
    fn name(&self) -> &str;

    /// The reserved negative id.
    fn id(&self) -> i32;

    /// The script hash derived from the name.
    fn hash(&self) -> UInt160;

    /// The callable method table.
    fn methods(&self) -> &[NativeMethod];

    /// Invokes `method` with `args` popped from the caller's stack.
    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: Vec<StackItem>,
    ) -> ContractResult<Option<StackItem>>;

    /// Runs before a block's transactions under the OnPersist trigger.
    fn on_persist(&self, _engine: &mut ApplicationEngine) -> ContractResult<()> {
        Ok(())
    }

    /// Runs after a block's transactions under the PostPersist trigger.
    fn post_persist(&self, _engine: &mut ApplicationEngine) -> ContractResult<()> {
        Ok(())
    }

    /// The contract state registered in the DAO at activation height.
    fn contract_state(&self) -> ContractResult<ContractState> {
        let nef = NefFile::new("neo-core".to_string(), String::new(), vec![0x40])?;
        let mut manifest = ContractManifest::new(self.name());
        manifest.abi.methods = self
            .methods()
            .iter()
            .map(|m| ContractMethod {
                name: m.name.to_string(),
                offset: 0,
                parameters: m.parameters,
                return_value: true,
                safe: m.safe,
            })
            .collect();
        Ok(ContractState {
            id: self.id(),
            update_counter: 0,
            hash: self.hash(),
            nef,
            manifest,
        })
    }
}

/// Derives a native contract hash from its name.
pub fn native_hash(name: &str) -> UInt160 {
    contract_hash(&UInt160::zero(), 0, name)
}

/// The set of native contracts, shared across every engine of a node.
///
/// Cloning is cheap and preserves identity: the in-memory caches of the
/// role-management contract stay shared.
#[derive(Clone)]
pub struct NativeRegistry {
    contracts: Vec<Arc<dyn NativeContract>>,
    by_hash: HashMap<UInt160, Arc<dyn NativeContract>>,
    pub management: Arc<ContractManagement>,
    pub ledger: Arc<LedgerContract>,
    pub neo: Arc<NeoToken>,
    pub gas: Arc<GasToken>,
    pub policy: Arc<PolicyContract>,
    pub role_management: Arc<RoleManagement>,
    pub oracle: Arc<OracleContract>,
}

impl NativeRegistry {
    /// Builds the registry.
    pub fn new() -> Self {
        let management = Arc::new(ContractManagement::new());
        let ledger = Arc::new(LedgerContract::new());
        let neo = Arc::new(NeoToken::new());
        let gas = Arc::new(GasToken::new());
        let policy = Arc::new(PolicyContract::new());
        let role_management = Arc::new(RoleManagement::new());
        let oracle = Arc::new(OracleContract::new());

        let contracts: Vec<Arc<dyn NativeContract>> = vec![
            management.clone(),
            ledger.clone(),
            neo.clone(),
            gas.clone(),
            policy.clone(),
            role_management.clone(),
            oracle.clone(),
        ];
        let by_hash = contracts
            .iter()
            .map(|c| (c.hash(), c.clone()))
            .collect();
        Self {
            contracts,
            by_hash,
            management,
            ledger,
            neo,
            gas,
            policy,
            role_management,
            oracle,
        }
    }

    /// All natives in registration order.
    pub fn contracts(&self) -> &[Arc<dyn NativeContract>] {
        &self.contracts
    }

    /// Looks up a native by script hash.
    pub fn by_hash(&self, hash: &UInt160) -> Option<Arc<dyn NativeContract>> {
        self.by_hash.get(hash).cloned()
    }

    /// Whether `hash` is a native contract.
    pub fn is_native(&self, hash: &UInt160) -> bool {
        self.by_hash.contains_key(hash)
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_reserved_ids() {
        let registry = NativeRegistry::new();
        let ids: Vec<i32> = registry.contracts().iter().map(|c| c.id()).collect();
        assert!(ids.contains(&-1));
        assert!(ids.contains(&-8));
        // Ids are unique.
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn hashes_resolve_back() {
        let registry = NativeRegistry::new();
        for contract in registry.contracts() {
            assert!(registry.is_native(&contract.hash()));
            assert_eq!(
                registry.by_hash(&contract.hash()).unwrap().name(),
                contract.name()
            );
        }
    }
}
