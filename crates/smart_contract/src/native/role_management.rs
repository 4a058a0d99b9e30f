//! The RoleManagement (Designate) contract.
//!
//! Keeps, per role, a history of designated public-key lists keyed by the
//! height at which each list becomes effective. A designation made while
//! block `h` executes takes effect at `h + 1`.

use super::{native_hash, NativeContract, NativeMethod};
use crate::application_engine::ApplicationEngine;
use crate::{ContractError, ContractResult};
use neo3_config::MAX_NODE_COUNT;
use neo3_core::UInt160;
use neo3_cryptography::{multisig_redeem_script, ECPoint};
use neo3_persistence::DataCache;
use neo3_vm::StackItem;
use num_traits::ToPrimitive;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Designated roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    StateValidator = 4,
    Oracle = 8,
    NeoFSAlphabetNode = 16,
    P2PNotary = 32,
}

impl Role {
    /// Decodes a role byte.
    pub fn from_u8(value: u8) -> Option<Role> {
        match value {
            4 => Some(Role::StateValidator),
            8 => Some(Role::Oracle),
            16 => Some(Role::NeoFSAlphabetNode),
            32 => Some(Role::P2PNotary),
            _ => None,
        }
    }
}

/// The RoleManagement native contract.
pub struct RoleManagement {
    hash: UInt160,
    methods: Vec<NativeMethod>,
    /// Set inside the commit critical section when a designation landed;
    /// the post-persist pass consumes it.
    roles_changed: AtomicBool,
    /// Script hash of the oracle multisig account, recomputed after each
    /// designation of the Oracle role.
    oracle_hash: RwLock<Option<UInt160>>,
}

impl RoleManagement {
    pub const ID: i32 = -8;
    pub const NAME: &'static str = "RoleManagement";

    pub fn new() -> Self {
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::safe("getDesignatedByRole", 1 << 15, 2),
                NativeMethod::unsafe_method("designateAsRole", 1 << 15, 2),
            ],
            roles_changed: AtomicBool::new(false),
            oracle_hash: RwLock::new(None),
        }
    }

    /// Storage key of one designation record: role byte, then the
    /// effective height big-endian so records sort by height.
    fn key(role: Role, index: u32) -> Vec<u8> {
        let mut key = Vec::with_capacity(5);
        key.push(role as u8);
        key.extend_from_slice(&index.to_be_bytes());
        key
    }

    fn serialize_nodes(nodes: &[ECPoint]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + nodes.len() * 33);
        bytes.push(nodes.len() as u8);
        for node in nodes {
            bytes.extend_from_slice(node.as_bytes());
        }
        bytes
    }

    fn deserialize_nodes(bytes: &[u8]) -> ContractResult<Vec<ECPoint>> {
        let count = *bytes
            .first()
            .ok_or_else(|| ContractError::Storage("empty designation record".to_string()))?
            as usize;
        if bytes.len() != 1 + count * 33 {
            return Err(ContractError::Storage(
                "designation record malformed".to_string(),
            ));
        }
        let mut nodes = Vec::with_capacity(count);
        for chunk in bytes[1..].chunks_exact(33) {
            nodes.push(ECPoint::from_bytes(chunk)?);
        }
        Ok(nodes)
    }

    /// Returns the list effective at `index`: the record with the greatest
    /// stored height not exceeding it.
    pub fn designated_by_role(
        dao: &DataCache,
        role: Role,
        index: u32,
    ) -> ContractResult<Vec<ECPoint>> {
        let mut best: Option<(u32, Vec<u8>)> = None;
        for (key, value) in dao.find_storage(Self::ID, &[role as u8])? {
            if key.len() != 5 {
                continue;
            }
            let height = u32::from_be_bytes(key[1..5].try_into().expect("length checked"));
            if height <= index && best.as_ref().map(|(h, _)| height >= *h).unwrap_or(true) {
                best = Some((height, value));
            }
        }
        match best {
            Some((_, value)) => Self::deserialize_nodes(&value),
            None => Ok(Vec::new()),
        }
    }

    /// Designates `nodes` for `role`, effective from the next block.
    pub fn designate_as_role(
        &self,
        engine: &mut ApplicationEngine,
        role: Role,
        mut nodes: Vec<ECPoint>,
    ) -> ContractResult<()> {
        if nodes.is_empty() || nodes.len() > MAX_NODE_COUNT {
            return Err(ContractError::native(format!(
                "designation of {} nodes",
                nodes.len()
            )));
        }
        if !engine.check_committee()? {
            return Err(ContractError::WitnessFailed(
                "committee witness required".to_string(),
            ));
        }
        let effective = engine.current_height()? + 1;
        let key = Self::key(role, effective);
        if engine.dao().get_storage_item(Self::ID, &key)?.is_some() {
            return Err(ContractError::native(format!(
                "role {role:?} already designated at {effective}"
            )));
        }
        nodes.sort();
        nodes.dedup();
        engine
            .dao_mut()
            .put_storage_item(Self::ID, &key, Self::serialize_nodes(&nodes));
        self.roles_changed.store(true, Ordering::Release);
        engine.emit_event(
            self.hash,
            "Designation",
            vec![(role as u8).to_string(), effective.to_string()],
        );
        info!(?role, effective, count = nodes.len(), "role designated");
        Ok(())
    }

    /// Writes a designation record directly, bypassing the witness check.
    /// Used when bootstrapping genesis state from the configuration.
    pub fn record_designation(
        dao: &mut DataCache,
        role: Role,
        index: u32,
        nodes: &[ECPoint],
    ) -> ContractResult<()> {
        if nodes.is_empty() || nodes.len() > MAX_NODE_COUNT {
            return Err(ContractError::native(format!(
                "designation of {} nodes",
                nodes.len()
            )));
        }
        let mut sorted = nodes.to_vec();
        sorted.sort();
        sorted.dedup();
        dao.put_storage_item(
            Self::ID,
            &Self::key(role, index),
            Self::serialize_nodes(&sorted),
        );
        Ok(())
    }

    /// The cached oracle multisig account hash, if any oracle set exists.
    pub fn oracle_hash(&self) -> Option<UInt160> {
        *self.oracle_hash.read()
    }

    /// Recomputes the oracle hash from the set effective at `height`.
    /// The multisig threshold is a simple majority of the oracle nodes.
    fn refresh_oracle_hash(&self, dao: &DataCache, height: u32) -> ContractResult<()> {
        let oracles = Self::designated_by_role(dao, Role::Oracle, height)?;
        let hash = if oracles.is_empty() {
            None
        } else {
            let m = oracles.len() / 2 + 1;
            let script = multisig_redeem_script(m, &oracles)?;
            Some(UInt160::from_script(&script))
        };
        *self.oracle_hash.write() = hash;
        Ok(())
    }
}

impl Default for RoleManagement {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for RoleManagement {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        Self::ID
    }

    fn hash(&self) -> UInt160 {
        self.hash
    }

    fn methods(&self) -> &[NativeMethod] {
        &self.methods
    }

    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: Vec<StackItem>,
    ) -> ContractResult<Option<StackItem>> {
        match method {
            "getDesignatedByRole" => {
                let role_byte = args
                    .first()
                    .ok_or_else(|| ContractError::native("missing role"))?
                    .try_integer()?
                    .to_u8()
                    .ok_or_else(|| ContractError::native("role out of range"))?;
                let role = Role::from_u8(role_byte)
                    .ok_or_else(|| ContractError::native(format!("invalid role {role_byte}")))?;
                let index = args
                    .get(1)
                    .ok_or_else(|| ContractError::native("missing index"))?
                    .try_integer()?
                    .to_u32()
                    .ok_or_else(|| ContractError::native("index out of range"))?;
                if index > engine.current_height()? + 1 {
                    return Err(ContractError::native(format!(
                        "index {index} is in the future"
                    )));
                }
                let nodes = Self::designated_by_role(engine.dao(), role, index)?;
                let items = nodes
                    .iter()
                    .map(|n| StackItem::from_bytes(n.as_bytes().to_vec()))
                    .collect();
                Ok(Some(StackItem::array_of(items)))
            }
            "designateAsRole" => {
                let role_byte = args
                    .first()
                    .ok_or_else(|| ContractError::native("missing role"))?
                    .try_integer()?
                    .to_u8()
                    .ok_or_else(|| ContractError::native("role out of range"))?;
                let role = Role::from_u8(role_byte)
                    .ok_or_else(|| ContractError::native(format!("invalid role {role_byte}")))?;
                let nodes = match args.get(1) {
                    Some(StackItem::Array(items)) => items
                        .borrow()
                        .iter()
                        .map(|item| Ok(ECPoint::from_bytes(&item.try_bytes()?)?))
                        .collect::<ContractResult<Vec<ECPoint>>>()?,
                    _ => return Err(ContractError::native("nodes must be an array")),
                };
                self.designate_as_role(engine, role, nodes)?;
                Ok(None)
            }
            other => Err(ContractError::MethodNotFound(format!(
                "RoleManagement.{other}"
            ))),
        }
    }

    /// After a block persists, refresh the oracle account if any role
    /// changed during the block.
    fn post_persist(&self, engine: &mut ApplicationEngine) -> ContractResult<()> {
        if self.roles_changed.swap(false, Ordering::AcqRel) {
            let height = engine.current_height()? + 1;
            self.refresh_oracle_hash(engine.dao(), height)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{application_engine, committee_settings, memory_dao, signed_container};
    use neo3_cryptography::KeyPair;

    fn engine_at(height: u32) -> (crate::ApplicationEngine, RoleManagement) {
        let (settings, _, committee) = committee_settings();
        let engine = application_engine(
            settings,
            memory_dao(),
            Some(signed_container(committee)),
            height,
        );
        (engine, RoleManagement::new())
    }

    #[test]
    fn designation_history_resolves_by_floor() {
        let (mut engine, contract) = engine_at(5);
        let p1 = KeyPair::generate().public_key();
        let p2 = KeyPair::generate().public_key();

        contract
            .designate_as_role(&mut engine, Role::Oracle, vec![p1])
            .unwrap();
        // Advance the committed tip to height 10 and designate again.
        engine
            .dao_mut()
            .set_current_block(&neo3_core::UInt256::from_array([0xAB; 32]), 10);
        contract
            .designate_as_role(&mut engine, Role::Oracle, vec![p1, p2])
            .unwrap();

        let at_7 = RoleManagement::designated_by_role(engine.dao(), Role::Oracle, 7).unwrap();
        assert_eq!(at_7, vec![p1]);

        let mut expected = vec![p1, p2];
        expected.sort();
        let at_11 = RoleManagement::designated_by_role(engine.dao(), Role::Oracle, 11).unwrap();
        assert_eq!(at_11, expected);

        // Nothing was designated for other roles.
        assert!(
            RoleManagement::designated_by_role(engine.dao(), Role::StateValidator, 11)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn redesignation_at_same_height_rejected() {
        let (mut engine, contract) = engine_at(5);
        let p1 = KeyPair::generate().public_key();
        contract
            .designate_as_role(&mut engine, Role::Oracle, vec![p1])
            .unwrap();
        let err = contract
            .designate_as_role(&mut engine, Role::Oracle, vec![p1])
            .unwrap_err();
        assert!(err.to_string().contains("already designated"));
    }

    #[test]
    fn designation_requires_committee_witness() {
        let (settings, _, _) = committee_settings();
        let mut engine = application_engine(settings, memory_dao(), None, 5);
        let contract = RoleManagement::new();
        let p1 = KeyPair::generate().public_key();
        assert!(matches!(
            contract.designate_as_role(&mut engine, Role::Oracle, vec![p1]),
            Err(crate::ContractError::WitnessFailed(_))
        ));
    }

    #[test]
    fn designated_list_is_sorted() {
        let (mut engine, contract) = engine_at(0);
        let mut keys: Vec<_> = (0..4).map(|_| KeyPair::generate().public_key()).collect();
        contract
            .designate_as_role(&mut engine, Role::StateValidator, keys.clone())
            .unwrap();
        keys.sort();
        assert_eq!(
            RoleManagement::designated_by_role(engine.dao(), Role::StateValidator, 1).unwrap(),
            keys
        );
    }

    #[test]
    fn node_count_bounds() {
        let (mut engine, contract) = engine_at(0);
        assert!(contract
            .designate_as_role(&mut engine, Role::Oracle, Vec::new())
            .is_err());
        let too_many: Vec<_> = (0..33).map(|_| KeyPair::generate().public_key()).collect();
        assert!(contract
            .designate_as_role(&mut engine, Role::Oracle, too_many)
            .is_err());
    }

    #[test]
    fn oracle_hash_refreshes_after_designation() {
        let (mut engine, contract) = engine_at(0);
        assert!(contract.oracle_hash().is_none());
        let p1 = KeyPair::generate().public_key();
        contract
            .designate_as_role(&mut engine, Role::Oracle, vec![p1])
            .unwrap();
        contract.post_persist(&mut engine).unwrap();
        assert!(contract.oracle_hash().is_some());
        // Consumed the flag: a second pass with no change keeps the hash.
        let first = contract.oracle_hash();
        contract.post_persist(&mut engine).unwrap();
        assert_eq!(contract.oracle_hash(), first);
    }
}
