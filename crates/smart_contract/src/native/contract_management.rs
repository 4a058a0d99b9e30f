//! The ContractManagement native contract.

use super::{native_hash, NativeContract, NativeMethod};
use crate::application_engine::ApplicationEngine;
use crate::contract_state::{contract_hash, ContractState, NefFile};
use crate::manifest::ContractManifest;
use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_vm::StackItem;
use tracing::info;

const PREFIX_NEXT_ID: u8 = 0x0C;

/// Deploys, updates and destroys contracts. Contract states mutate only
/// through this surface, inside an executing transaction.
pub struct ContractManagement {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl ContractManagement {
    pub const ID: i32 = -1;
    pub const NAME: &'static str = "ContractManagement";

    pub fn new() -> Self {
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::safe("getContract", 1 << 15, 1),
                NativeMethod::unsafe_method("deploy", 1 << 15, 2),
                NativeMethod::unsafe_method("update", 1 << 15, 2),
                NativeMethod::unsafe_method("destroy", 1 << 15, 0),
            ],
        }
    }

    fn next_id(engine: &mut ApplicationEngine) -> ContractResult<i32> {
        let current = match engine.dao().get_storage_item(Self::ID, &[PREFIX_NEXT_ID])? {
            Some(bytes) if bytes.len() == 4 => {
                i32::from_le_bytes(bytes.try_into().expect("length checked"))
            }
            _ => 0,
        };
        let next = current + 1;
        engine.dao_mut().put_storage_item(
            Self::ID,
            &[PREFIX_NEXT_ID],
            next.to_le_bytes().to_vec(),
        );
        Ok(next)
    }

    fn parse_nef(bytes: &[u8]) -> ContractResult<NefFile> {
        let nef: NefFile =
            serde_json::from_slice(bytes).map_err(|e| ContractError::InvalidNef(e.to_string()))?;
        nef.validate()?;
        Ok(nef)
    }

    fn parse_manifest(bytes: &[u8]) -> ContractResult<ContractManifest> {
        serde_json::from_slice(bytes).map_err(|e| ContractError::InvalidManifest(e.to_string()))
    }

    /// Deploys a new contract on behalf of the transaction sender.
    pub fn deploy(
        &self,
        engine: &mut ApplicationEngine,
        nef_bytes: &[u8],
        manifest_bytes: &[u8],
    ) -> ContractResult<ContractState> {
        let sender = engine
            .container()
            .map(|t| t.sender())
            .ok_or_else(|| ContractError::native("deploy outside a transaction"))?;
        let nef = Self::parse_nef(nef_bytes)?;
        let manifest = Self::parse_manifest(manifest_bytes)?;
        let hash = contract_hash(&sender, nef.checksum, &manifest.name);
        manifest.validate(&hash)?;
        if engine.dao().get_contract(&hash)?.is_some() {
            return Err(ContractError::native(format!(
                "contract {hash} already deployed"
            )));
        }
        // Deployment is charged by the byte over the storage price.
        let size_fee = (nef_bytes.len() + manifest_bytes.len()) as i64;
        engine.vm().add_fee(size_fee)?;

        let state = ContractState {
            id: Self::next_id(engine)?,
            update_counter: 0,
            hash,
            nef,
            manifest,
        };
        engine
            .dao_mut()
            .put_contract(&hash, state.id, state.to_bytes()?);
        engine.emit_event(self.hash, "Deploy", vec![hash.to_string()]);
        info!(contract = %hash, id = state.id, "contract deployed");
        Ok(state)
    }
}

impl Default for ContractManagement {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for ContractManagement {
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
            "getContract" => {
                let hash = UInt160::from_bytes(
                    &args
                        .first()
                        .ok_or_else(|| ContractError::native("missing hash"))?
                        .try_bytes()?,
                )?;
                match engine.contract_state(&hash)? {
                    Some(state) => Ok(Some(StackItem::struct_of(vec![
                        StackItem::from_int(state.id as i64),
                        StackItem::from_int(state.update_counter as i64),
                        StackItem::from_bytes(state.hash.to_vec()),
                        StackItem::from_bytes(state.manifest.name.into_bytes()),
                    ]))),
                    None => Ok(Some(StackItem::Null)),
                }
            }
            "deploy" => {
                let nef_bytes = args
                    .first()
                    .ok_or_else(|| ContractError::native("missing nef"))?
                    .try_bytes()?;
                let manifest_bytes = args
                    .get(1)
                    .ok_or_else(|| ContractError::native("missing manifest"))?
                    .try_bytes()?;
                let state = self.deploy(engine, &nef_bytes, &manifest_bytes)?;
                Ok(Some(StackItem::from_bytes(state.hash.to_vec())))
            }
            "update" => {
                // Only a contract may update itself.
                let current = engine
                    .vm()
                    .current_context()
                    .map(|c| c.script_hash)
                    .map_err(ContractError::from)?;
                let mut state = engine
                    .contract_state(&current)?
                    .ok_or_else(|| ContractError::ContractNotFound(current.to_string()))?;
                let nef_bytes = args
                    .first()
                    .ok_or_else(|| ContractError::native("missing nef"))?
                    .try_bytes()?;
                let manifest_bytes = args
                    .get(1)
                    .ok_or_else(|| ContractError::native("missing manifest"))?
                    .try_bytes()?;
                state.nef = Self::parse_nef(&nef_bytes)?;
                let manifest = Self::parse_manifest(&manifest_bytes)?;
                manifest.validate(&state.hash)?;
                state.manifest = manifest;
                state.update_counter += 1;
                engine
                    .dao_mut()
                    .put_contract(&current, state.id, state.to_bytes()?);
                engine.emit_event(self.hash, "Update", vec![current.to_string()]);
                Ok(None)
            }
            "destroy" => {
                let current = engine
                    .vm()
                    .current_context()
                    .map(|c| c.script_hash)
                    .map_err(ContractError::from)?;
                if let Some(state) = engine.contract_state(&current)? {
                    // Remove the state and every storage item of the
                    // contract.
                    let items = engine.dao().find_storage(state.id, &[])?;
                    for (key, _) in items {
                        engine.dao_mut().delete_storage_item(state.id, &key);
                    }
                    engine.dao_mut().delete_contract(&current, state.id);
                    engine.emit_event(self.hash, "Destroy", vec![current.to_string()]);
                }
                Ok(None)
            }
            other => Err(ContractError::MethodNotFound(format!(
                "ContractManagement.{other}"
            ))),
        }
    }
}
