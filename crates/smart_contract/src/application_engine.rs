//! The application engine: the VM plus everything the host provides.

use crate::interop::{self, Syscall, CHECKSIG_PRICE};
use crate::native::NativeRegistry;
use crate::{ContractError, ContractResult, ContractState};
use neo3_config::ProtocolSettings;
use neo3_core::{Block, Transaction, UInt160, WitnessScope};
use neo3_cryptography::{multisig_redeem_script, signature_redeem_script, ECPoint};
use neo3_persistence::DataCache;
use neo3_vm::{
    CallFlags, ExecutionEngine, InteropInterface, Script, StackItem, StepResult, VMState,
};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// The execution mode, selecting allowed behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TriggerType {
    OnPersist = 0x01,
    PostPersist = 0x02,
    Verification = 0x20,
    Application = 0x40,
}

/// A notification raised by a contract through `System.Runtime.Notify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyEvent {
    pub contract: UInt160,
    pub name: String,
    pub state: Vec<String>,
}

/// The persisted outcome of executing one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationExecResult {
    pub trigger: TriggerType,
    pub vm_state: String,
    pub gas_consumed: i64,
    pub exception: Option<String>,
    pub stack: Vec<String>,
    pub notifications: Vec<NotifyEvent>,
}

impl ApplicationExecResult {
    /// Serializes for the DAO.
    pub fn to_bytes(&self) -> ContractResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ContractError::Storage(e.to_string()))
    }

    /// Deserializes from the DAO.
    pub fn from_bytes(bytes: &[u8]) -> ContractResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ContractError::Storage(e.to_string()))
    }

    /// Whether execution halted cleanly.
    pub fn halted(&self) -> bool {
        self.vm_state == "HALT"
    }
}

/// A storage context handed to scripts, scoping them to their contract id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageContext {
    pub id: i32,
    pub read_only: bool,
}

impl InteropInterface for StorageContext {
    fn interface_type(&self) -> &str {
        "StorageContext"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// The VM wrapped with triggers, the DAO layer of the executing
/// transaction, the interop dispatch and the native registry.
pub struct ApplicationEngine {
    engine: ExecutionEngine,
    trigger: TriggerType,
    dao: DataCache,
    settings: Arc<ProtocolSettings>,
    container: Option<Arc<Transaction>>,
    persisting_block: Option<Arc<Block>>,
    natives: NativeRegistry,
    notifications: Vec<NotifyEvent>,
    random_counter: u64,
}

impl ApplicationEngine {
    /// Creates an engine over its own DAO layer.
    pub fn new(
        trigger: TriggerType,
        container: Option<Arc<Transaction>>,
        dao: DataCache,
        persisting_block: Option<Arc<Block>>,
        settings: Arc<ProtocolSettings>,
        natives: NativeRegistry,
        gas_limit: i64,
    ) -> Self {
        let mut engine = ExecutionEngine::new(gas_limit);
        engine.set_interops(interop::build_registry());
        Self {
            engine,
            trigger,
            dao,
            settings,
            container,
            persisting_block,
            natives,
            notifications: Vec::new(),
            random_counter: 0,
        }
    }

    /// Gets the trigger.
    pub fn trigger(&self) -> TriggerType {
        self.trigger
    }

    /// Gets the protocol settings.
    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    /// Gets the native registry.
    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// The executing transaction, if any.
    pub fn container(&self) -> Option<&Arc<Transaction>> {
        self.container.as_ref()
    }

    /// The block being persisted, if any.
    pub fn persisting_block(&self) -> Option<&Arc<Block>> {
        self.persisting_block.as_ref()
    }

    /// Height visible to executing code: the persisting block if present,
    /// otherwise the committed chain tip.
    pub fn current_height(&self) -> ContractResult<u32> {
        if let Some(block) = &self.persisting_block {
            return Ok(block.index());
        }
        Ok(self.dao.get_current_block_index()?.unwrap_or(0))
    }

    /// Read access to the DAO layer.
    pub fn dao(&self) -> &DataCache {
        &self.dao
    }

    /// Write access to the DAO layer.
    pub fn dao_mut(&mut self) -> &mut DataCache {
        &mut self.dao
    }

    /// Direct access to the wrapped VM.
    pub fn vm(&mut self) -> &mut ExecutionEngine {
        &mut self.engine
    }

    /// Gas consumed so far.
    pub fn gas_consumed(&self) -> i64 {
        self.engine.gas_consumed()
    }

    /// Boolean interpretation of the top of the result stack after a halt.
    pub fn result_top_bool(&self) -> Option<bool> {
        self.engine
            .result_stack()
            .last()
            .and_then(|item| item.try_bool().ok())
    }

    /// Notifications raised so far.
    pub fn notifications(&self) -> &[NotifyEvent] {
        &self.notifications
    }

    /// Records a notification on behalf of `contract`.
    pub fn emit_event(&mut self, contract: UInt160, name: &str, state: Vec<String>) {
        self.notifications.push(NotifyEvent {
            contract,
            name: name.to_string(),
            state,
        });
    }

    /// Loads the entry script.
    pub fn load_script(&mut self, script: Vec<u8>, call_flags: CallFlags) {
        self.engine.load_script(Script::new(script), -1, call_flags);
    }

    /// Runs to completion, dispatching syscalls, and returns the final
    /// state. Syscall failures fault the engine.
    pub fn execute(&mut self) -> VMState {
        loop {
            match self.engine.execute_step() {
                StepResult::Continue => {}
                StepResult::Done => return self.engine.state(),
                StepResult::Syscall(id) => {
                    if let Err(error) = self.dispatch_syscall(id) {
                        debug!(%error, "syscall failed");
                        self.engine.fault(error.to_string());
                        return self.engine.state();
                    }
                }
            }
        }
    }

    /// Finishes the execution, producing the result record and giving the
    /// DAO layer back to the caller.
    pub fn finish(mut self) -> (DataCache, ApplicationExecResult) {
        let state = self.engine.state();
        let stack = self
            .engine
            .result_stack()
            .iter()
            .map(render_item)
            .collect();
        let result = ApplicationExecResult {
            trigger: self.trigger,
            vm_state: match state {
                VMState::Halt => "HALT".to_string(),
                VMState::Fault => "FAULT".to_string(),
                _ => "NONE".to_string(),
            },
            gas_consumed: self.engine.gas_consumed(),
            exception: self.engine.fault_message().map(str::to_string),
            stack,
            notifications: std::mem::take(&mut self.notifications),
        };
        (self.dao, result)
    }

    // === Witness checks ===

    /// Checks whether the container authorizes `hash` in the current
    /// calling context, honoring signer scopes.
    pub fn check_witness(&self, hash: &UInt160) -> ContractResult<bool> {
        let Some(transaction) = &self.container else {
            return Ok(false);
        };
        let Some(signer) = transaction.signers.iter().find(|s| s.account == *hash) else {
            return Ok(false);
        };
        if signer.scopes.has_flag(WitnessScope::GLOBAL) {
            return Ok(true);
        }
        let current = self
            .engine_current_script_hash()
            .unwrap_or_else(UInt160::zero);
        if signer.scopes.has_flag(WitnessScope::CALLED_BY_ENTRY) {
            let entry_called = match self.engine.entry_context() {
                Ok(entry) => {
                    let calling = self
                        .engine
                        .current_context()
                        .map(|c| c.calling_script_hash)
                        .unwrap_or_default();
                    calling.is_zero() || calling == entry.script_hash
                }
                Err(_) => true,
            };
            if entry_called {
                return Ok(true);
            }
        }
        if signer.scopes.has_flag(WitnessScope::CUSTOM_CONTRACTS)
            && signer.allowed_contracts.contains(&current)
        {
            return Ok(true);
        }
        if signer.scopes.has_flag(WitnessScope::CUSTOM_GROUPS) {
            if let Some(state) = self.contract_state(&current)? {
                let allowed: Vec<&ECPoint> = signer.allowed_groups.iter().collect();
                if state
                    .manifest
                    .groups
                    .iter()
                    .any(|g| allowed.contains(&&g.public_key))
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Checks the witness of the committee address.
    pub fn check_committee(&self) -> ContractResult<bool> {
        let address = committee_address(&self.settings)?;
        self.check_witness(&address)
    }

    /// Loads a contract state from the DAO.
    pub fn contract_state(&self, hash: &UInt160) -> ContractResult<Option<ContractState>> {
        match self.dao.get_contract(hash)? {
            Some(bytes) => Ok(Some(ContractState::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn engine_current_script_hash(&self) -> Option<UInt160> {
        self.engine.current_context().ok().map(|c| c.script_hash)
    }

    // === Syscall dispatch ===

    fn dispatch_syscall(&mut self, id: u32) -> ContractResult<()> {
        let syscall = interop::dispatch(id)
            .ok_or_else(|| ContractError::native(format!("unknown syscall {id:#010x}")))?;
        match syscall {
            Syscall::RuntimePlatform => {
                self.engine.push(StackItem::from_bytes(b"NEO".to_vec()))?;
            }
            Syscall::RuntimeGetTrigger => {
                self.engine
                    .push(StackItem::from_int(self.trigger as u8 as i64))?;
            }
            Syscall::RuntimeGetTime => {
                let time = self
                    .persisting_block
                    .as_ref()
                    .map(|b| b.header.timestamp)
                    .unwrap_or(0);
                self.engine.push(StackItem::from_int(time as i64))?;
            }
            Syscall::RuntimeGetScriptContainer => {
                let item = match &self.container {
                    Some(transaction) => {
                        StackItem::from_bytes(transaction.hash()?.to_vec())
                    }
                    None => StackItem::Null,
                };
                self.engine.push(item)?;
            }
            Syscall::RuntimeGetExecutingScriptHash => {
                let hash = self
                    .engine_current_script_hash()
                    .unwrap_or_else(UInt160::zero);
                self.engine.push(StackItem::from_bytes(hash.to_vec()))?;
            }
            Syscall::RuntimeGetCallingScriptHash => {
                let hash = self
                    .engine
                    .current_context()
                    .map(|c| c.calling_script_hash)
                    .unwrap_or_default();
                self.engine.push(StackItem::from_bytes(hash.to_vec()))?;
            }
            Syscall::RuntimeGetEntryScriptHash => {
                let hash = self.engine.entry_context()?.script_hash;
                self.engine.push(StackItem::from_bytes(hash.to_vec()))?;
            }
            Syscall::RuntimeCheckWitness => {
                let bytes = self.engine.pop_bytes()?;
                let account = match bytes.len() {
                    20 => UInt160::from_bytes(&bytes)?,
                    33 => {
                        let point = ECPoint::from_bytes(&bytes)?;
                        UInt160::from_script(&signature_redeem_script(&point))
                    }
                    other => {
                        return Err(ContractError::native(format!(
                            "CheckWitness of {other} bytes"
                        )))
                    }
                };
                let authorized = self.check_witness(&account)?;
                self.engine.push(StackItem::Boolean(authorized))?;
            }
            Syscall::RuntimeGasLeft => {
                self.engine
                    .push(StackItem::from_int(self.engine.gas_left()))?;
            }
            Syscall::RuntimeGetNetwork => {
                self.engine
                    .push(StackItem::from_int(self.settings.network() as i64))?;
            }
            Syscall::RuntimeGetRandom => {
                // Deterministic per transaction: derived from the container
                // hash and an in-execution counter.
                self.random_counter += 1;
                let mut seed = Vec::with_capacity(40);
                if let Some(transaction) = &self.container {
                    seed.extend_from_slice(transaction.hash()?.as_bytes());
                }
                seed.extend_from_slice(&self.random_counter.to_le_bytes());
                let digest = neo3_cryptography::hash::sha256(&seed);
                let value = u64::from_le_bytes(digest[..8].try_into().expect("8 bytes"));
                self.engine.push(StackItem::from_int(value as i64))?;
            }
            Syscall::RuntimeLog => {
                let message = self.engine.pop_bytes()?;
                debug!(
                    contract = %self.engine_current_script_hash().unwrap_or_default(),
                    message = %String::from_utf8_lossy(&message),
                    "contract log"
                );
            }
            Syscall::RuntimeNotify => {
                let name = String::from_utf8_lossy(&self.engine.pop_bytes()?).into_owned();
                let state = self.engine.pop()?;
                let contract = self
                    .engine_current_script_hash()
                    .unwrap_or_else(UInt160::zero);
                let rendered = match &state {
                    StackItem::Array(items) => items.borrow().iter().map(render_item).collect(),
                    other => vec![render_item(other)],
                };
                self.emit_event(contract, &name, rendered);
            }
            Syscall::StorageGetContext | Syscall::StorageGetReadOnlyContext => {
                let read_only = syscall == Syscall::StorageGetReadOnlyContext;
                let current = self
                    .engine_current_script_hash()
                    .unwrap_or_else(UInt160::zero);
                let state = self
                    .contract_state(&current)?
                    .ok_or_else(|| ContractError::ContractNotFound(current.to_string()))?;
                self.engine.push(StackItem::InteropInterface(Rc::new(
                    StorageContext {
                        id: state.id,
                        read_only,
                    },
                )))?;
            }
            Syscall::StorageGet => {
                let context = self.pop_storage_context()?;
                let key = self.engine.pop_bytes()?;
                let value = self.dao.get_storage_item(context.id, &key)?;
                self.engine.push(match value {
                    Some(bytes) => StackItem::from_bytes(bytes),
                    None => StackItem::Null,
                })?;
            }
            Syscall::StoragePut => {
                let context = self.pop_storage_context()?;
                let key = self.engine.pop_bytes()?;
                let value = self.engine.pop_bytes()?;
                if context.read_only {
                    return Err(ContractError::Storage("context is read-only".to_string()));
                }
                if key.len() > neo3_config::MAX_STORAGE_KEY_SIZE {
                    return Err(ContractError::Storage(format!(
                        "key of {} bytes",
                        key.len()
                    )));
                }
                if value.len() > neo3_config::MAX_STORAGE_VALUE_SIZE {
                    return Err(ContractError::Storage(format!(
                        "value of {} bytes",
                        value.len()
                    )));
                }
                self.dao.put_storage_item(context.id, &key, value);
            }
            Syscall::StorageDelete => {
                let context = self.pop_storage_context()?;
                let key = self.engine.pop_bytes()?;
                if context.read_only {
                    return Err(ContractError::Storage("context is read-only".to_string()));
                }
                self.dao.delete_storage_item(context.id, &key);
            }
            Syscall::StorageFind => {
                let context = self.pop_storage_context()?;
                let prefix = self.engine.pop_bytes()?;
                let found = self.dao.find_storage(context.id, &prefix)?;
                // Results come back as an array of [key, value] structs in
                // ascending key order.
                let items: Vec<StackItem> = found
                    .into_iter()
                    .map(|(key, value)| {
                        StackItem::struct_of(vec![
                            StackItem::from_bytes(key),
                            StackItem::from_bytes(value),
                        ])
                    })
                    .collect();
                self.engine.push(StackItem::array_of(items))?;
            }
            Syscall::ContractCall => {
                let hash = UInt160::from_bytes(&self.engine.pop_bytes()?)?;
                let method = String::from_utf8_lossy(&self.engine.pop_bytes()?).into_owned();
                let flags = CallFlags(
                    self.engine
                        .pop_int()?
                        .to_u8()
                        .ok_or_else(|| ContractError::native("invalid call flags".to_string()))?,
                );
                let args = match self.engine.pop()? {
                    StackItem::Array(items) => items.borrow().clone(),
                    StackItem::Null => Vec::new(),
                    other => {
                        return Err(ContractError::native(format!(
                            "call args must be an array, got {:?}",
                            other.item_type()
                        )))
                    }
                };
                self.call_contract(&hash, &method, flags, args)?;
            }
            Syscall::ContractGetCallFlags => {
                let flags = self.engine.current_context()?.call_flags;
                self.engine.push(StackItem::from_int(flags.0 as i64))?;
            }
            Syscall::ContractCreateStandardAccount => {
                let point = ECPoint::from_bytes(&self.engine.pop_bytes()?)?;
                let hash = UInt160::from_script(&signature_redeem_script(&point));
                self.engine.push(StackItem::from_bytes(hash.to_vec()))?;
            }
            Syscall::ContractCreateMultisigAccount => {
                let m = self.engine.pop_usize()?;
                let keys_item = self.engine.pop()?;
                let keys = match &keys_item {
                    StackItem::Array(items) => items
                        .borrow()
                        .iter()
                        .map(|item| Ok(ECPoint::from_bytes(&item.try_bytes()?)?))
                        .collect::<ContractResult<Vec<ECPoint>>>()?,
                    _ => {
                        return Err(ContractError::native(
                            "multisig keys must be an array".to_string(),
                        ))
                    }
                };
                let script = multisig_redeem_script(m, &keys)?;
                let hash = UInt160::from_script(&script);
                self.engine.push(StackItem::from_bytes(hash.to_vec()))?;
            }
            Syscall::CryptoCheckSig => {
                let key = ECPoint::from_bytes(&self.engine.pop_bytes()?)?;
                let signature = self.engine.pop_bytes()?;
                let valid = match &self.container {
                    Some(transaction) => {
                        let data = transaction.sign_data(self.settings.network())?;
                        neo3_cryptography::verify_signature(&data, &signature, &key)
                    }
                    None => false,
                };
                self.engine.push(StackItem::Boolean(valid))?;
            }
            Syscall::CryptoCheckMultisig => {
                // Multisig verification scripts leave the unpacked form on
                // the stack: signatures, m, keys, n (n topmost).
                let n = self.engine.pop_usize()?;
                if n == 0 || n > 1024 {
                    return Err(ContractError::native(format!("multisig of {n} keys")));
                }
                let mut keys = Vec::with_capacity(n);
                for _ in 0..n {
                    keys.push(self.engine.pop_bytes()?);
                }
                keys.reverse();
                let m = self.engine.pop_usize()?;
                if m == 0 || m > n {
                    return Err(ContractError::native(format!("multisig threshold {m}/{n}")));
                }
                let mut signatures = Vec::with_capacity(m);
                for _ in 0..m {
                    signatures.push(self.engine.pop_bytes()?);
                }
                signatures.reverse();
                self.engine.add_fee(CHECKSIG_PRICE * n as i64)?;
                let valid = self.check_multisig(&keys, &signatures)?;
                self.engine.push(StackItem::Boolean(valid))?;
            }
        }
        Ok(())
    }

    fn pop_storage_context(&mut self) -> ContractResult<StorageContext> {
        match self.engine.pop()? {
            StackItem::InteropInterface(interface) => interface
                .as_any()
                .downcast_ref::<StorageContext>()
                .copied()
                .ok_or_else(|| ContractError::native("not a storage context".to_string())),
            other => Err(ContractError::native(format!(
                "expected storage context, got {:?}",
                other.item_type()
            ))),
        }
    }

    fn check_multisig(&self, keys: &[Vec<u8>], signatures: &[Vec<u8>]) -> ContractResult<bool> {
        let Some(transaction) = &self.container else {
            return Ok(false);
        };
        if signatures.is_empty() || keys.len() < signatures.len() {
            return Ok(false);
        }
        let data = transaction.sign_data(self.settings.network())?;
        let mut key_index = 0;
        for signature in signatures {
            let mut matched = false;
            while key_index < keys.len() {
                let key = ECPoint::from_bytes(&keys[key_index])?;
                key_index += 1;
                if neo3_cryptography::verify_signature(&data, signature, &key) {
                    matched = true;
                    break;
                }
            }
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Calls into another contract, native or deployed.
    pub fn call_contract(
        &mut self,
        hash: &UInt160,
        method: &str,
        flags: CallFlags,
        args: Vec<StackItem>,
    ) -> ContractResult<()> {
        let current_flags = self
            .engine
            .current_context()
            .map(|c| c.call_flags)
            .unwrap_or(CallFlags::ALL);
        let effective = current_flags.intersect(flags);

        if let Some(native) = self.natives.by_hash(hash) {
            let meta = native
                .methods()
                .iter()
                .find(|m| m.name == method && m.parameters == args.len())
                .cloned()
                .ok_or_else(|| {
                    ContractError::MethodNotFound(format!("{}.{method}", native.name()))
                })?;
            if !effective.contains(meta.required_call_flags) {
                return Err(ContractError::native(format!(
                    "{method} requires flags {:#04x}",
                    meta.required_call_flags.0
                )));
            }
            let height = self.current_height()?;
            if !self.settings.is_native_active(native.name(), height) {
                return Err(ContractError::native(format!(
                    "{} not active at height {height}",
                    native.name()
                )));
            }
            self.engine.add_fee(meta.price)?;
            let result = native.invoke(self, method, args)?;
            if let Some(item) = result {
                self.engine.push(item)?;
            }
            return Ok(());
        }

        let state = self
            .contract_state(hash)?
            .ok_or_else(|| ContractError::ContractNotFound(hash.to_string()))?;
        let target = state
            .manifest
            .abi
            .get_method(method, args.len())
            .ok_or_else(|| ContractError::MethodNotFound(format!("{hash}.{method}")))?;
        let calling = self
            .engine_current_script_hash()
            .unwrap_or_else(UInt160::zero);

        let mut context =
            neo3_vm::ExecutionContext::new(Script::new(state.nef.script.clone()), 1, effective);
        context.ip = target.offset;
        context.calling_script_hash = calling;
        context.script_hash = state.hash;
        // Arguments go onto the fresh stack so INITSLOT pops them with the
        // first argument topmost.
        {
            let mut stack = context.evaluation_stack.borrow_mut();
            for arg in args.into_iter().rev() {
                self.engine.reference_counter().add(&arg)?;
                stack.push(arg);
            }
        }
        self.engine.load_context(context);
        Ok(())
    }
}

/// Renders a stack item for logs and persisted execution results.
pub fn render_item(item: &StackItem) -> String {
    match item {
        StackItem::Null => "null".to_string(),
        StackItem::Boolean(value) => value.to_string(),
        StackItem::Integer(value) => value.to_string(),
        StackItem::ByteString(bytes) | StackItem::Buffer(bytes) => {
            format!("0x{}", hex::encode(bytes))
        }
        StackItem::Array(items) | StackItem::Struct(items) => {
            let rendered: Vec<String> = items.borrow().iter().map(render_item).collect();
            format!("[{}]", rendered.join(","))
        }
        StackItem::Map(entries) => format!("map[{}]", entries.borrow().len()),
        StackItem::Pointer(position) => format!("pointer({position})"),
        StackItem::InteropInterface(interface) => interface.interface_type().to_string(),
    }
}

/// The committee multisig address: majority of the standby committee.
pub fn committee_address(settings: &ProtocolSettings) -> ContractResult<UInt160> {
    let keys = settings
        .committee_keys()
        .map_err(|e| ContractError::native(e.to_string()))?;
    if keys.is_empty() {
        return Err(ContractError::native("empty committee".to_string()));
    }
    let points = keys
        .iter()
        .map(|k| Ok(ECPoint::from_bytes(k)?))
        .collect::<ContractResult<Vec<ECPoint>>>()?;
    let m = points.len() / 2 + 1;
    let script = multisig_redeem_script(m, &points)?;
    Ok(UInt160::from_script(&script))
}
