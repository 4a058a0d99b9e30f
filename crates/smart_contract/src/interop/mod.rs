//! The interop service table.
//!
//! One flat table, built once, maps the `u32` service ids (first four
//! little-endian bytes of the SHA-256 of the name) to metadata and to the
//! dispatch tag the application engine matches on. Prices are base units,
//! multiplied by the policy execution fee factor at charge time.

use neo3_cryptography::syscall_id;
use neo3_vm::{CallFlags, InteropDescriptor, InteropRegistry};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Dispatch tags of the supported services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    RuntimePlatform,
    RuntimeGetTrigger,
    RuntimeGetTime,
    RuntimeGetScriptContainer,
    RuntimeGetExecutingScriptHash,
    RuntimeGetCallingScriptHash,
    RuntimeGetEntryScriptHash,
    RuntimeCheckWitness,
    RuntimeGasLeft,
    RuntimeGetNetwork,
    RuntimeGetRandom,
    RuntimeLog,
    RuntimeNotify,
    StorageGetContext,
    StorageGetReadOnlyContext,
    StorageGet,
    StoragePut,
    StorageDelete,
    StorageFind,
    ContractCall,
    ContractGetCallFlags,
    ContractCreateStandardAccount,
    ContractCreateMultisigAccount,
    CryptoCheckSig,
    CryptoCheckMultisig,
}

/// The full service list: name, base price, required flags, dispatch tag.
const SERVICES: &[(&str, i64, CallFlags, Syscall)] = &[
    ("System.Runtime.Platform", 1 << 3, CallFlags::NONE, Syscall::RuntimePlatform),
    ("System.Runtime.GetTrigger", 1 << 3, CallFlags::NONE, Syscall::RuntimeGetTrigger),
    ("System.Runtime.GetTime", 1 << 3, CallFlags::NONE, Syscall::RuntimeGetTime),
    ("System.Runtime.GetScriptContainer", 1 << 3, CallFlags::NONE, Syscall::RuntimeGetScriptContainer),
    ("System.Runtime.GetExecutingScriptHash", 1 << 4, CallFlags::NONE, Syscall::RuntimeGetExecutingScriptHash),
    ("System.Runtime.GetCallingScriptHash", 1 << 4, CallFlags::NONE, Syscall::RuntimeGetCallingScriptHash),
    ("System.Runtime.GetEntryScriptHash", 1 << 4, CallFlags::NONE, Syscall::RuntimeGetEntryScriptHash),
    ("System.Runtime.CheckWitness", 1 << 10, CallFlags::NONE, Syscall::RuntimeCheckWitness),
    ("System.Runtime.GasLeft", 1 << 4, CallFlags::NONE, Syscall::RuntimeGasLeft),
    ("System.Runtime.GetNetwork", 1 << 3, CallFlags::NONE, Syscall::RuntimeGetNetwork),
    ("System.Runtime.GetRandom", 1 << 4, CallFlags::NONE, Syscall::RuntimeGetRandom),
    ("System.Runtime.Log", 1 << 15, CallFlags::ALLOW_NOTIFY, Syscall::RuntimeLog),
    ("System.Runtime.Notify", 1 << 15, CallFlags::ALLOW_NOTIFY, Syscall::RuntimeNotify),
    ("System.Storage.GetContext", 1 << 4, CallFlags::READ_STATES, Syscall::StorageGetContext),
    ("System.Storage.GetReadOnlyContext", 1 << 4, CallFlags::READ_STATES, Syscall::StorageGetReadOnlyContext),
    ("System.Storage.Get", 1 << 15, CallFlags::READ_STATES, Syscall::StorageGet),
    ("System.Storage.Put", 1 << 15, CallFlags::WRITE_STATES, Syscall::StoragePut),
    ("System.Storage.Delete", 1 << 15, CallFlags::WRITE_STATES, Syscall::StorageDelete),
    ("System.Storage.Find", 1 << 15, CallFlags::READ_STATES, Syscall::StorageFind),
    ("System.Contract.Call", 1 << 15, CallFlags::ALLOW_CALL, Syscall::ContractCall),
    ("System.Contract.GetCallFlags", 1 << 10, CallFlags::NONE, Syscall::ContractGetCallFlags),
    ("System.Contract.CreateStandardAccount", 1 << 8, CallFlags::NONE, Syscall::ContractCreateStandardAccount),
    ("System.Contract.CreateMultisigAccount", 1 << 8, CallFlags::NONE, Syscall::ContractCreateMultisigAccount),
    ("System.Crypto.CheckSig", 1 << 15, CallFlags::NONE, Syscall::CryptoCheckSig),
    // Charged per key inside the handler.
    ("System.Crypto.CheckMultisig", 0, CallFlags::NONE, Syscall::CryptoCheckMultisig),
];

static DISPATCH: Lazy<HashMap<u32, Syscall>> = Lazy::new(|| {
    SERVICES
        .iter()
        .map(|(name, _, _, tag)| (syscall_id(name), *tag))
        .collect()
});

/// Builds the VM-side registry of descriptors.
pub fn build_registry() -> InteropRegistry {
    let mut registry = InteropRegistry::new();
    for (name, price, flags, _) in SERVICES {
        registry.register(InteropDescriptor::new(name, *price, *flags));
    }
    registry
}

/// Resolves a validated service id to its dispatch tag.
pub fn dispatch(id: u32) -> Option<Syscall> {
    DISPATCH.get(&id).copied()
}

/// Base price per signature check of `CheckMultisig`.
pub const CHECKSIG_PRICE: i64 = 1 << 15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_id_collisions() {
        assert_eq!(DISPATCH.len(), SERVICES.len());
    }

    #[test]
    fn dispatch_resolves_registered_names() {
        let id = syscall_id("System.Storage.Put");
        assert_eq!(dispatch(id), Some(Syscall::StoragePut));
        assert_eq!(dispatch(0xDEAD_BEEF), None);
    }
}
