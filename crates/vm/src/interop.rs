//! The interop hook table.
//!
//! The table only carries metadata: the name, the price and the call flags
//! a service demands. Dispatch happens in the host that drives the engine,
//! which receives the service id from [`crate::ExecutionEngine::execute_step`]
//! and performs the call with full access to both the engine and its own
//! state.

use crate::CallFlags;
use neo3_cryptography::syscall_id;
use std::collections::HashMap;

/// Metadata of one interop service.
#[derive(Debug, Clone)]
pub struct InteropDescriptor {
    pub name: String,
    /// Service id: the first four little-endian bytes of `sha256(name)`.
    pub id: u32,
    /// Base gas price, multiplied by the engine's fee factor on call.
    pub price: i64,
    pub required_call_flags: CallFlags,
}

impl InteropDescriptor {
    /// Creates a descriptor, deriving the id from the name.
    pub fn new(name: &str, price: i64, required_call_flags: CallFlags) -> Self {
        Self {
            name: name.to_string(),
            id: syscall_id(name),
            price,
            required_call_flags,
        }
    }
}

/// A flat id-to-descriptor map built once at startup.
#[derive(Debug, Default, Clone)]
pub struct InteropRegistry {
    services: HashMap<u32, InteropDescriptor>,
}

impl InteropRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service descriptor.
    pub fn register(&mut self, descriptor: InteropDescriptor) {
        self.services.insert(descriptor.id, descriptor);
    }

    /// Looks up a descriptor by id.
    pub fn get(&self, id: u32) -> Option<&InteropDescriptor> {
        self.services.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_derived_from_name() {
        let descriptor = InteropDescriptor::new("System.Runtime.Platform", 1 << 3, CallFlags::NONE);
        assert_eq!(descriptor.id, syscall_id("System.Runtime.Platform"));
    }

    #[test]
    fn registry_lookup() {
        let mut registry = InteropRegistry::new();
        let descriptor = InteropDescriptor::new("System.Runtime.GetTrigger", 1 << 3, CallFlags::NONE);
        let id = descriptor.id;
        registry.register(descriptor);
        assert!(registry.get(id).is_some());
        assert!(registry.get(id ^ 1).is_none());
    }
}
