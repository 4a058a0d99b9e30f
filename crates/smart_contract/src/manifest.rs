//! Contract manifests.

use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_cryptography::ECPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A method entry of the contract ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMethod {
    pub name: String,
    /// Entry offset into the NEF script.
    pub offset: usize,
    /// Number of parameters the method consumes.
    pub parameters: usize,
    pub return_value: bool,
    /// Safe methods may be called without write flags.
    pub safe: bool,
}

/// An event entry of the contract ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    pub parameters: usize,
}

/// The ABI: callable methods and declared events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAbi {
    pub methods: Vec<ContractMethod>,
    pub events: Vec<ContractEvent>,
}

impl ContractAbi {
    /// Finds a method by name and parameter count.
    pub fn get_method(&self, name: &str, parameters: usize) -> Option<&ContractMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameters == parameters)
    }
}

/// A group a contract belongs to: a public key plus its signature over the
/// contract hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractGroup {
    pub public_key: ECPoint,
    pub signature: Vec<u8>,
}

impl ContractGroup {
    /// Verifies the group signature over `hash`.
    pub fn is_valid(&self, hash: &UInt160) -> bool {
        neo3_cryptography::verify_signature(hash.as_bytes(), &self.signature, &self.public_key)
    }
}

/// What another contract (or any, for wildcards) may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPermission {
    /// `None` is the wildcard matcher.
    pub contract: Option<UInt160>,
    /// Group matcher, exclusive with `contract`.
    pub group: Option<ECPoint>,
    /// `None` is the wildcard method set.
    pub methods: Option<Vec<String>>,
}

impl ContractPermission {
    /// The wildcard permission.
    pub fn wildcard() -> Self {
        Self {
            contract: None,
            group: None,
            methods: None,
        }
    }

    /// Whether this permission covers a call of `method` on `target`.
    pub fn allows(&self, target: &UInt160, target_groups: &[ContractGroup], method: &str) -> bool {
        let matches_target = match (&self.contract, &self.group) {
            (Some(contract), _) => contract == target,
            (None, Some(group)) => target_groups.iter().any(|g| g.public_key == *group),
            (None, None) => true,
        };
        if !matches_target {
            return false;
        }
        match &self.methods {
            None => true,
            Some(methods) => methods.iter().any(|m| m == method),
        }
    }
}

/// The manifest of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractManifest {
    pub name: String,
    pub groups: Vec<ContractGroup>,
    pub supported_standards: Vec<String>,
    pub abi: ContractAbi,
    pub permissions: Vec<ContractPermission>,
    /// `None` trusts everything; otherwise a concrete set.
    pub trusts: Option<Vec<UInt160>>,
    pub extra: Option<serde_json::Value>,
}

impl ContractManifest {
    /// Creates a minimal manifest with a wildcard permission.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            groups: Vec::new(),
            supported_standards: Vec::new(),
            abi: ContractAbi::default(),
            permissions: vec![ContractPermission::wildcard()],
            trusts: Some(Vec::new()),
            extra: None,
        }
    }

    /// Validates the manifest against `hash`, the contract it describes.
    pub fn validate(&self, hash: &UInt160) -> ContractResult<()> {
        if self.name.is_empty() {
            return Err(ContractError::InvalidManifest("empty name".to_string()));
        }
        let mut standards = HashSet::new();
        for standard in &self.supported_standards {
            if !standards.insert(standard) {
                return Err(ContractError::InvalidManifest(format!(
                    "duplicate standard {standard}"
                )));
            }
        }
        if let Some(trusts) = &self.trusts {
            let mut seen = HashSet::new();
            for trust in trusts {
                if !seen.insert(trust) {
                    return Err(ContractError::InvalidManifest(format!(
                        "duplicate trust {trust}"
                    )));
                }
            }
        }
        for permission in &self.permissions {
            if permission.contract.is_some() && permission.group.is_some() {
                return Err(ContractError::InvalidManifest(
                    "permission matches both contract and group".to_string(),
                ));
            }
        }
        for group in &self.groups {
            if !group.is_valid(hash) {
                return Err(ContractError::InvalidManifest(format!(
                    "group {} signature invalid",
                    group.public_key
                )));
            }
        }
        Ok(())
    }

    /// Whether the manifest permits calling `method` on the target.
    pub fn can_call(&self, target: &UInt160, target_groups: &[ContractGroup], method: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.allows(target, target_groups, method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_cryptography::KeyPair;

    #[test]
    fn minimal_manifest_is_valid() {
        let manifest = ContractManifest::new("Sample");
        assert!(manifest.validate(&UInt160::zero()).is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let mut manifest = ContractManifest::new("Sample");
        manifest.name.clear();
        assert!(manifest.validate(&UInt160::zero()).is_err());
    }

    #[test]
    fn duplicate_standards_rejected() {
        let mut manifest = ContractManifest::new("Sample");
        manifest.supported_standards = vec!["NEP-17".to_string(), "NEP-17".to_string()];
        assert!(manifest.validate(&UInt160::zero()).is_err());
    }

    #[test]
    fn group_signature_checked_against_hash() {
        let hash = UInt160::from_array([9u8; 20]);
        let key = KeyPair::generate();
        let mut manifest = ContractManifest::new("Sample");
        manifest.groups.push(ContractGroup {
            public_key: key.public_key(),
            signature: key.sign(hash.as_bytes()),
        });
        assert!(manifest.validate(&hash).is_ok());
        assert!(manifest.validate(&UInt160::zero()).is_err());
    }

    #[test]
    fn permission_matching() {
        let target = UInt160::from_array([3u8; 20]);
        let scoped = ContractPermission {
            contract: Some(target),
            group: None,
            methods: Some(vec!["transfer".to_string()]),
        };
        assert!(scoped.allows(&target, &[], "transfer"));
        assert!(!scoped.allows(&target, &[], "mint"));
        assert!(!scoped.allows(&UInt160::zero(), &[], "transfer"));
        assert!(ContractPermission::wildcard().allows(&target, &[], "anything"));
    }
}
