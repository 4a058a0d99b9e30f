//! Witness scopes restricting where a signature is valid.

use crate::CoreError;
use serde::{Deserialize, Serialize};

/// A combination of witness scope flags.
///
/// `GLOBAL` must stand alone; the custom scopes combine with
/// `CALLED_BY_ENTRY` and each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WitnessScope(pub u8);

impl WitnessScope {
    /// The signature is only valid for fee payment, never for CheckWitness.
    pub const NONE: Self = Self(0);
    /// Valid when the calling contract is the transaction entry script.
    pub const CALLED_BY_ENTRY: Self = Self(0x01);
    /// Valid inside the contracts listed by the signer.
    pub const CUSTOM_CONTRACTS: Self = Self(0x10);
    /// Valid inside contracts belonging to the listed groups.
    pub const CUSTOM_GROUPS: Self = Self(0x20);
    /// Valid everywhere.
    pub const GLOBAL: Self = Self(0x80);

    /// Checks whether all bits of `flag` are set.
    pub fn has_flag(&self, flag: WitnessScope) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Validates the combination: `GLOBAL` excludes every other flag and no
    /// unknown bits may be set.
    pub fn validate(&self) -> Result<(), CoreError> {
        const KNOWN: u8 = 0x01 | 0x10 | 0x20 | 0x80;
        if self.0 & !KNOWN != 0 {
            return Err(CoreError::invalid_data(format!(
                "unknown witness scope bits: {:#04x}",
                self.0
            )));
        }
        if self.has_flag(Self::GLOBAL) && self.0 != Self::GLOBAL.0 {
            return Err(CoreError::invalid_data(
                "global scope cannot combine with other scopes",
            ));
        }
        Ok(())
    }
}

impl std::ops::BitOr for WitnessScope {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_stands_alone() {
        assert!(WitnessScope::GLOBAL.validate().is_ok());
        assert!((WitnessScope::GLOBAL | WitnessScope::CALLED_BY_ENTRY)
            .validate()
            .is_err());
    }

    #[test]
    fn custom_scopes_combine() {
        let scope = WitnessScope::CALLED_BY_ENTRY | WitnessScope::CUSTOM_CONTRACTS;
        assert!(scope.validate().is_ok());
        assert!(scope.has_flag(WitnessScope::CUSTOM_CONTRACTS));
        assert!(!scope.has_flag(WitnessScope::CUSTOM_GROUPS));
    }

    #[test]
    fn unknown_bits_rejected() {
        assert!(WitnessScope(0x02).validate().is_err());
    }
}
