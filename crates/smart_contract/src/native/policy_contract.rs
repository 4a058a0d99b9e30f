//! The Policy contract: runtime-tunable network parameters.

use super::fungible_token::{account_arg, int_arg};
use super::{native_hash, NativeContract, NativeMethod};
use crate::application_engine::ApplicationEngine;
use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_persistence::DataCache;
use neo3_vm::StackItem;

const PREFIX_FEE_PER_BYTE: u8 = 0x0A;
const PREFIX_BLOCKED_ACCOUNT: u8 = 0x0F;
const PREFIX_EXEC_FEE_FACTOR: u8 = 0x12;
const PREFIX_STORAGE_PRICE: u8 = 0x13;

/// Default network fee floor per transaction byte, in datoshi.
pub const DEFAULT_FEE_PER_BYTE: i64 = 1000;
/// Default multiplier over opcode base prices.
pub const DEFAULT_EXEC_FEE_FACTOR: i64 = 30;
/// Default price of one byte of contract storage.
pub const DEFAULT_STORAGE_PRICE: i64 = 100_000;

/// Every parameter the committee can retune at runtime. Everything else is
/// fixed in [`neo3_config::ProtocolSettings`].
pub struct PolicyContract {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl PolicyContract {
    pub const ID: i32 = -7;
    pub const NAME: &'static str = "PolicyContract";

    pub fn new() -> Self {
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::safe("getFeePerByte", 1 << 15, 0),
                NativeMethod::unsafe_method("setFeePerByte", 1 << 15, 1),
                NativeMethod::safe("getExecFeeFactor", 1 << 15, 0),
                NativeMethod::unsafe_method("setExecFeeFactor", 1 << 15, 1),
                NativeMethod::safe("getStoragePrice", 1 << 15, 0),
                NativeMethod::unsafe_method("setStoragePrice", 1 << 15, 1),
                NativeMethod::safe("isBlocked", 1 << 15, 1),
                NativeMethod::unsafe_method("blockAccount", 1 << 15, 1),
                NativeMethod::unsafe_method("unblockAccount", 1 << 15, 1),
            ],
        }
    }

    fn get_i64(dao: &DataCache, key: u8, default: i64) -> ContractResult<i64> {
        match dao.get_storage_item(Self::ID, &[key])? {
            Some(bytes) if bytes.len() == 8 => {
                Ok(i64::from_le_bytes(bytes.try_into().expect("length checked")))
            }
            Some(_) => Err(ContractError::Storage("policy record malformed".to_string())),
            None => Ok(default),
        }
    }

    /// The network-fee-per-byte floor.
    pub fn fee_per_byte(dao: &DataCache) -> ContractResult<i64> {
        Self::get_i64(dao, PREFIX_FEE_PER_BYTE, DEFAULT_FEE_PER_BYTE)
    }

    /// The execution fee factor applied to opcode prices.
    pub fn exec_fee_factor(dao: &DataCache) -> ContractResult<i64> {
        Self::get_i64(dao, PREFIX_EXEC_FEE_FACTOR, DEFAULT_EXEC_FEE_FACTOR)
    }

    /// The storage price per byte.
    pub fn storage_price(dao: &DataCache) -> ContractResult<i64> {
        Self::get_i64(dao, PREFIX_STORAGE_PRICE, DEFAULT_STORAGE_PRICE)
    }

    /// Whether an account is blocked.
    pub fn is_blocked(dao: &DataCache, account: &UInt160) -> ContractResult<bool> {
        let mut key = vec![PREFIX_BLOCKED_ACCOUNT];
        key.extend_from_slice(account.as_bytes());
        Ok(dao.get_storage_item(Self::ID, &key)?.is_some())
    }

    fn set_i64(
        engine: &mut ApplicationEngine,
        key: u8,
        value: i64,
        range: std::ops::RangeInclusive<i64>,
    ) -> ContractResult<()> {
        if !range.contains(&value) {
            return Err(ContractError::native(format!(
                "value {value} outside {range:?}"
            )));
        }
        if !engine.check_committee()? {
            return Err(ContractError::WitnessFailed(
                "committee witness required".to_string(),
            ));
        }
        engine
            .dao_mut()
            .put_storage_item(Self::ID, &[key], value.to_le_bytes().to_vec());
        Ok(())
    }
}

impl Default for PolicyContract {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for PolicyContract {
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
            "getFeePerByte" => Ok(Some(StackItem::from_int(Self::fee_per_byte(engine.dao())?))),
            "setFeePerByte" => {
                let value = int_arg(&args, 0)?;
                Self::set_i64(engine, PREFIX_FEE_PER_BYTE, value, 0..=100_000_000)?;
                Ok(None)
            }
            "getExecFeeFactor" => Ok(Some(StackItem::from_int(Self::exec_fee_factor(
                engine.dao(),
            )?))),
            "setExecFeeFactor" => {
                let value = int_arg(&args, 0)?;
                Self::set_i64(engine, PREFIX_EXEC_FEE_FACTOR, value, 1..=1000)?;
                Ok(None)
            }
            "getStoragePrice" => Ok(Some(StackItem::from_int(Self::storage_price(
                engine.dao(),
            )?))),
            "setStoragePrice" => {
                let value = int_arg(&args, 0)?;
                Self::set_i64(engine, PREFIX_STORAGE_PRICE, value, 1..=10_000_000)?;
                Ok(None)
            }
            "isBlocked" => {
                let account = account_arg(&args, 0)?;
                Ok(Some(StackItem::Boolean(Self::is_blocked(
                    engine.dao(),
                    &account,
                )?)))
            }
            "blockAccount" => {
                if !engine.check_committee()? {
                    return Err(ContractError::WitnessFailed(
                        "committee witness required".to_string(),
                    ));
                }
                let account = account_arg(&args, 0)?;
                let mut key = vec![PREFIX_BLOCKED_ACCOUNT];
                key.extend_from_slice(account.as_bytes());
                let known = engine.dao().get_storage_item(Self::ID, &key)?.is_some();
                if !known {
                    engine.dao_mut().put_storage_item(Self::ID, &key, vec![1]);
                }
                Ok(Some(StackItem::Boolean(!known)))
            }
            "unblockAccount" => {
                if !engine.check_committee()? {
                    return Err(ContractError::WitnessFailed(
                        "committee witness required".to_string(),
                    ));
                }
                let account = account_arg(&args, 0)?;
                let mut key = vec![PREFIX_BLOCKED_ACCOUNT];
                key.extend_from_slice(account.as_bytes());
                let known = engine.dao().get_storage_item(Self::ID, &key)?.is_some();
                if known {
                    engine.dao_mut().delete_storage_item(Self::ID, &key);
                }
                Ok(Some(StackItem::Boolean(known)))
            }
            other => Err(ContractError::MethodNotFound(format!(
                "PolicyContract.{other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{application_engine, committee_settings, memory_dao, signed_container};

    #[test]
    fn defaults_apply_until_set() {
        let (settings, _, committee) = committee_settings();
        let mut engine =
            application_engine(settings, memory_dao(), Some(signed_container(committee)), 0);
        assert_eq!(
            PolicyContract::fee_per_byte(engine.dao()).unwrap(),
            DEFAULT_FEE_PER_BYTE
        );
        assert_eq!(
            PolicyContract::exec_fee_factor(engine.dao()).unwrap(),
            DEFAULT_EXEC_FEE_FACTOR
        );

        let policy = PolicyContract::new();
        policy
            .invoke(&mut engine, "setFeePerByte", vec![StackItem::from_int(2000)])
            .unwrap();
        assert_eq!(PolicyContract::fee_per_byte(engine.dao()).unwrap(), 2000);
    }

    #[test]
    fn setters_require_committee() {
        let (settings, _, _) = committee_settings();
        let mut engine = application_engine(settings, memory_dao(), None, 0);
        let policy = PolicyContract::new();
        assert!(matches!(
            policy.invoke(&mut engine, "setFeePerByte", vec![StackItem::from_int(2000)]),
            Err(ContractError::WitnessFailed(_))
        ));
    }

    #[test]
    fn block_and_unblock_accounts() {
        let (settings, _, committee) = committee_settings();
        let mut engine =
            application_engine(settings, memory_dao(), Some(signed_container(committee)), 0);
        let policy = PolicyContract::new();
        let victim = UInt160::from_array([5u8; 20]);

        assert!(!PolicyContract::is_blocked(engine.dao(), &victim).unwrap());
        policy
            .invoke(
                &mut engine,
                "blockAccount",
                vec![StackItem::from_bytes(victim.to_vec())],
            )
            .unwrap();
        assert!(PolicyContract::is_blocked(engine.dao(), &victim).unwrap());
        policy
            .invoke(
                &mut engine,
                "unblockAccount",
                vec![StackItem::from_bytes(victim.to_vec())],
            )
            .unwrap();
        assert!(!PolicyContract::is_blocked(engine.dao(), &victim).unwrap());
    }
}
