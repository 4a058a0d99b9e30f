//! The NEO governance token.

use super::fungible_token::{self, account_arg, int_arg};
use super::{native_hash, NativeContract, NativeMethod};
use crate::application_engine::ApplicationEngine;
use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_cryptography::ECPoint;
use neo3_vm::StackItem;

/// The fixed NEO supply.
pub const NEO_TOTAL_SUPPLY: i64 = 100_000_000;

/// The NEO token. Indivisible; the committee and validator sets derive
/// from the standby committee of the protocol settings.
pub struct NeoToken {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl NeoToken {
    pub const ID: i32 = -5;
    pub const NAME: &'static str = "NeoToken";

    pub fn new() -> Self {
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::safe("symbol", 1 << 3, 0),
                NativeMethod::safe("decimals", 1 << 3, 0),
                NativeMethod::safe("totalSupply", 1 << 15, 0),
                NativeMethod::safe("balanceOf", 1 << 15, 1),
                NativeMethod::unsafe_method("transfer", 1 << 17, 4),
                NativeMethod::safe("getCommittee", 1 << 16, 0),
                NativeMethod::safe("getNextBlockValidators", 1 << 16, 0),
            ],
        }
    }

    /// Mints the initial supply; called once from genesis.
    pub fn initialize(
        &self,
        engine: &mut ApplicationEngine,
        committee_address: &UInt160,
    ) -> ContractResult<()> {
        if fungible_token::total_supply(engine.dao(), Self::ID)? != 0 {
            return Ok(());
        }
        fungible_token::mint(
            engine,
            self.hash,
            Self::ID,
            committee_address,
            NEO_TOTAL_SUPPLY,
        )
    }

    fn committee_items(&self, engine: &ApplicationEngine) -> ContractResult<Vec<StackItem>> {
        let keys = engine
            .settings()
            .committee_keys()
            .map_err(|e| ContractError::native(e.to_string()))?;
        Ok(keys
            .iter()
            .map(|k| StackItem::from_bytes(k.to_vec()))
            .collect())
    }
}

impl Default for NeoToken {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for NeoToken {
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
            "symbol" => Ok(Some(StackItem::from_bytes(b"NEO".to_vec()))),
            "decimals" => Ok(Some(StackItem::from_int(0))),
            "totalSupply" => Ok(Some(StackItem::from_int(fungible_token::total_supply(
                engine.dao(),
                Self::ID,
            )?))),
            "balanceOf" => {
                let account = account_arg(&args, 0)?;
                Ok(Some(StackItem::from_int(fungible_token::balance_of(
                    engine.dao(),
                    Self::ID,
                    &account,
                )?)))
            }
            "transfer" => {
                let from = account_arg(&args, 0)?;
                let to = account_arg(&args, 1)?;
                let amount = int_arg(&args, 2)?;
                let ok =
                    fungible_token::transfer(engine, self.hash, Self::ID, &from, &to, amount)?;
                Ok(Some(StackItem::Boolean(ok)))
            }
            "getCommittee" => Ok(Some(StackItem::array_of(self.committee_items(engine)?))),
            "getNextBlockValidators" => {
                let keys = engine
                    .settings()
                    .validator_keys()
                    .map_err(|e| ContractError::native(e.to_string()))?;
                let items = keys
                    .iter()
                    .map(|k| {
                        // Keys come from configuration; reject malformed ones.
                        ECPoint::from_bytes(k)?;
                        Ok(StackItem::from_bytes(k.to_vec()))
                    })
                    .collect::<ContractResult<Vec<StackItem>>>()?;
                Ok(Some(StackItem::array_of(items)))
            }
            other => Err(ContractError::MethodNotFound(format!("NeoToken.{other}"))),
        }
    }
}
