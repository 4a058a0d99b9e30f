//! The GAS utility token.

use super::fungible_token::{self, account_arg, int_arg};
use super::{native_hash, NativeContract, NativeMethod};
use crate::application_engine::ApplicationEngine;
use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_cryptography::{signature_redeem_script, ECPoint};
use neo3_persistence::DataCache;
use neo3_vm::StackItem;

/// One GAS in datoshi.
pub const GAS_FACTOR: i64 = 100_000_000;

/// The GAS token: pays system and network fees, burned on use and minted
/// to validators.
pub struct GasToken {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl GasToken {
    pub const ID: i32 = -6;
    pub const NAME: &'static str = "GasToken";

    pub fn new() -> Self {
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::safe("symbol", 1 << 3, 0),
                NativeMethod::safe("decimals", 1 << 3, 0),
                NativeMethod::safe("totalSupply", 1 << 15, 0),
                NativeMethod::safe("balanceOf", 1 << 15, 1),
                NativeMethod::unsafe_method("transfer", 1 << 17, 4),
            ],
        }
    }

    /// Reads an account balance through any DAO view.
    pub fn balance(dao: &DataCache, account: &UInt160) -> ContractResult<i64> {
        fungible_token::balance_of(dao, Self::ID, account)
    }

    /// Creates tokens; used at genesis and when distributing fees.
    pub fn mint(
        &self,
        engine: &mut ApplicationEngine,
        account: &UInt160,
        amount: i64,
    ) -> ContractResult<()> {
        fungible_token::mint(engine, self.hash, Self::ID, account, amount)
    }

    /// Destroys tokens; used for fee burning.
    pub fn burn(
        &self,
        engine: &mut ApplicationEngine,
        account: &UInt160,
        amount: i64,
    ) -> ContractResult<()> {
        fungible_token::burn(engine, self.hash, Self::ID, account, amount)
    }
}

impl Default for GasToken {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for GasToken {
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
            "symbol" => Ok(Some(StackItem::from_bytes(b"GAS".to_vec()))),
            "decimals" => Ok(Some(StackItem::from_int(8))),
            "totalSupply" => Ok(Some(StackItem::from_int(fungible_token::total_supply(
                engine.dao(),
                Self::ID,
            )?))),
            "balanceOf" => {
                let account = account_arg(&args, 0)?;
                Ok(Some(StackItem::from_int(Self::balance(
                    engine.dao(),
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
            other => Err(ContractError::MethodNotFound(format!("GasToken.{other}"))),
        }
    }

    /// Burns the fees of every transaction in the persisting block from
    /// its sender.
    fn on_persist(&self, engine: &mut ApplicationEngine) -> ContractResult<()> {
        let Some(block) = engine.persisting_block().cloned() else {
            return Ok(());
        };
        for transaction in &block.transactions {
            let sender = transaction.sender();
            let total = transaction
                .system_fee
                .saturating_add(transaction.network_fee);
            self.burn(engine, &sender, total)?;
        }
        Ok(())
    }

    /// Mints the block's network fees to the primary validator.
    fn post_persist(&self, engine: &mut ApplicationEngine) -> ContractResult<()> {
        let Some(block) = engine.persisting_block().cloned() else {
            return Ok(());
        };
        let network_fees: i64 = block.transactions.iter().map(|t| t.network_fee).sum();
        if network_fees == 0 {
            return Ok(());
        }
        let validators = engine
            .settings()
            .validator_keys()
            .map_err(|e| ContractError::native(e.to_string()))?;
        let Some(primary_key) = validators.get(block.header.primary as usize) else {
            return Ok(());
        };
        let point = ECPoint::from_bytes(primary_key)?;
        let primary = UInt160::from_script(&signature_redeem_script(&point));
        self.mint(engine, &primary, network_fees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{application_engine, committee_settings, memory_dao, signed_container};
    use neo3_vm::StackItem;

    #[test]
    fn mint_burn_and_supply() {
        let (settings, _, committee) = committee_settings();
        let mut engine = application_engine(settings, memory_dao(), None, 0);
        let gas = GasToken::new();

        gas.mint(&mut engine, &committee, 500).unwrap();
        assert_eq!(GasToken::balance(engine.dao(), &committee).unwrap(), 500);
        assert_eq!(
            fungible_token::total_supply(engine.dao(), GasToken::ID).unwrap(),
            500
        );

        gas.burn(&mut engine, &committee, 200).unwrap();
        assert_eq!(GasToken::balance(engine.dao(), &committee).unwrap(), 300);
        assert!(gas.burn(&mut engine, &committee, 1000).is_err());
    }

    #[test]
    fn transfer_requires_witness() {
        let (settings, _, committee) = committee_settings();
        let recipient = UInt160::from_array([7u8; 20]);

        // Without a container there is no witness; transfer reports false.
        let mut engine = application_engine(settings.clone(), memory_dao(), None, 0);
        let gas = GasToken::new();
        gas.mint(&mut engine, &committee, 100).unwrap();
        let result = gas
            .invoke(
                &mut engine,
                "transfer",
                vec![
                    StackItem::from_bytes(committee.to_vec()),
                    StackItem::from_bytes(recipient.to_vec()),
                    StackItem::from_int(40),
                    StackItem::Null,
                ],
            )
            .unwrap();
        assert!(matches!(result, Some(StackItem::Boolean(false))));

        // With a globally scoped signer the transfer goes through.
        let mut engine =
            application_engine(settings, memory_dao(), Some(signed_container(committee)), 0);
        gas.mint(&mut engine, &committee, 100).unwrap();
        let result = gas
            .invoke(
                &mut engine,
                "transfer",
                vec![
                    StackItem::from_bytes(committee.to_vec()),
                    StackItem::from_bytes(recipient.to_vec()),
                    StackItem::from_int(40),
                    StackItem::Null,
                ],
            )
            .unwrap();
        assert!(matches!(result, Some(StackItem::Boolean(true))));
        assert_eq!(GasToken::balance(engine.dao(), &committee).unwrap(), 60);
        assert_eq!(GasToken::balance(engine.dao(), &recipient).unwrap(), 40);
    }
}
