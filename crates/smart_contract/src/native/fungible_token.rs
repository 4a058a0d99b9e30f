//! Shared NEP-17 account and supply bookkeeping.
//!
//! Both token natives keep the same storage shape: the total supply under a
//! single-byte prefix and one eight-byte little-endian balance per account.

use crate::application_engine::ApplicationEngine;
use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_persistence::DataCache;
use neo3_vm::StackItem;

/// Storage prefix of the total supply.
pub const PREFIX_TOTAL_SUPPLY: u8 = 0x0B;
/// Storage prefix of per-account balances.
pub const PREFIX_ACCOUNT: u8 = 0x14;

fn account_key(account: &UInt160) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(PREFIX_ACCOUNT);
    key.extend_from_slice(account.as_bytes());
    key
}

/// Reads an account balance.
pub fn balance_of(dao: &DataCache, contract_id: i32, account: &UInt160) -> ContractResult<i64> {
    match dao.get_storage_item(contract_id, &account_key(account))? {
        Some(bytes) if bytes.len() == 8 => {
            Ok(i64::from_le_bytes(bytes.try_into().expect("length checked")))
        }
        Some(_) => Err(ContractError::Storage("balance record malformed".to_string())),
        None => Ok(0),
    }
}

/// Reads the total supply.
pub fn total_supply(dao: &DataCache, contract_id: i32) -> ContractResult<i64> {
    match dao.get_storage_item(contract_id, &[PREFIX_TOTAL_SUPPLY])? {
        Some(bytes) if bytes.len() == 8 => {
            Ok(i64::from_le_bytes(bytes.try_into().expect("length checked")))
        }
        Some(_) => Err(ContractError::Storage("supply record malformed".to_string())),
        None => Ok(0),
    }
}

fn write_balance(dao: &mut DataCache, contract_id: i32, account: &UInt160, balance: i64) {
    let key = account_key(account);
    if balance == 0 {
        dao.delete_storage_item(contract_id, &key);
    } else {
        dao.put_storage_item(contract_id, &key, balance.to_le_bytes().to_vec());
    }
}

fn write_supply(dao: &mut DataCache, contract_id: i32, supply: i64) {
    dao.put_storage_item(
        contract_id,
        &[PREFIX_TOTAL_SUPPLY],
        supply.to_le_bytes().to_vec(),
    );
}

/// Creates `amount` tokens on `account`.
pub fn mint(
    engine: &mut ApplicationEngine,
    contract: UInt160,
    contract_id: i32,
    account: &UInt160,
    amount: i64,
) -> ContractResult<()> {
    if amount < 0 {
        return Err(ContractError::native("mint of a negative amount"));
    }
    if amount == 0 {
        return Ok(());
    }
    let balance = balance_of(engine.dao(), contract_id, account)?;
    let supply = total_supply(engine.dao(), contract_id)?;
    write_balance(engine.dao_mut(), contract_id, account, balance + amount);
    write_supply(engine.dao_mut(), contract_id, supply + amount);
    engine.emit_event(
        contract,
        "Transfer",
        vec!["null".to_string(), account.to_string(), amount.to_string()],
    );
    Ok(())
}

/// Destroys `amount` tokens held by `account`.
pub fn burn(
    engine: &mut ApplicationEngine,
    contract: UInt160,
    contract_id: i32,
    account: &UInt160,
    amount: i64,
) -> ContractResult<()> {
    if amount < 0 {
        return Err(ContractError::native("burn of a negative amount"));
    }
    if amount == 0 {
        return Ok(());
    }
    let balance = balance_of(engine.dao(), contract_id, account)?;
    if balance < amount {
        return Err(ContractError::native(format!(
            "burn of {amount} exceeds balance {balance}"
        )));
    }
    let supply = total_supply(engine.dao(), contract_id)?;
    write_balance(engine.dao_mut(), contract_id, account, balance - amount);
    write_supply(engine.dao_mut(), contract_id, supply - amount);
    engine.emit_event(
        contract,
        "Transfer",
        vec![account.to_string(), "null".to_string(), amount.to_string()],
    );
    Ok(())
}

/// Moves `amount` tokens, requiring the sender's witness.
pub fn transfer(
    engine: &mut ApplicationEngine,
    contract: UInt160,
    contract_id: i32,
    from: &UInt160,
    to: &UInt160,
    amount: i64,
) -> ContractResult<bool> {
    if amount < 0 {
        return Err(ContractError::native("transfer of a negative amount"));
    }
    if !engine.check_witness(from)? {
        return Ok(false);
    }
    let from_balance = balance_of(engine.dao(), contract_id, from)?;
    if from_balance < amount {
        return Ok(false);
    }
    if from != to && amount > 0 {
        let to_balance = balance_of(engine.dao(), contract_id, to)?;
        write_balance(engine.dao_mut(), contract_id, from, from_balance - amount);
        write_balance(engine.dao_mut(), contract_id, to, to_balance + amount);
    }
    engine.emit_event(
        contract,
        "Transfer",
        vec![from.to_string(), to.to_string(), amount.to_string()],
    );
    Ok(true)
}

/// Decodes a 20-byte account argument.
pub(crate) fn account_arg(args: &[StackItem], index: usize) -> ContractResult<UInt160> {
    let bytes = args
        .get(index)
        .ok_or_else(|| ContractError::native(format!("missing argument {index}")))?
        .try_bytes()?;
    Ok(UInt160::from_bytes(&bytes)?)
}

/// Decodes an integer argument that must fit an i64.
pub(crate) fn int_arg(args: &[StackItem], index: usize) -> ContractResult<i64> {
    use num_traits::ToPrimitive;
    let value = args
        .get(index)
        .ok_or_else(|| ContractError::native(format!("missing argument {index}")))?
        .try_integer()?;
    value
        .to_i64()
        .ok_or_else(|| ContractError::native(format!("argument {index} out of range")))
}
