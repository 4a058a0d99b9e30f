//! The Ledger native contract: read access to blocks and transactions,
//! and their persistence during OnPersist.

use super::{native_hash, NativeContract, NativeMethod};
use crate::application_engine::ApplicationEngine;
use crate::{ContractError, ContractResult};
use neo3_core::{UInt160, UInt256};
use neo3_vm::StackItem;

/// The Ledger contract.
pub struct LedgerContract {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl LedgerContract {
    pub const ID: i32 = -4;
    pub const NAME: &'static str = "LedgerContract";

    pub fn new() -> Self {
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::safe("currentHash", 1 << 15, 0),
                NativeMethod::safe("currentIndex", 1 << 15, 0),
                NativeMethod::safe("getBlock", 1 << 16, 1),
                NativeMethod::safe("getTransaction", 1 << 15, 1),
                NativeMethod::safe("getTransactionHeight", 1 << 15, 1),
            ],
        }
    }
}

impl Default for LedgerContract {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for LedgerContract {
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
            "currentHash" => {
                let hash = engine.dao().get_current_block_hash()?.unwrap_or_default();
                Ok(Some(StackItem::from_bytes(hash.to_vec())))
            }
            "currentIndex" => {
                let index = engine.dao().get_current_block_index()?.unwrap_or(0);
                Ok(Some(StackItem::from_int(index as i64)))
            }
            "getBlock" => {
                let bytes = args
                    .first()
                    .ok_or_else(|| ContractError::native("missing block id"))?
                    .try_bytes()?;
                // Accepts a 32-byte hash or a little-endian index.
                let hash = if bytes.len() == 32 {
                    Some(UInt256::from_bytes(&bytes)?)
                } else {
                    let mut index_bytes = [0u8; 4];
                    index_bytes[..bytes.len().min(4)].copy_from_slice(&bytes[..bytes.len().min(4)]);
                    engine.dao().get_block_hash(u32::from_le_bytes(index_bytes))?
                };
                let block = match hash {
                    Some(hash) => engine.dao().get_block(&hash)?,
                    None => None,
                };
                match block {
                    Some(block) => Ok(Some(StackItem::struct_of(vec![
                        StackItem::from_bytes(block.hash()?.to_vec()),
                        StackItem::from_int(block.index() as i64),
                        StackItem::from_int(block.header.timestamp as i64),
                        StackItem::from_int(block.transactions.len() as i64),
                    ]))),
                    None => Ok(Some(StackItem::Null)),
                }
            }
            "getTransaction" => {
                let hash = UInt256::from_bytes(
                    &args
                        .first()
                        .ok_or_else(|| ContractError::native("missing hash"))?
                        .try_bytes()?,
                )?;
                match engine.dao().get_transaction(&hash)? {
                    Some((transaction, _)) => Ok(Some(StackItem::struct_of(vec![
                        StackItem::from_bytes(transaction.hash()?.to_vec()),
                        StackItem::from_int(transaction.nonce as i64),
                        StackItem::from_bytes(transaction.sender().to_vec()),
                        StackItem::from_int(transaction.system_fee),
                        StackItem::from_int(transaction.network_fee),
                        StackItem::from_int(transaction.valid_until_block as i64),
                        StackItem::from_bytes(transaction.script.clone()),
                    ]))),
                    None => Ok(Some(StackItem::Null)),
                }
            }
            "getTransactionHeight" => {
                let hash = UInt256::from_bytes(
                    &args
                        .first()
                        .ok_or_else(|| ContractError::native("missing hash"))?
                        .try_bytes()?,
                )?;
                match engine.dao().get_transaction(&hash)? {
                    Some((_, height)) => Ok(Some(StackItem::from_int(height as i64))),
                    None => Ok(Some(StackItem::from_int(-1))),
                }
            }
            other => Err(ContractError::MethodNotFound(format!(
                "LedgerContract.{other}"
            ))),
        }
    }

    /// Persists the block and its transactions into the DAO. The index
    /// mapping, the transaction records and the current pointer all land
    /// in the same root batch as the storage diffs.
    fn on_persist(&self, engine: &mut ApplicationEngine) -> ContractResult<()> {
        let Some(block) = engine.persisting_block().cloned() else {
            return Ok(());
        };
        engine.dao_mut().put_block(&block)?;
        for transaction in &block.transactions {
            engine.dao_mut().put_transaction(transaction, block.index())?;
        }
        engine
            .dao_mut()
            .set_current_block(&block.hash()?, block.index());
        Ok(())
    }
}
