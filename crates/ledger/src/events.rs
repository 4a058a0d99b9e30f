//! Broadcast channels consumed by the P2P and RPC server adapters.

use neo3_core::{Block, Transaction, UInt256};
use neo3_smart_contract::ApplicationExecResult;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Subscription endpoints for committed blocks, their transactions and the
/// execution results. Senders never block; lagging receivers observe a
/// `Lagged` error from the broadcast channel.
pub struct BlockchainEvents {
    blocks: broadcast::Sender<Arc<Block>>,
    transactions: broadcast::Sender<Arc<Transaction>>,
    exec_results: broadcast::Sender<Arc<(UInt256, ApplicationExecResult)>>,
}

impl BlockchainEvents {
    pub fn new() -> Self {
        let (blocks, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (transactions, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (exec_results, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            blocks,
            transactions,
            exec_results,
        }
    }

    /// Subscribes to committed blocks.
    pub fn subscribe_blocks(&self) -> broadcast::Receiver<Arc<Block>> {
        self.blocks.subscribe()
    }

    /// Subscribes to committed transactions.
    pub fn subscribe_transactions(&self) -> broadcast::Receiver<Arc<Transaction>> {
        self.transactions.subscribe()
    }

    /// Subscribes to application execution results.
    pub fn subscribe_exec_results(
        &self,
    ) -> broadcast::Receiver<Arc<(UInt256, ApplicationExecResult)>> {
        self.exec_results.subscribe()
    }

    pub(crate) fn publish_block(&self, block: Arc<Block>) {
        let _ = self.blocks.send(block);
    }

    pub(crate) fn publish_transaction(&self, transaction: Arc<Transaction>) {
        let _ = self.transactions.send(transaction);
    }

    pub(crate) fn publish_exec_result(&self, hash: UInt256, result: ApplicationExecResult) {
        let _ = self.exec_results.send(Arc::new((hash, result)));
    }
}

impl Default for BlockchainEvents {
    fn default() -> Self {
        Self::new()
    }
}
