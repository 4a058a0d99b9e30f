//! The blockchain orchestrator.
//!
//! Serializes all writes through one persist mutex: header validation, VM
//! execution, the MPT advance and the atomic commit happen inside it.
//! Read-only views run on fresh DAO snapshots over the committed store and
//! never block the writer.

use crate::state_root::verify_state_root_witness;
use crate::witness::verify_multisig_witness;
use crate::{BlockchainEvents, Feer, LedgerError, LedgerResult, Mempool, VerifyResult};
use neo3_config::{ProtocolSettings, MAX_TRANSACTIONS_PER_BLOCK, MAX_TRANSACTION_SIZE};
use neo3_core::{Block, Header, Transaction, UInt160, UInt256, Witness};
use neo3_cryptography::{multisig_redeem_script, ECPoint};
use neo3_io::SerializableExt;
use neo3_mpt_trie::{MptResult, NodeStore, StateRoot, Trie};
use neo3_persistence::{keys, DataCache, Store};
use neo3_smart_contract::native::{GasToken, NativeRegistry, PolicyContract, Role, RoleManagement};
use neo3_smart_contract::{ApplicationEngine, ApplicationExecResult, TriggerType};
use neo3_vm::{CallFlags, VMState};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Timestamp of the genesis block, in milliseconds.
const GENESIS_TIMESTAMP: u64 = 1_468_595_301_000;

/// Nonce of the genesis block.
const GENESIS_NONCE: u64 = 2_083_236_893;

/// GAS distributed to the committee at genesis, in datoshi.
const GENESIS_GAS: i64 = 52_000_000 * 100_000_000;

/// Gas budget of test invocations, in datoshi.
const TEST_GAS: i64 = 2_000_000_000;

/// Adapter exposing DAO-backed MPT nodes to the trie.
struct DaoNodes<'a>(&'a DataCache);

impl NodeStore for DaoNodes<'_> {
    fn get_node(&self, hash: &UInt256) -> MptResult<Option<Vec<u8>>> {
        self.0
            .get_mpt_node(hash)
            .map_err(|e| neo3_mpt_trie::MptError::InvalidFormat(e.to_string()))
    }
}

/// The blockchain state machine.
pub struct Blockchain {
    settings: Arc<ProtocolSettings>,
    store: Arc<dyn Store>,
    natives: NativeRegistry,
    mempool: RwLock<Mempool>,
    events: BlockchainEvents,
    persist_lock: Mutex<()>,
    /// Set after a fatal storage failure; every further write is refused.
    halted: AtomicBool,
}

impl Blockchain {
    /// Opens (or bootstraps) a chain over `store`.
    pub fn new(settings: Arc<ProtocolSettings>, store: Arc<dyn Store>) -> LedgerResult<Arc<Self>> {
        let natives = NativeRegistry::new();
        let chain = Arc::new(Self {
            mempool: RwLock::new(Mempool::new(settings.mem_pool_size)),
            settings,
            store,
            natives,
            events: BlockchainEvents::new(),
            persist_lock: Mutex::new(()),
            halted: AtomicBool::new(false),
        });
        chain.bootstrap()?;
        Ok(chain)
    }

    /// A read-only DAO snapshot over the committed store.
    pub fn snapshot(&self) -> DataCache {
        DataCache::new(self.store.clone())
    }

    /// The network magic.
    pub fn network(&self) -> u32 {
        self.settings.network()
    }

    /// The protocol settings.
    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    /// The native registry shared by every engine of this chain.
    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Subscription endpoints.
    pub fn events(&self) -> &BlockchainEvents {
        &self.events
    }

    /// The committed chain height.
    pub fn height(&self) -> u32 {
        self.snapshot()
            .get_current_block_index()
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    /// The hash of the committed tip.
    pub fn current_block_hash(&self) -> LedgerResult<UInt256> {
        self.snapshot()
            .get_current_block_hash()?
            .ok_or_else(|| LedgerError::StateInconsistency("no current block".to_string()))
    }

    /// Gets a committed block by hash.
    pub fn block(&self, hash: &UInt256) -> LedgerResult<Option<Block>> {
        Ok(self.snapshot().get_block(hash)?)
    }

    /// Gets a committed block by height.
    pub fn block_by_index(&self, index: u32) -> LedgerResult<Option<Block>> {
        let snapshot = self.snapshot();
        match snapshot.get_block_hash(index)? {
            Some(hash) => Ok(snapshot.get_block(&hash)?),
            None => Ok(None),
        }
    }

    /// Gets a committed transaction and its height.
    pub fn transaction(&self, hash: &UInt256) -> LedgerResult<Option<(Transaction, u32)>> {
        Ok(self.snapshot().get_transaction(hash)?)
    }

    /// Gets the execution result of a committed transaction.
    pub fn exec_result(&self, hash: &UInt256) -> LedgerResult<Option<ApplicationExecResult>> {
        match self.snapshot().get_exec_result(hash)? {
            Some(bytes) => Ok(Some(ApplicationExecResult::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Gets the state root persisted for `index`.
    pub fn state_root(&self, index: u32) -> LedgerResult<Option<StateRoot>> {
        match self.snapshot().get_state_root(index)? {
            Some(bytes) => Ok(Some(StateRoot::from_array(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of pooled transactions.
    pub fn mempool_count(&self) -> usize {
        self.mempool.read().count()
    }

    /// Whether the pool holds `hash`.
    pub fn mempool_contains(&self, hash: &UInt256) -> bool {
        self.mempool.read().contains_key(hash)
    }

    /// Pooled transactions in priority order.
    pub fn pooled_transactions(&self) -> Vec<Arc<Transaction>> {
        self.mempool.read().get_verified_transactions()
    }

    /// Verifies and pools a relayed transaction.
    pub fn pool_tx(&self, transaction: Arc<Transaction>) -> Result<(), VerifyResult> {
        let hash = transaction.hash().map_err(|_| VerifyResult::Invalid)?;
        if self.mempool.read().contains_key(&hash) {
            return Err(VerifyResult::AlreadyExists);
        }
        if self.settings.verify_transactions {
            let verdict = self.verify_transaction(&transaction);
            if !verdict.is_ok() {
                return Err(verdict);
            }
        }
        self.mempool.write().add(transaction, self)
    }

    /// A throwaway engine over the current snapshot, for RPC
    /// `invokescript`-style calls.
    pub fn get_test_vm(
        &self,
        trigger: TriggerType,
        transaction: Option<Arc<Transaction>>,
        block: Option<Arc<Block>>,
    ) -> ApplicationEngine {
        ApplicationEngine::new(
            trigger,
            transaction,
            self.snapshot(),
            block,
            self.settings.clone(),
            self.natives.clone(),
            TEST_GAS,
        )
    }

    // === Verification ===

    /// Stateful transaction verification, per the relay rules.
    pub fn verify_transaction(&self, transaction: &Arc<Transaction>) -> VerifyResult {
        let snapshot = self.snapshot();
        self.verify_transaction_with(&snapshot, transaction)
    }

    fn verify_transaction_with(
        &self,
        snapshot: &DataCache,
        transaction: &Arc<Transaction>,
    ) -> VerifyResult {
        if transaction.network != 0 && transaction.network != self.network() {
            return VerifyResult::Invalid;
        }
        if transaction.size() > MAX_TRANSACTION_SIZE {
            return VerifyResult::OversizedTransaction;
        }
        if transaction.script.is_empty() {
            return VerifyResult::InvalidScript;
        }
        for signer in &transaction.signers {
            if signer.validate().is_err() {
                return VerifyResult::InvalidScope;
            }
        }
        if transaction.check_structure().is_err() {
            return VerifyResult::Invalid;
        }
        if !self.settings.p2p_sig_extensions
            && transaction
                .attributes
                .iter()
                .any(|a| a.attribute_type().requires_sig_extensions())
        {
            return VerifyResult::InvalidAttribute;
        }

        let height = self.height();
        if transaction.valid_until_block <= height
            || transaction.valid_until_block > height + self.settings.max_valid_until_block_increment
        {
            return VerifyResult::Expired;
        }
        for attribute in &transaction.attributes {
            if let neo3_core::TransactionAttribute::NotValidBefore { height: nvb } = attribute {
                if height < *nvb {
                    return VerifyResult::InvalidAttribute;
                }
            }
        }

        let hash = match transaction.hash() {
            Ok(hash) => hash,
            Err(_) => return VerifyResult::Invalid,
        };
        match snapshot.contains_transaction(&hash) {
            Ok(true) => return VerifyResult::AlreadyInBlock,
            Ok(false) => {}
            Err(_) => return VerifyResult::UnableToVerify,
        }
        // A transaction conflicting with one already on the chain is dead.
        for target in transaction.conflicts_hashes() {
            if snapshot.contains_transaction(&target).unwrap_or(false) {
                return VerifyResult::HasConflicts;
            }
        }

        for signer in &transaction.signers {
            if PolicyContract::is_blocked(snapshot, &signer.account).unwrap_or(false) {
                return VerifyResult::PolicyFail;
            }
        }

        // Oracle responses must be cosigned by the designated oracle
        // account.
        if transaction.oracle_response().is_some() {
            match self.natives.role_management.oracle_hash() {
                Some(oracle) if transaction.is_signed_by(&oracle) => {}
                _ => return VerifyResult::InvalidAttribute,
            }
        }

        let balance = GasToken::balance(snapshot, &transaction.sender()).unwrap_or(0);
        let total_fee = transaction
            .system_fee
            .saturating_add(transaction.network_fee);
        if balance < total_fee {
            return VerifyResult::InsufficientFunds;
        }

        let fee_per_byte = PolicyContract::fee_per_byte(snapshot)
            .unwrap_or(neo3_smart_contract::native::DEFAULT_FEE_PER_BYTE);
        let size_fee = transaction.size() as i64 * fee_per_byte;
        let verification_budget = transaction.network_fee - size_fee;
        if verification_budget < 0 {
            return VerifyResult::PolicyFail;
        }

        if self.settings.verify_transactions {
            if transaction.witnesses.len() != transaction.signers.len() {
                return VerifyResult::Invalid;
            }
            let mut remaining = verification_budget;
            for (signer, witness) in transaction.signers.iter().zip(&transaction.witnesses) {
                match self.verify_witness(transaction, &signer.account, witness, remaining) {
                    Some(spent) => remaining -= spent,
                    None => return VerifyResult::WitnessFail,
                }
                if remaining < 0 {
                    return VerifyResult::InsufficientFunds;
                }
            }
        }
        VerifyResult::Succeed
    }

    /// Runs one witness under the interop table within a gas budget.
    /// Returns the gas spent on success.
    fn verify_witness(
        &self,
        transaction: &Arc<Transaction>,
        account: &UInt160,
        witness: &Witness,
        gas_budget: i64,
    ) -> Option<i64> {
        if witness.verification_script.is_empty() || witness.script_hash() != *account {
            return None;
        }
        let mut engine = ApplicationEngine::new(
            TriggerType::Verification,
            Some(transaction.clone()),
            self.snapshot(),
            None,
            self.settings.clone(),
            self.natives.clone(),
            gas_budget.max(0),
        );
        // The verification context loads first; the invocation script runs
        // on top of it and leaves its pushes for the verifier.
        engine.load_script(witness.verification_script.clone(), CallFlags::READ_ONLY);
        if !witness.invocation_script.is_empty() {
            engine.load_script(witness.invocation_script.clone(), CallFlags::NONE);
        }
        let state = engine.execute();
        let spent = engine.gas_consumed();
        let passed = state == VMState::Halt && engine.result_top_bool().unwrap_or(false);
        if !passed {
            let (_, result) = engine.finish();
            debug!(%account, exception = ?result.exception, "witness verification failed");
            return None;
        }
        Some(spent)
    }

    // === Block acceptance ===

    /// Validates, executes and commits one block.
    pub fn add_block(&self, block: Block) -> LedgerResult<()> {
        let _guard = self.persist_lock.lock();
        if self.halted.load(Ordering::Acquire) {
            return Err(LedgerError::Halted);
        }
        let block = Arc::new(block);
        let cache = DataCache::new(self.store.clone());

        let current_index = cache
            .get_current_block_index()?
            .ok_or_else(|| LedgerError::StateInconsistency("chain not bootstrapped".to_string()))?;
        let current_hash = cache
            .get_current_block_hash()?
            .ok_or_else(|| LedgerError::StateInconsistency("chain not bootstrapped".to_string()))?;
        let header = &block.header;
        if header.index != current_index + 1 {
            return Err(LedgerError::InvalidBlock(format!(
                "index {} does not follow {current_index}",
                header.index
            )));
        }
        if header.prev_hash != current_hash {
            return Err(LedgerError::InvalidBlock("previous hash mismatch".to_string()));
        }
        let prev = cache
            .get_block(&current_hash)?
            .ok_or_else(|| LedgerError::StateInconsistency("tip block missing".to_string()))?;
        if header.timestamp <= prev.header.timestamp {
            return Err(LedgerError::InvalidBlock(format!(
                "timestamp {} not after {}",
                header.timestamp, prev.header.timestamp
            )));
        }
        if block.transactions.len() > MAX_TRANSACTIONS_PER_BLOCK {
            return Err(LedgerError::InvalidBlock("too many transactions".to_string()));
        }
        if block.compute_merkle_root()? != header.merkle_root {
            return Err(LedgerError::InvalidBlock("merkle root mismatch".to_string()));
        }
        let mut seen = HashSet::new();
        for transaction in &block.transactions {
            let hash = transaction.hash()?;
            if !seen.insert(hash) {
                return Err(LedgerError::InvalidBlock(format!("duplicate transaction {hash}")));
            }
            if cache.contains_transaction(&hash)? {
                return Err(LedgerError::InvalidBlock(format!(
                    "transaction {hash} already on chain"
                )));
            }
        }
        if self.settings.verify_blocks {
            let sign_data = header.sign_data(self.network())?;
            if !verify_multisig_witness(&sign_data, &header.witness, &prev.header.next_consensus) {
                return Err(LedgerError::InvalidBlock(
                    "consensus witness verification failed".to_string(),
                ));
            }
        }

        let (mut cache, results) = self.execute_block(cache, block.clone())?;
        self.advance_state_root(&mut cache, block.index())?;

        match cache.persist() {
            Ok(written) => {
                info!(
                    index = block.index(),
                    transactions = block.transactions.len(),
                    written,
                    "block committed"
                );
            }
            Err(e) => {
                // A failed commit leaves the store in an unknown state;
                // refuse any further writes.
                self.halted.store(true, Ordering::Release);
                error!(%e, "block commit failed, halting writes");
                return Err(LedgerError::Storage(e.to_string()));
            }
        }

        self.events.publish_block(block.clone());
        for (hash, result) in results {
            self.events.publish_exec_result(hash, result);
        }
        for transaction in &block.transactions {
            self.events.publish_transaction(Arc::new(transaction.clone()));
        }

        self.prune_mempool(&block);
        Ok(())
    }

    fn execute_block(
        &self,
        cache: DataCache,
        block: Arc<Block>,
    ) -> LedgerResult<(DataCache, Vec<(UInt256, ApplicationExecResult)>)> {
        // OnPersist: natives store the block and settle fees.
        let mut engine = ApplicationEngine::new(
            TriggerType::OnPersist,
            None,
            cache,
            Some(block.clone()),
            self.settings.clone(),
            self.natives.clone(),
            -1,
        );
        for native in self.natives.contracts() {
            native.on_persist(&mut engine)?;
        }
        let (mut cache, _) = engine.finish();

        let exec_fee_factor = PolicyContract::exec_fee_factor(&cache)?;
        let mut results = Vec::with_capacity(block.transactions.len());
        for transaction in &block.transactions {
            let transaction = Arc::new(transaction.clone());
            let hash = transaction.hash()?;

            // Each transaction executes over its own layer: merged on
            // halt, dropped on fault.
            let nested = cache.nest();
            let mut engine = ApplicationEngine::new(
                TriggerType::Application,
                Some(transaction.clone()),
                nested,
                Some(block.clone()),
                self.settings.clone(),
                self.natives.clone(),
                transaction.system_fee,
            );
            engine.vm().set_fee_factor(exec_fee_factor);
            engine.load_script(transaction.script.clone(), CallFlags::ALL);
            let state = engine.execute();
            let (nested, result) = engine.finish();
            cache = if state == VMState::Halt {
                nested.commit()
            } else {
                warn!(%hash, exception = ?result.exception, "transaction faulted");
                nested.discard()
            };
            if state == VMState::Halt {
                if let Some((id, _)) = transaction.oracle_response() {
                    neo3_smart_contract::native::OracleContract::finish_request(&mut cache, id);
                }
            }
            cache.put_exec_result(&hash, result.to_bytes()?);
            results.push((hash, result));
        }

        // PostPersist: reward distribution and cached-role refresh.
        let mut engine = ApplicationEngine::new(
            TriggerType::PostPersist,
            None,
            cache,
            Some(block),
            self.settings.clone(),
            self.natives.clone(),
            -1,
        );
        for native in self.natives.contracts() {
            native.post_persist(&mut engine)?;
        }
        let (cache, _) = engine.finish();
        Ok((cache, results))
    }

    /// Applies the accumulated state writes to the MPT in deterministic
    /// key order and stores the unsigned root for `height`.
    fn advance_state_root(&self, cache: &mut DataCache, height: u32) -> LedgerResult<()> {
        let prev_root = if height == 0 {
            None
        } else {
            match cache.get_state_root(height - 1)? {
                Some(bytes) => Some(StateRoot::from_array(&bytes)?.root),
                None => None,
            }
        };
        let changes: Vec<(Vec<u8>, Option<Vec<u8>>)> = cache
            .dirty_entries()
            .into_iter()
            .filter(|(key, _)| {
                matches!(
                    key.first(),
                    Some(&keys::ST_CONTRACT) | Some(&keys::ST_CONTRACT_ID) | Some(&keys::ST_STORAGE)
                )
            })
            .collect();

        let (root_hash, nodes) = {
            let mut trie = Trie::new(prev_root, DaoNodes(cache));
            for (key, value) in &changes {
                match value {
                    Some(value) => trie.put(key, value)?,
                    None => trie.delete(key)?,
                }
            }
            (trie.root_hash()?, trie.commit()?)
        };
        for (hash, bytes) in nodes {
            cache.put_mpt_node(&hash, bytes);
        }
        let root = StateRoot::new(height, root_hash);
        cache.put_state_root(height, root.to_array()?);
        Ok(())
    }

    fn prune_mempool(&self, block: &Arc<Block>) {
        let mut included = HashSet::new();
        let mut excluded_targets = HashSet::new();
        for transaction in &block.transactions {
            if let Ok(hash) = transaction.hash() {
                included.insert(hash);
            }
            for target in transaction.conflicts_hashes() {
                excluded_targets.insert(target);
            }
        }
        let height = block.index();
        self.mempool.write().remove_stale(
            move |pooled| {
                let Ok(hash) = pooled.hash() else {
                    return false;
                };
                if included.contains(&hash) || excluded_targets.contains(&hash) {
                    return false;
                }
                if pooled
                    .conflicts_hashes()
                    .iter()
                    .any(|target| included.contains(target))
                {
                    return false;
                }
                pooled.valid_until_block > height
            },
            self,
        );
    }

    // === State roots ===

    /// Accepts a witnessed state root, comparing it against the locally
    /// computed root for the same height.
    pub fn add_state_root(&self, root: StateRoot) -> LedgerResult<()> {
        let _guard = self.persist_lock.lock();
        if self.halted.load(Ordering::Acquire) {
            return Err(LedgerError::Halted);
        }
        let snapshot = self.snapshot();
        let local = match snapshot.get_state_root(root.index)? {
            Some(bytes) => StateRoot::from_array(&bytes)?,
            None => {
                return Err(LedgerError::InvalidStateRoot(format!(
                    "no local root at {}",
                    root.index
                )))
            }
        };
        if local.root != root.root {
            return Err(LedgerError::InvalidStateRoot(format!(
                "root mismatch at {}: local {} vs {}",
                root.index, local.root, root.root
            )));
        }
        let validators =
            RoleManagement::designated_by_role(&snapshot, Role::StateValidator, root.index)?;
        verify_state_root_witness(&root, &validators, self.network())?;

        let mut cache = DataCache::new(self.store.clone());
        cache.put_state_root(root.index, root.to_array()?);
        cache.persist().map_err(|e| {
            self.halted.store(true, Ordering::Release);
            LedgerError::Storage(e.to_string())
        })?;
        debug!(index = root.index, "witnessed state root stored");
        Ok(())
    }

    // === Bootstrap ===

    fn bootstrap(&self) -> LedgerResult<()> {
        let _guard = self.persist_lock.lock();
        let cache = DataCache::new(self.store.clone());
        if cache.get_current_block_index()?.is_some() {
            return Ok(());
        }
        info!("bootstrapping genesis state");
        let genesis = Arc::new(self.genesis_block()?);
        let mut cache = cache;

        // Register the native contracts.
        for native in self.natives.contracts() {
            let state = native.contract_state()?;
            cache.put_contract(&native.hash(), native.id(), state.to_bytes()?);
        }

        // OnPersist stores the genesis block; then the initial token
        // distribution goes to the committee.
        let mut engine = ApplicationEngine::new(
            TriggerType::OnPersist,
            None,
            cache,
            Some(genesis.clone()),
            self.settings.clone(),
            self.natives.clone(),
            -1,
        );
        for native in self.natives.contracts() {
            native.on_persist(&mut engine)?;
        }
        if !self.settings.standby_committee.is_empty() {
            let committee =
                neo3_smart_contract::committee_address(&self.settings).map_err(LedgerError::from)?;
            self.natives.neo.initialize(&mut engine, &committee)?;
            self.natives.gas.mint(&mut engine, &committee, GENESIS_GAS)?;
        }
        let (mut cache, _) = engine.finish();

        // The standby validators open the state-validator role.
        if self.settings.validators_count > 0 {
            let points = self
                .settings
                .validator_keys()
                .map_err(|e| LedgerError::StateInconsistency(e.to_string()))?
                .iter()
                .map(|k| ECPoint::from_bytes(k))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| LedgerError::StateInconsistency(e.to_string()))?;
            RoleManagement::record_designation(&mut cache, Role::StateValidator, 0, &points)?;
        }

        self.advance_state_root(&mut cache, 0)?;
        cache.persist().map_err(|e| {
            self.halted.store(true, Ordering::Release);
            LedgerError::Storage(e.to_string())
        })?;
        info!(hash = %genesis.hash()?, "genesis committed");
        Ok(())
    }

    fn genesis_block(&self) -> LedgerResult<Block> {
        let next_consensus = if self.settings.validators_count > 0 {
            let points = self
                .settings
                .validator_keys()
                .map_err(|e| LedgerError::StateInconsistency(e.to_string()))?
                .iter()
                .map(|k| ECPoint::from_bytes(k))
                .collect::<Result<Vec<ECPoint>, _>>()
                .map_err(|e| LedgerError::StateInconsistency(e.to_string()))?;
            // BFT threshold for the consensus address.
            let m = points.len() - (points.len() - 1) / 3;
            let script = multisig_redeem_script(m, &points)
                .map_err(|e| LedgerError::StateInconsistency(e.to_string()))?;
            UInt160::from_script(&script)
        } else {
            UInt160::zero()
        };
        let mut block = Block {
            header: Header {
                version: 0,
                prev_hash: UInt256::zero(),
                timestamp: GENESIS_TIMESTAMP,
                nonce: GENESIS_NONCE,
                index: 0,
                primary: 0,
                next_consensus,
                witness: Witness::new(Vec::new(), vec![0x11]),
                ..Default::default()
            },
            transactions: Vec::new(),
        };
        block.rebuild_merkle_root()?;
        Ok(block)
    }
}

impl Feer for Blockchain {
    fn fee_per_byte(&self) -> i64 {
        PolicyContract::fee_per_byte(&self.snapshot())
            .unwrap_or(neo3_smart_contract::native::DEFAULT_FEE_PER_BYTE)
    }

    fn get_utility_token_balance(&self, account: &UInt160) -> i64 {
        GasToken::balance(&self.snapshot(), account).unwrap_or(0)
    }

    fn block_height(&self) -> u32 {
        self.height()
    }

    fn p2p_sig_extensions_enabled(&self) -> bool {
        self.settings.p2p_sig_extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_core::{Signer, WitnessScope};
    use neo3_cryptography::KeyPair;
    use neo3_persistence::MemoryStore;

    fn plain_settings() -> ProtocolSettings {
        ProtocolSettings {
            verify_blocks: false,
            verify_transactions: false,
            ..Default::default()
        }
    }

    fn test_chain(settings: ProtocolSettings) -> Arc<Blockchain> {
        Blockchain::new(Arc::new(settings), Arc::new(MemoryStore::new())).unwrap()
    }

    fn next_block(chain: &Blockchain, transactions: Vec<Transaction>) -> Block {
        let height = chain.height();
        let prev_hash = chain.current_block_hash().unwrap();
        let prev = chain.block(&prev_hash).unwrap().unwrap();
        let mut block = Block {
            header: Header {
                prev_hash,
                timestamp: prev.header.timestamp + 1000,
                index: height + 1,
                witness: Witness::new(Vec::new(), vec![0x11]),
                ..Default::default()
            },
            transactions,
        };
        block.rebuild_merkle_root().unwrap();
        block
    }

    fn pooled_tx(nonce: u32, valid_until: u32) -> Transaction {
        Transaction {
            nonce,
            valid_until_block: valid_until,
            signers: vec![Signer::new(
                UInt160::from_array([1u8; 20]),
                WitnessScope::CALLED_BY_ENTRY,
            )],
            script: vec![0x40],
            witnesses: vec![Witness::default()],
            ..Default::default()
        }
    }

    #[test]
    fn genesis_bootstraps_natives_and_root() {
        let chain = test_chain(plain_settings());
        assert_eq!(chain.height(), 0);
        let genesis = chain.block_by_index(0).unwrap().unwrap();
        assert!(genesis.header.prev_hash.is_zero());

        let snapshot = chain.snapshot();
        let gas_hash = chain.natives().gas.hash();
        assert!(snapshot.get_contract(&gas_hash).unwrap().is_some());
        assert_eq!(
            snapshot.get_contract_hash_by_id(-6).unwrap(),
            Some(gas_hash)
        );
        assert!(chain.state_root(0).unwrap().is_some());
    }

    #[test]
    fn genesis_funds_the_committee() {
        let key = KeyPair::generate();
        let mut settings = plain_settings();
        settings.standby_committee = vec![key.public_key().to_string()];
        settings.validators_count = 1;
        let chain = test_chain(settings);

        let committee =
            neo3_smart_contract::committee_address(chain.settings()).unwrap();
        assert_eq!(
            chain.get_utility_token_balance(&committee),
            GENESIS_GAS
        );
        // State validators are seeded from the standby set.
        let validators = RoleManagement::designated_by_role(
            &chain.snapshot(),
            Role::StateValidator,
            0,
        )
        .unwrap();
        assert_eq!(validators, vec![key.public_key()]);
    }

    #[test]
    fn empty_block_advances_the_chain_and_keeps_the_root() {
        let chain = test_chain(plain_settings());
        let root0 = chain.state_root(0).unwrap().unwrap();
        chain.add_block(next_block(&chain, Vec::new())).unwrap();
        assert_eq!(chain.height(), 1);
        let root1 = chain.state_root(1).unwrap().unwrap();
        // No state writes: the trie root is unchanged.
        assert_eq!(root1.root, root0.root);
        assert_eq!(root1.index, 1);
    }

    #[test]
    fn rejects_bad_linkage() {
        let chain = test_chain(plain_settings());

        let mut wrong_index = next_block(&chain, Vec::new());
        wrong_index.header.index = 5;
        assert!(matches!(
            chain.add_block(wrong_index),
            Err(LedgerError::InvalidBlock(_))
        ));

        let mut wrong_prev = next_block(&chain, Vec::new());
        wrong_prev.header.prev_hash = UInt256::from_array([9u8; 32]);
        assert!(matches!(
            chain.add_block(wrong_prev),
            Err(LedgerError::InvalidBlock(_))
        ));

        let mut stale_time = next_block(&chain, Vec::new());
        stale_time.header.timestamp = GENESIS_TIMESTAMP;
        assert!(matches!(
            chain.add_block(stale_time),
            Err(LedgerError::InvalidBlock(_))
        ));

        // Nothing was committed along the way.
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn rejects_merkle_mismatch() {
        let chain = test_chain(plain_settings());
        let mut block = next_block(&chain, vec![pooled_tx(1, 100)]);
        block.header.merkle_root = UInt256::from_array([7u8; 32]);
        assert!(matches!(
            chain.add_block(block),
            Err(LedgerError::InvalidBlock(_))
        ));
    }

    #[test]
    fn executed_transactions_persist_with_results() {
        let chain = test_chain(plain_settings());
        let transaction = pooled_tx(1, 100);
        let hash = transaction.hash().unwrap();
        chain
            .add_block(next_block(&chain, vec![transaction]))
            .unwrap();

        let (stored, height) = chain.transaction(&hash).unwrap().unwrap();
        assert_eq!(height, 1);
        assert_eq!(stored.hash().unwrap(), hash);
        let result = chain.exec_result(&hash).unwrap().unwrap();
        assert!(result.halted());
    }

    #[test]
    fn block_inclusion_prunes_the_mempool() {
        let chain = test_chain(plain_settings());
        let transaction = Arc::new(pooled_tx(1, 100));
        chain.pool_tx(transaction.clone()).unwrap();
        assert_eq!(chain.mempool_count(), 1);

        chain
            .add_block(next_block(&chain, vec![(*transaction).clone()]))
            .unwrap();
        assert_eq!(chain.mempool_count(), 0);
        assert!(!chain.mempool_contains(&transaction.hash().unwrap()));
    }

    #[test]
    fn expired_transactions_are_pruned_on_commit() {
        let chain = test_chain(plain_settings());
        // Valid only until height 1: dies when block 1 commits.
        let short_lived = Arc::new(pooled_tx(2, 1));
        chain.pool_tx(short_lived.clone()).unwrap();
        chain.add_block(next_block(&chain, Vec::new())).unwrap();
        assert!(!chain.mempool_contains(&short_lived.hash().unwrap()));
    }

    #[test]
    fn verify_rejects_expired_and_oversized() {
        let mut settings = plain_settings();
        settings.verify_transactions = true;
        let chain = test_chain(settings);

        let expired = Arc::new(pooled_tx(1, 0));
        assert_eq!(chain.verify_transaction(&expired), VerifyResult::Expired);

        let mut fat = pooled_tx(2, 100);
        fat.script = vec![0x40; MAX_TRANSACTION_SIZE];
        assert_eq!(
            chain.verify_transaction(&Arc::new(fat)),
            VerifyResult::OversizedTransaction
        );

        // An unfunded sender cannot pay fees.
        let mut costly = pooled_tx(3, 100);
        costly.network_fee = 1_000_000;
        assert_eq!(
            chain.verify_transaction(&Arc::new(costly)),
            VerifyResult::InsufficientFunds
        );
    }

    #[test]
    fn witness_verification_runs_under_the_vm() {
        let key = KeyPair::generate();
        let mut settings = plain_settings();
        settings.standby_committee = vec![key.public_key().to_string()];
        settings.validators_count = 1;
        settings.verify_transactions = true;
        let chain = test_chain(settings);
        let committee = neo3_smart_contract::committee_address(chain.settings()).unwrap();

        let verification = multisig_redeem_script(1, &[key.public_key()]).unwrap();
        let mut transaction = Transaction {
            nonce: 7,
            network_fee: 10_000_000,
            valid_until_block: 100,
            signers: vec![Signer::new(committee, WitnessScope::CALLED_BY_ENTRY)],
            script: vec![0x40],
            network: chain.network(),
            ..Default::default()
        };
        let signature = key.sign(&transaction.sign_data(chain.network()).unwrap());
        transaction.witnesses = vec![Witness::new(
            crate::witness::build_invocation(&[signature]),
            verification,
        )];
        let transaction = Arc::new(transaction);
        assert_eq!(chain.verify_transaction(&transaction), VerifyResult::Succeed);

        // A corrupted signature fails witness verification; the unsigned
        // body (and so the hash) is untouched.
        let mut tampered = (*transaction).clone();
        tampered.witnesses[0].invocation_script[10] ^= 0x01;
        assert_eq!(
            chain.verify_transaction(&Arc::new(tampered)),
            VerifyResult::WitnessFail
        );
    }

    #[test]
    fn state_roots_are_deterministic_across_chains() {
        let build = || {
            let chain = test_chain(plain_settings());
            chain.add_block(next_block(&chain, vec![pooled_tx(1, 100)])).unwrap();
            chain.add_block(next_block(&chain, Vec::new())).unwrap();
            chain.state_root(2).unwrap().unwrap().root
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_vm_runs_against_the_snapshot() {
        let chain = test_chain(plain_settings());
        let mut engine = chain.get_test_vm(TriggerType::Application, None, None);
        // PUSH1 PUSH2 ADD RET
        engine.load_script(vec![0x11, 0x12, 0x9E, 0x40], CallFlags::READ_ONLY);
        assert_eq!(engine.execute(), VMState::Halt);
        assert!(engine.gas_consumed() > 0);
    }
}
