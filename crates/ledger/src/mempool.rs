//! The memory pool: a bounded, sorted container of unconfirmed
//! transactions with sender fee accounting and conflict tracking.

use crate::VerifyResult;
use lazy_static::lazy_static;
use neo3_core::{AttributeType, Transaction, UInt160, UInt256};
use prometheus::IntGauge;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    static ref MEMPOOL_SIZE: IntGauge = prometheus::register_int_gauge!(
        "neo_mempool_size",
        "Number of verified transactions in the memory pool"
    )
    .expect("gauge registration cannot fail with a unique name");
}

/// Fee and height context the pool needs from the chain.
pub trait Feer {
    /// The policy network-fee-per-byte floor.
    fn fee_per_byte(&self) -> i64;

    /// The sender's GAS balance.
    fn get_utility_token_balance(&self, account: &UInt160) -> i64;

    /// The current chain height.
    fn block_height(&self) -> u32;

    /// Whether the `Conflicts`/`NotValidBefore`/`NotaryAssisted`
    /// attributes are enabled.
    fn p2p_sig_extensions_enabled(&self) -> bool;
}

/// Callback handed stale-but-valid transactions for re-broadcast. Must not
/// block; heavy work belongs on the caller's executor.
pub type ResendCallback = Arc<dyn Fn(Arc<Transaction>) + Send + Sync>;

#[derive(Clone)]
struct PoolItem {
    transaction: Arc<Transaction>,
    hash: UInt256,
    high_priority: bool,
    fee_per_byte: i64,
    net_fee: i64,
    /// Height at which the item entered the pool.
    block_stamp: u32,
}

impl PoolItem {
    fn new(transaction: Arc<Transaction>, hash: UInt256, block_stamp: u32) -> Self {
        Self {
            high_priority: transaction.has_attribute(AttributeType::HighPriority),
            fee_per_byte: transaction.fee_per_byte(),
            net_fee: transaction.network_fee,
            transaction,
            hash,
            block_stamp,
        }
    }

    /// Priority ordering: the high-priority class wins outright, then
    /// fee-per-byte, then the raw network fee. The final tie-break on the
    /// raw fee keeps dust ordering independent of the policy floor.
    fn cmp_priority(&self, other: &Self) -> Ordering {
        self.high_priority
            .cmp(&other.high_priority)
            .then(self.fee_per_byte.cmp(&other.fee_per_byte))
            .then(self.net_fee.cmp(&other.net_fee))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SenderFee {
    balance: i64,
    fee_sum: i64,
}

/// The pool. Callers serialize access through one mutex; the structure
/// itself is single-writer.
pub struct Mempool {
    capacity: usize,
    resend_threshold: u32,
    resender: Option<ResendCallback>,
    verified_map: HashMap<UInt256, PoolItem>,
    /// Descending by priority; the tail is the first eviction candidate.
    verified_txes: Vec<PoolItem>,
    fees: HashMap<UInt160, SenderFee>,
    /// Target hash to the pooled transactions declaring a conflict with it.
    conflicts: HashMap<UInt256, Vec<UInt256>>,
    /// Oracle response id to the single pooled response transaction.
    oracle_resp: HashMap<u64, UInt256>,
}

impl Mempool {
    /// Creates a pool bounded to `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            resend_threshold: 4,
            resender: None,
            verified_map: HashMap::new(),
            verified_txes: Vec::new(),
            fees: HashMap::new(),
            conflicts: HashMap::new(),
            oracle_resp: HashMap::new(),
        }
    }

    /// Registers the re-broadcast callback.
    pub fn set_resend_callback(&mut self, threshold: u32, callback: ResendCallback) {
        self.resend_threshold = threshold;
        self.resender = Some(callback);
    }

    /// Number of pooled transactions.
    pub fn count(&self) -> usize {
        self.verified_txes.len()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the pool holds `hash`.
    pub fn contains_key(&self, hash: &UInt256) -> bool {
        self.verified_map.contains_key(hash)
    }

    /// Gets a pooled transaction.
    pub fn try_get_value(&self, hash: &UInt256) -> Option<Arc<Transaction>> {
        self.verified_map.get(hash).map(|i| i.transaction.clone())
    }

    /// All pooled transactions in priority order, best first.
    pub fn get_verified_transactions(&self) -> Vec<Arc<Transaction>> {
        self.verified_txes
            .iter()
            .map(|i| i.transaction.clone())
            .collect()
    }

    /// Admits a transaction.
    pub fn add(&mut self, transaction: Arc<Transaction>, feer: &dyn Feer) -> Result<(), VerifyResult> {
        let hash = transaction.hash().map_err(|_| VerifyResult::Invalid)?;
        if self.verified_map.contains_key(&hash) {
            return Err(VerifyResult::AlreadyExists);
        }
        if !feer.p2p_sig_extensions_enabled()
            && transaction
                .attributes
                .iter()
                .any(|a| a.attribute_type().requires_sig_extensions())
        {
            return Err(VerifyResult::InvalidAttribute);
        }

        let mut to_remove: Vec<UInt256> = Vec::new();

        // Pooled transactions that declared a conflict with this one: each
        // must rank below the newcomer by raw fee and be cosigned by the
        // newcomer's sender, otherwise the attribute blocks admission.
        if let Some(holders) = self.conflicts.get(&hash) {
            for holder_hash in holders {
                let holder = &self.verified_map[holder_hash];
                if holder.net_fee >= transaction.network_fee
                    || !holder.transaction.is_signed_by(&transaction.sender())
                {
                    return Err(VerifyResult::ConflictsAttribute);
                }
                to_remove.push(*holder_hash);
            }
        }

        // Pooled transactions this one declares conflicts with: the
        // newcomer must be cosigned by the target's sender and pay a
        // strictly larger raw fee.
        for target in transaction.conflicts_hashes() {
            if let Some(existing) = self.verified_map.get(&target) {
                if !transaction.is_signed_by(&existing.transaction.sender())
                    || transaction.network_fee <= existing.net_fee
                {
                    return Err(VerifyResult::ConflictsAttribute);
                }
                to_remove.push(target);
            }
        }

        // Sender fee accounting: evictions of the sender's own
        // transactions release their committed fees first.
        let sender = transaction.sender();
        let own_fee = transaction
            .system_fee
            .saturating_add(transaction.network_fee);
        let balance = feer.get_utility_token_balance(&sender);
        if balance < own_fee {
            return Err(VerifyResult::InsufficientFunds);
        }
        let released: i64 = to_remove
            .iter()
            .filter_map(|h| self.verified_map.get(h))
            .filter(|item| item.transaction.sender() == sender)
            .map(|item| item.transaction.system_fee + item.transaction.network_fee)
            .sum();
        let committed = self.fees.get(&sender).map(|f| f.fee_sum).unwrap_or(0);
        if balance < committed - released + own_fee {
            return Err(VerifyResult::Conflict);
        }

        // One pooled response per oracle id; a better-paying response
        // displaces the current one.
        if let Some((id, _)) = transaction.oracle_response() {
            if let Some(existing_hash) = self.oracle_resp.get(&id).copied() {
                let existing = &self.verified_map[&existing_hash];
                if existing.net_fee >= transaction.network_fee {
                    return Err(VerifyResult::OracleResponse);
                }
                to_remove.push(existing_hash);
            }
        }

        for stale in to_remove {
            self.remove_item(&stale);
        }

        let item = PoolItem::new(transaction, hash, feer.block_height());
        let position = self
            .verified_txes
            .partition_point(|existing| existing.cmp_priority(&item) != Ordering::Less);
        if self.verified_txes.len() >= self.capacity {
            if position >= self.verified_txes.len() {
                return Err(VerifyResult::OutOfMemory);
            }
            let evicted = self
                .verified_txes
                .last()
                .map(|i| i.hash)
                .expect("pool at capacity is non-empty");
            self.remove_item(&evicted);
        }

        // Recompute: the eviction above may have shifted the position.
        let position = self
            .verified_txes
            .partition_point(|existing| existing.cmp_priority(&item) != Ordering::Less);
        self.index_item(&item);
        self.verified_txes.insert(position, item.clone());
        self.verified_map.insert(hash, item);
        self.fees.entry(sender).or_insert(SenderFee {
            balance,
            fee_sum: 0,
        });
        if let Some(fee) = self.fees.get_mut(&sender) {
            fee.balance = balance;
            fee.fee_sum += own_fee;
        }
        self.publish_size();
        debug!(%hash, count = self.count(), "transaction pooled");
        Ok(())
    }

    /// Removes a transaction and all derived index entries.
    pub fn remove(&mut self, hash: &UInt256, _feer: &dyn Feer) -> Option<Arc<Transaction>> {
        let removed = self.remove_item(hash);
        self.publish_size();
        removed
    }

    /// Re-validates every pooled transaction against `predicate` and the
    /// current fee floor, rebuilding the derived indices from scratch.
    /// Transactions whose age since pooling is a power-of-two multiple of
    /// the resend threshold are handed to the resend callback.
    pub fn remove_stale(
        &mut self,
        predicate: impl Fn(&Transaction) -> bool,
        feer: &dyn Feer,
    ) {
        let height = feer.block_height();
        let floor = feer.fee_per_byte();
        let extensions = feer.p2p_sig_extensions_enabled();

        let old = std::mem::take(&mut self.verified_txes);
        self.verified_map.clear();
        self.fees.clear();
        self.conflicts.clear();
        self.oracle_resp.clear();

        let mut resend: Vec<Arc<Transaction>> = Vec::new();
        for item in old {
            let transaction = &item.transaction;
            let keep = predicate(transaction)
                && item.fee_per_byte >= floor
                && (extensions
                    || !transaction
                        .attributes
                        .iter()
                        .any(|a| a.attribute_type().requires_sig_extensions()));
            if !keep {
                debug!(hash = %item.hash, "stale transaction dropped");
                continue;
            }
            if self.resender.is_some() && self.resend_threshold > 0 {
                let age = height.saturating_sub(item.block_stamp);
                if age >= self.resend_threshold {
                    let multiple = age / self.resend_threshold;
                    if age % self.resend_threshold == 0 && multiple.is_power_of_two() {
                        resend.push(transaction.clone());
                    }
                }
            }
            self.index_item(&item);
            let sender = transaction.sender();
            let fee = self.fees.entry(sender).or_insert_with(|| SenderFee {
                balance: feer.get_utility_token_balance(&sender),
                fee_sum: 0,
            });
            fee.fee_sum += transaction.system_fee + transaction.network_fee;
            self.verified_map.insert(item.hash, item.clone());
            self.verified_txes.push(item);
        }
        self.publish_size();

        if let Some(resender) = &self.resender {
            for transaction in resend {
                resender(transaction);
            }
        }
    }

    fn index_item(&mut self, item: &PoolItem) {
        for target in item.transaction.conflicts_hashes() {
            self.conflicts.entry(target).or_default().push(item.hash);
        }
        if let Some((id, _)) = item.transaction.oracle_response() {
            self.oracle_resp.insert(id, item.hash);
        }
    }

    fn remove_item(&mut self, hash: &UInt256) -> Option<Arc<Transaction>> {
        let item = self.verified_map.remove(hash)?;
        if let Some(position) = self.verified_txes.iter().position(|i| i.hash == *hash) {
            self.verified_txes.remove(position);
        }
        let sender = item.transaction.sender();
        if let Some(fee) = self.fees.get_mut(&sender) {
            fee.fee_sum -= item.transaction.system_fee + item.transaction.network_fee;
            if fee.fee_sum <= 0 {
                self.fees.remove(&sender);
            }
        }
        for target in item.transaction.conflicts_hashes() {
            if let Some(holders) = self.conflicts.get_mut(&target) {
                holders.retain(|h| h != hash);
                if holders.is_empty() {
                    self.conflicts.remove(&target);
                }
            }
        }
        if let Some((id, _)) = item.transaction.oracle_response() {
            if self.oracle_resp.get(&id) == Some(hash) {
                self.oracle_resp.remove(&id);
            }
        }
        Some(item.transaction)
    }

    fn publish_size(&self) {
        MEMPOOL_SIZE.set(self.verified_txes.len() as i64);
    }

    /// Internal consistency check used by the tests: the sorted list, the
    /// identity map and the per-sender sums must agree.
    #[cfg(test)]
    fn assert_consistent(&self, feer: &dyn Feer) {
        assert_eq!(self.verified_map.len(), self.verified_txes.len());
        for pair in self.verified_txes.windows(2) {
            assert_ne!(
                pair[0].cmp_priority(&pair[1]),
                Ordering::Less,
                "pool ordering violated"
            );
        }
        let mut sums: HashMap<UInt160, i64> = HashMap::new();
        for item in &self.verified_txes {
            *sums.entry(item.transaction.sender()).or_default() +=
                item.transaction.system_fee + item.transaction.network_fee;
        }
        for (sender, sum) in sums {
            assert!(
                sum <= feer.get_utility_token_balance(&sender),
                "sender {sender} over-committed"
            );
            assert_eq!(self.fees[&sender].fee_sum, sum);
        }
        // No conflicting pair is simultaneously pooled.
        let pooled: std::collections::HashSet<UInt256> =
            self.verified_map.keys().copied().collect();
        for item in &self.verified_txes {
            for target in item.transaction.conflicts_hashes() {
                assert!(
                    !pooled.contains(&target),
                    "conflicting pair present: {} and {target}",
                    item.hash
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_core::{
        OracleResponseCode, Signer, TransactionAttribute, Witness, WitnessScope,
    };
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct TestFeer {
        fee_per_byte: i64,
        balance: i64,
        height: u32,
    }

    impl Default for TestFeer {
        fn default() -> Self {
            Self {
                fee_per_byte: 0,
                balance: i64::MAX / 2,
                height: 100,
            }
        }
    }

    impl Feer for TestFeer {
        fn fee_per_byte(&self) -> i64 {
            self.fee_per_byte
        }

        fn get_utility_token_balance(&self, _account: &UInt160) -> i64 {
            self.balance
        }

        fn block_height(&self) -> u32 {
            self.height
        }

        fn p2p_sig_extensions_enabled(&self) -> bool {
            true
        }
    }

    fn tx_with(nonce: u32, net_fee: i64, sender: UInt160) -> Transaction {
        Transaction {
            nonce,
            network_fee: net_fee,
            valid_until_block: 1000,
            signers: vec![Signer::new(sender, WitnessScope::CALLED_BY_ENTRY)],
            script: vec![0x40],
            witnesses: vec![Witness::default()],
            ..Default::default()
        }
    }

    /// Builds a transaction with an exact encoded size, so fee-per-byte
    /// values in the tests come out to round numbers.
    fn tx_sized(nonce: u32, net_fee: i64, target_size: usize) -> Transaction {
        let mut length = target_size.saturating_sub(60).max(1);
        loop {
            let mut transaction = tx_with(nonce, net_fee, UInt160::zero());
            transaction.script = vec![0x40; length];
            let size = transaction.size();
            if size == target_size {
                return transaction;
            }
            // Adjust for var-int prefix growth and converge.
            length = (length as isize + target_size as isize - size as isize)
                .max(1) as usize;
        }
    }

    #[test]
    fn ordering_by_fee_per_byte_then_raw_fee() {
        let feer = TestFeer::default();
        let mut pool = Mempool::new(10);
        // fee-per-byte 10, 10 and 20; raw fees 10000, 20000 and 5000.
        let a = Arc::new(tx_sized(1, 10_000, 1000));
        let b = Arc::new(tx_sized(2, 20_000, 2000));
        let c = Arc::new(tx_sized(3, 5_000, 250));
        assert_eq!(a.fee_per_byte(), 10);
        assert_eq!(b.fee_per_byte(), 10);
        assert_eq!(c.fee_per_byte(), 20);

        pool.add(a.clone(), &feer).unwrap();
        pool.add(b.clone(), &feer).unwrap();
        pool.add(c.clone(), &feer).unwrap();
        pool.assert_consistent(&feer);

        let order: Vec<i64> = pool
            .get_verified_transactions()
            .iter()
            .map(|t| t.network_fee)
            .collect();
        assert_eq!(order, vec![5_000, 20_000, 10_000]);
    }

    #[test]
    fn high_priority_bypasses_fee_ordering() {
        let feer = TestFeer::default();
        let mut pool = Mempool::new(10);
        let rich = Arc::new(tx_with(1, 1_000_000, UInt160::zero()));
        let mut urgent = tx_with(2, 1, UInt160::zero());
        urgent.attributes.push(TransactionAttribute::HighPriority);
        let urgent = Arc::new(urgent);

        pool.add(rich, &feer).unwrap();
        pool.add(urgent.clone(), &feer).unwrap();
        assert_eq!(
            pool.get_verified_transactions()[0].hash().unwrap(),
            urgent.hash().unwrap()
        );
        pool.assert_consistent(&feer);
    }

    #[test]
    fn duplicate_rejected() {
        let feer = TestFeer::default();
        let mut pool = Mempool::new(10);
        let tx = Arc::new(tx_with(1, 100, UInt160::zero()));
        pool.add(tx.clone(), &feer).unwrap();
        assert_eq!(pool.add(tx, &feer), Err(VerifyResult::AlreadyExists));
    }

    #[test]
    fn conflicts_eviction_and_rejection() {
        let feer = TestFeer::default();
        let sender_a = UInt160::from_array([1u8; 20]);
        let sender_b = UInt160::from_array([2u8; 20]);

        // B pays more than A, is cosigned by A's sender and declares a
        // conflict with A: A is evicted.
        let mut pool = Mempool::new(10);
        let a = Arc::new(tx_with(1, 100, sender_a));
        pool.add(a.clone(), &feer).unwrap();

        let mut b = tx_with(2, 150, sender_b);
        b.signers
            .push(Signer::new(sender_a, WitnessScope::CALLED_BY_ENTRY));
        b.witnesses.push(Witness::default());
        b.attributes.push(TransactionAttribute::Conflicts {
            hash: a.hash().unwrap(),
        });
        pool.add(Arc::new(b), &feer).unwrap();
        assert!(!pool.contains_key(&a.hash().unwrap()));
        assert_eq!(pool.count(), 1);
        pool.assert_consistent(&feer);

        // With A pooled again in a fresh pool, an equal-fee challenger is
        // rejected: the fee must be strictly larger.
        let mut pool = Mempool::new(10);
        pool.add(a.clone(), &feer).unwrap();
        let mut c = tx_with(3, 100, sender_b);
        c.signers
            .push(Signer::new(sender_a, WitnessScope::CALLED_BY_ENTRY));
        c.witnesses.push(Witness::default());
        c.attributes.push(TransactionAttribute::Conflicts {
            hash: a.hash().unwrap(),
        });
        assert_eq!(
            pool.add(Arc::new(c), &feer),
            Err(VerifyResult::ConflictsAttribute)
        );
        assert!(pool.contains_key(&a.hash().unwrap()));
        pool.assert_consistent(&feer);
    }

    #[test]
    fn conflicts_require_cosigner() {
        let feer = TestFeer::default();
        let sender_a = UInt160::from_array([1u8; 20]);
        let sender_b = UInt160::from_array([2u8; 20]);
        let mut pool = Mempool::new(10);
        let a = Arc::new(tx_with(1, 100, sender_a));
        pool.add(a.clone(), &feer).unwrap();

        // Higher fee but not cosigned by A's sender: rejected.
        let mut b = tx_with(2, 150, sender_b);
        b.attributes.push(TransactionAttribute::Conflicts {
            hash: a.hash().unwrap(),
        });
        assert_eq!(
            pool.add(Arc::new(b), &feer),
            Err(VerifyResult::ConflictsAttribute)
        );
    }

    #[test]
    fn oracle_response_collision() {
        let feer = TestFeer::default();
        let mut pool = Mempool::new(10);
        let response = |nonce: u32, fee: i64| {
            let mut tx = tx_with(nonce, fee, UInt160::zero());
            tx.attributes.push(TransactionAttribute::OracleResponse {
                id: 42,
                code: OracleResponseCode::Success,
                result: Vec::new(),
            });
            Arc::new(tx)
        };

        let x = response(1, 10);
        pool.add(x.clone(), &feer).unwrap();

        // A better-paying response displaces the pooled one.
        let y = response(2, 11);
        pool.add(y.clone(), &feer).unwrap();
        assert!(!pool.contains_key(&x.hash().unwrap()));
        assert!(pool.contains_key(&y.hash().unwrap()));

        // An equal-fee response is rejected.
        let z = response(3, 11);
        assert_eq!(pool.add(z, &feer), Err(VerifyResult::OracleResponse));
        assert_eq!(pool.count(), 1);
        pool.assert_consistent(&feer);
    }

    #[test]
    fn capacity_eviction_prefers_the_tail() {
        let feer = TestFeer::default();
        let mut pool = Mempool::new(2);
        let low = Arc::new(tx_with(1, 10, UInt160::zero()));
        let mid = Arc::new(tx_with(2, 20, UInt160::zero()));
        let high = Arc::new(tx_with(3, 30, UInt160::zero()));

        pool.add(low.clone(), &feer).unwrap();
        pool.add(mid, &feer).unwrap();
        // The pool is full; a better transaction evicts the tail.
        pool.add(high, &feer).unwrap();
        assert!(!pool.contains_key(&low.hash().unwrap()));
        assert_eq!(pool.count(), 2);

        // A transaction that would rank last is refused outright.
        let worst = Arc::new(tx_with(4, 1, UInt160::zero()));
        assert_eq!(pool.add(worst, &feer), Err(VerifyResult::OutOfMemory));
        pool.assert_consistent(&feer);
    }

    #[test]
    fn insufficient_funds_and_cumulative_conflict() {
        let sender = UInt160::from_array([9u8; 20]);
        let feer = TestFeer {
            balance: 100,
            ..Default::default()
        };
        let mut pool = Mempool::new(10);

        // Own fee exceeds the balance outright.
        let rich = Arc::new(tx_with(1, 150, sender));
        assert_eq!(pool.add(rich, &feer), Err(VerifyResult::InsufficientFunds));

        // Two transactions summing over the balance: the second is a
        // cumulative conflict.
        pool.add(Arc::new(tx_with(2, 60, sender)), &feer).unwrap();
        assert_eq!(
            pool.add(Arc::new(tx_with(3, 60, sender)), &feer),
            Err(VerifyResult::Conflict)
        );
        pool.assert_consistent(&feer);
    }

    #[test]
    fn add_then_remove_restores_the_pre_state() {
        let feer = TestFeer::default();
        let mut pool = Mempool::new(10);
        let mut tx = tx_with(1, 100, UInt160::from_array([3u8; 20]));
        tx.attributes.push(TransactionAttribute::Conflicts {
            hash: UInt256::from_array([0xCC; 32]),
        });
        tx.attributes.push(TransactionAttribute::OracleResponse {
            id: 7,
            code: OracleResponseCode::Success,
            result: Vec::new(),
        });
        let tx = Arc::new(tx);
        let hash = tx.hash().unwrap();

        pool.add(tx, &feer).unwrap();
        pool.remove(&hash, &feer);

        assert_eq!(pool.count(), 0);
        assert!(pool.fees.is_empty());
        assert!(pool.conflicts.is_empty());
        assert!(pool.oracle_resp.is_empty());
        assert!(pool.verified_map.is_empty());
    }

    #[test]
    fn remove_stale_enforces_new_fee_floor() {
        let mut feer = TestFeer::default();
        let mut pool = Mempool::new(10);
        // Exactly 1000 datoshi per byte.
        let tx = Arc::new(tx_sized(1, 100_000, 100));
        assert_eq!(tx.fee_per_byte(), 1000);
        pool.add(tx.clone(), &feer).unwrap();

        feer.fee_per_byte = 1000;
        pool.remove_stale(|_| true, &feer);
        assert!(pool.contains_key(&tx.hash().unwrap()));

        feer.fee_per_byte = 1001;
        pool.remove_stale(|_| true, &feer);
        assert!(!pool.contains_key(&tx.hash().unwrap()));
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn remove_stale_applies_predicate_and_rebuilds_indices() {
        let feer = TestFeer::default();
        let mut pool = Mempool::new(10);
        let keep = Arc::new(tx_with(1, 200, UInt160::zero()));
        let drop_me = Arc::new(tx_with(2, 100, UInt160::zero()));
        pool.add(keep.clone(), &feer).unwrap();
        pool.add(drop_me.clone(), &feer).unwrap();

        let dropped = drop_me.hash().unwrap();
        pool.remove_stale(
            move |t| t.hash().map(|h| h != dropped).unwrap_or(false),
            &feer,
        );
        assert_eq!(pool.count(), 1);
        assert!(pool.contains_key(&keep.hash().unwrap()));
        pool.assert_consistent(&feer);
    }

    #[test]
    fn resend_fires_on_power_of_two_ages() {
        let mut feer = TestFeer::default();
        feer.height = 0;
        let mut pool = Mempool::new(10);
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        pool.set_resend_callback(
            4,
            Arc::new(move |_| {
                seen.fetch_add(1, AtomicOrdering::SeqCst);
            }),
        );
        pool.add(Arc::new(tx_with(1, 100, UInt160::zero())), &feer)
            .unwrap();

        // Ages 4, 8 and 16 fire; 12 does not (3x the threshold).
        for (height, expected) in [(4u32, 1usize), (8, 2), (12, 2), (16, 3)] {
            feer.height = height;
            pool.remove_stale(|_| true, &feer);
            assert_eq!(counter.load(AtomicOrdering::SeqCst), expected, "at {height}");
        }
    }

    #[test]
    fn sig_extension_attributes_gated_by_feer() {
        struct NoExtensions;
        impl Feer for NoExtensions {
            fn fee_per_byte(&self) -> i64 {
                0
            }
            fn get_utility_token_balance(&self, _: &UInt160) -> i64 {
                i64::MAX / 2
            }
            fn block_height(&self) -> u32 {
                0
            }
            fn p2p_sig_extensions_enabled(&self) -> bool {
                false
            }
        }

        let mut pool = Mempool::new(10);
        let mut tx = tx_with(1, 100, UInt160::zero());
        tx.attributes.push(TransactionAttribute::Conflicts {
            hash: UInt256::from_array([1u8; 32]),
        });
        assert_eq!(
            pool.add(Arc::new(tx), &NoExtensions),
            Err(VerifyResult::InvalidAttribute)
        );
    }
}
