//! Aggregation of validator signatures over per-height state roots.

use crate::witness::{build_invocation, verify_multisig_witness};
use crate::{Blockchain, LedgerError, LedgerResult};
use neo3_core::{ExtensiblePayload, UInt160, Witness};
use neo3_cryptography::{multisig_redeem_script, verify_signature, ECPoint};
use neo3_io::SerializableExt;
use neo3_mpt_trie::StateRoot;
use neo3_smart_contract::native::{Role, RoleManagement};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives the finalized, witness-bearing payload for network broadcast.
/// Invoked outside the service's locks; implementations must not block.
pub type RelayCallback = dyn Fn(ExtensiblePayload) + Send + Sync;

#[derive(Default)]
struct IncompleteRoot {
    root: Option<StateRoot>,
    /// Validator index to signature; verified once the root is known.
    signatures: BTreeMap<usize, Vec<u8>>,
    finalized: bool,
    retries: u32,
}

/// Collects state-root signatures per height and finalizes once strictly
/// more than half of the designated state validators have signed.
///
/// Collection is monotonic and idempotent: duplicate signatures from the
/// same validator are no-ops, and at most one payload per height reaches
/// the relay callback.
pub struct StateRootService {
    blockchain: Arc<Blockchain>,
    incomplete: Mutex<HashMap<u32, IncompleteRoot>>,
    relay: RwLock<Option<Arc<RelayCallback>>>,
}

impl StateRootService {
    /// Creates the service over a blockchain.
    pub fn new(blockchain: Arc<Blockchain>) -> Self {
        Self {
            blockchain,
            incomplete: Mutex::new(HashMap::new()),
            relay: RwLock::new(None),
        }
    }

    /// Registers the relay callback.
    pub fn set_relay_callback(&self, callback: Arc<RelayCallback>) {
        *self.relay.write() = Some(callback);
    }

    /// The state validators designated for `height`. Re-read per height;
    /// the set is history-keyed through the designation contract.
    pub fn validators_for(&self, height: u32) -> LedgerResult<Vec<ECPoint>> {
        let dao = self.blockchain.snapshot();
        Ok(RoleManagement::designated_by_role(
            &dao,
            Role::StateValidator,
            height,
        )?)
    }

    /// Records the locally computed root for `height` and re-validates any
    /// buffered signatures against it.
    pub fn set_local_root(&self, root: StateRoot) -> LedgerResult<()> {
        let validators = self.validators_for(root.index)?;
        let finalized = {
            let mut incomplete = self.incomplete.lock();
            let entry = incomplete.entry(root.index).or_default();
            if entry.root.is_some() {
                return Ok(());
            }
            let sign_data = root.sign_data(self.blockchain.network())?;
            entry
                .signatures
                .retain(|index, signature| match validators.get(*index) {
                    Some(key) => verify_signature(&sign_data, signature, key),
                    None => false,
                });
            entry.root = Some(root);
            Self::try_finalize(entry, &validators, self.blockchain.network())?
        };
        self.deliver(finalized)
    }

    /// Adds one validator signature for `height`.
    pub fn add_signature(
        &self,
        height: u32,
        validator_index: usize,
        signature: Vec<u8>,
    ) -> LedgerResult<()> {
        let validators = self.validators_for(height)?;
        if validator_index >= validators.len() {
            return Err(LedgerError::InvalidStateRoot(format!(
                "validator index {validator_index} out of {}",
                validators.len()
            )));
        }
        let finalized = {
            let mut incomplete = self.incomplete.lock();
            let entry = incomplete.entry(height).or_default();
            if entry.finalized {
                return Ok(());
            }
            if let Some(root) = &entry.root {
                let sign_data = root.sign_data(self.blockchain.network())?;
                if !verify_signature(&sign_data, &signature, &validators[validator_index]) {
                    return Err(LedgerError::InvalidStateRoot(format!(
                        "bad signature from validator {validator_index}"
                    )));
                }
            } else {
                // The root is not computed yet; buffer and verify later.
                entry.retries += 1;
                debug!(height, validator_index, "buffered early state-root signature");
            }
            entry.signatures.entry(validator_index).or_insert(signature);
            Self::try_finalize(entry, &validators, self.blockchain.network())?
        };
        self.deliver(finalized)
    }

    /// Finalizes an entry once the quorum is reached. Returns the signed
    /// root; the caller delivers it outside the lock.
    fn try_finalize(
        entry: &mut IncompleteRoot,
        validators: &[ECPoint],
        _network: u32,
    ) -> LedgerResult<Option<StateRoot>> {
        if entry.finalized || validators.is_empty() {
            return Ok(None);
        }
        let Some(root) = entry.root.clone() else {
            return Ok(None);
        };
        if entry.signatures.len() <= validators.len() / 2 {
            return Ok(None);
        }

        // Assemble the witness: signatures in validator order, threshold a
        // strict majority.
        let m = validators.len() / 2 + 1;
        let ordered: Vec<Vec<u8>> = entry.signatures.values().take(m).cloned().collect();
        let script = multisig_redeem_script(m, validators)?;
        let witness = Witness::new(build_invocation(&ordered), script);

        let mut signed = root;
        signed.witness = Some(witness);
        entry.finalized = true;
        info!(height = signed.index, "state root finalized");
        Ok(Some(signed))
    }

    fn deliver(&self, finalized: Option<StateRoot>) -> LedgerResult<()> {
        let Some(root) = finalized else {
            return Ok(());
        };
        let increment = self.blockchain.settings().max_valid_until_block_increment;
        let witness = root
            .witness
            .clone()
            .ok_or_else(|| LedgerError::InvalidStateRoot("finalized without witness".to_string()))?;
        let payload = ExtensiblePayload {
            network: self.blockchain.network(),
            valid_block_start: root.index,
            valid_block_end: root.index + increment,
            sender: witness.script_hash(),
            data: root.to_array()?,
            witness,
        };

        if let Err(error) = self.blockchain.add_state_root(root) {
            warn!(%error, "finalized state root rejected by the ledger");
            return Err(error);
        }
        if let Some(relay) = self.relay.read().clone() {
            relay(payload);
        }
        Ok(())
    }

    /// Drops per-height state below `height`; called as the chain
    /// advances past finalized roots.
    pub fn prune_below(&self, height: u32) {
        self.incomplete.lock().retain(|&h, _| h >= height);
    }
}

/// Verifies an externally received witnessed state root against the
/// validator set designated for its height.
pub(crate) fn verify_state_root_witness(
    root: &StateRoot,
    validators: &[ECPoint],
    network: u32,
) -> LedgerResult<()> {
    let Some(witness) = &root.witness else {
        return Err(LedgerError::InvalidStateRoot("missing witness".to_string()));
    };
    if validators.is_empty() {
        return Err(LedgerError::InvalidStateRoot(
            "no designated state validators".to_string(),
        ));
    }
    let m = validators.len() / 2 + 1;
    let script = multisig_redeem_script(m, validators)
        .map_err(|e| LedgerError::InvalidStateRoot(e.to_string()))?;
    let expected = UInt160::from_script(&script);
    let sign_data = root.sign_data(network)?;
    if !verify_multisig_witness(&sign_data, witness, &expected) {
        return Err(LedgerError::InvalidStateRoot(
            "witness verification failed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_config::ProtocolSettings;
    use neo3_cryptography::KeyPair;
    use neo3_persistence::MemoryStore;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chain_with_validators(count: usize) -> (Arc<Blockchain>, Vec<KeyPair>) {
        let settings = ProtocolSettings {
            verify_blocks: false,
            verify_transactions: false,
            ..Default::default()
        };
        let chain = Blockchain::new(Arc::new(settings), Arc::new(MemoryStore::new())).unwrap();

        // Designate the state validators directly in storage, sorted the
        // way a designation through the contract would be.
        let mut keys: Vec<KeyPair> = (0..count).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.public_key());
        let points: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let mut cache = chain.snapshot();
        RoleManagement::record_designation(&mut cache, Role::StateValidator, 0, &points).unwrap();
        cache.persist().unwrap();
        (chain, keys)
    }

    #[test]
    fn quorum_finalizes_exactly_once() {
        let (chain, keys) = chain_with_validators(4);
        let service = StateRootService::new(chain.clone());

        let relayed = Arc::new(AtomicUsize::new(0));
        let last_payload: Arc<PlMutex<Option<ExtensiblePayload>>> =
            Arc::new(PlMutex::new(None));
        let counter = relayed.clone();
        let sink = last_payload.clone();
        service.set_relay_callback(Arc::new(move |payload| {
            counter.fetch_add(1, Ordering::SeqCst);
            *sink.lock() = Some(payload);
        }));

        let root = chain.state_root(0).unwrap().unwrap();
        assert!(root.witness.is_none());
        service.set_local_root(root.clone()).unwrap();
        let sign_data = root.sign_data(chain.network()).unwrap();

        // Two of four signatures: no quorum yet.
        service.add_signature(0, 0, keys[0].sign(&sign_data)).unwrap();
        service.add_signature(0, 2, keys[2].sign(&sign_data)).unwrap();
        assert_eq!(relayed.load(Ordering::SeqCst), 0);

        // The third signature crosses the strict majority.
        service.add_signature(0, 1, keys[1].sign(&sign_data)).unwrap();
        assert_eq!(relayed.load(Ordering::SeqCst), 1);

        let payload = last_payload.lock().clone().unwrap();
        assert_eq!(
            payload.valid_block_end - payload.valid_block_start,
            chain.settings().max_valid_until_block_increment
        );
        assert_eq!(payload.valid_block_start, 0);
        assert_eq!(payload.network, chain.network());

        // The witnessed root was handed back to the ledger.
        let stored = chain.state_root(0).unwrap().unwrap();
        assert!(stored.witness.is_some());

        // Late and duplicate signatures are no-ops.
        service.add_signature(0, 3, keys[3].sign(&sign_data)).unwrap();
        service.add_signature(0, 1, keys[1].sign(&sign_data)).unwrap();
        assert_eq!(relayed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_validator_index_rejected() {
        let (chain, keys) = chain_with_validators(4);
        let service = StateRootService::new(chain.clone());
        let root = chain.state_root(0).unwrap().unwrap();
        service.set_local_root(root.clone()).unwrap();
        let sign_data = root.sign_data(chain.network()).unwrap();
        assert!(service.add_signature(0, 7, keys[0].sign(&sign_data)).is_err());
    }

    #[test]
    fn invalid_signature_rejected_once_root_is_known() {
        let (chain, keys) = chain_with_validators(4);
        let service = StateRootService::new(chain.clone());
        let root = chain.state_root(0).unwrap().unwrap();
        service.set_local_root(root).unwrap();
        assert!(service
            .add_signature(0, 0, keys[0].sign(b"something else"))
            .is_err());
    }

    #[test]
    fn buffered_signatures_validate_after_root_arrives() {
        let (chain, keys) = chain_with_validators(4);
        let service = StateRootService::new(chain.clone());
        let relayed = Arc::new(AtomicUsize::new(0));
        let counter = relayed.clone();
        service.set_relay_callback(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let root = chain.state_root(0).unwrap().unwrap();
        let sign_data = root.sign_data(chain.network()).unwrap();

        // Signatures arrive before the local root; one of them is junk.
        service.add_signature(0, 0, keys[0].sign(&sign_data)).unwrap();
        service.add_signature(0, 1, keys[1].sign(&sign_data)).unwrap();
        service.add_signature(0, 2, vec![0u8; 64]).unwrap();
        assert_eq!(relayed.load(Ordering::SeqCst), 0);

        // The root arrives: the junk signature is discarded, the two good
        // ones survive and one more finalizes.
        service.set_local_root(root).unwrap();
        assert_eq!(relayed.load(Ordering::SeqCst), 0);
        service.add_signature(0, 3, keys[3].sign(&sign_data)).unwrap();
        assert_eq!(relayed.load(Ordering::SeqCst), 1);
    }
}
