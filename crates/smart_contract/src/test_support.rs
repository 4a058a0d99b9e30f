//! Shared fixtures for the contract tests.

use crate::application_engine::{ApplicationEngine, TriggerType};
use crate::native::NativeRegistry;
use neo3_config::ProtocolSettings;
use neo3_core::{Signer, Transaction, UInt160, Witness, WitnessScope};
use neo3_cryptography::KeyPair;
use neo3_persistence::{DataCache, MemoryStore};
use std::sync::Arc;

/// Settings with a single-member committee; returns the member key and the
/// committee address.
pub fn committee_settings() -> (Arc<ProtocolSettings>, KeyPair, UInt160) {
    let key = KeyPair::generate();
    let mut settings = ProtocolSettings::default();
    settings.standby_committee = vec![key.public_key().to_string()];
    settings.validators_count = 1;
    let settings = Arc::new(settings);
    let address = crate::application_engine::committee_address(&settings).unwrap();
    (settings, key, address)
}

/// A fresh root DAO over an in-memory store.
pub fn memory_dao() -> DataCache {
    DataCache::new(Arc::new(MemoryStore::new()))
}

/// A transaction whose single signer has global scope, so witness checks
/// for `account` succeed inside the engine.
pub fn signed_container(account: UInt160) -> Arc<Transaction> {
    Arc::new(Transaction {
        valid_until_block: 1_000_000,
        signers: vec![Signer::new(account, WitnessScope::GLOBAL)],
        script: vec![0x40],
        witnesses: vec![Witness::default()],
        ..Default::default()
    })
}

/// An application engine over `dao` with `height` as the committed tip.
pub fn application_engine(
    settings: Arc<ProtocolSettings>,
    mut dao: DataCache,
    container: Option<Arc<Transaction>>,
    height: u32,
) -> ApplicationEngine {
    dao.set_current_block(&neo3_core::UInt256::from_array([0xAA; 32]), height);
    ApplicationEngine::new(
        TriggerType::Application,
        container,
        dao,
        None,
        settings,
        NativeRegistry::new(),
        -1,
    )
}
