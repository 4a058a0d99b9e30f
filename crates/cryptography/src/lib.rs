//! Hashing, secp256r1 ECDSA and contract script helpers for Neo N3.

mod contract;
mod ecpoint;
mod error;
pub mod hash;
mod key_pair;
mod merkle_tree;

pub use contract::{
    emit_push_int, multisig_redeem_script, signature_redeem_script, syscall_id,
};
pub use ecpoint::ECPoint;
pub use error::{CryptoError, CryptoResult};
pub use key_pair::{verify_signature, KeyPair};
pub use merkle_tree::MerkleTree;
