//! Verification script construction for accounts.
//!
//! Single-signature and multi-signature accounts are ordinary contracts
//! whose verification scripts follow a fixed shape; the script hash of that
//! shape is the account address.

use crate::error::{CryptoError, CryptoResult};
use crate::hash::sha256;
use crate::ECPoint;

// The opcode bytes this module needs. The full instruction set lives in the
// VM crate; duplicating these four constants keeps the dependency one-way.
const OP_PUSHINT8: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x0C;
const OP_PUSH0: u8 = 0x10;
const OP_SYSCALL: u8 = 0x41;

/// Derives the interop service id for a syscall name: the first four bytes
/// of `sha256(name)` interpreted little-endian.
pub fn syscall_id(name: &str) -> u32 {
    let digest = sha256(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Emits the shortest push instruction for a small non-negative integer.
pub fn emit_push_int(script: &mut Vec<u8>, value: usize) {
    if value <= 16 {
        script.push(OP_PUSH0 + value as u8);
    } else {
        script.push(OP_PUSHINT8);
        script.push(value as u8);
    }
}

fn emit_push_bytes(script: &mut Vec<u8>, bytes: &[u8]) {
    debug_assert!(bytes.len() < 0x100);
    script.push(OP_PUSHDATA1);
    script.push(bytes.len() as u8);
    script.extend_from_slice(bytes);
}

fn emit_syscall(script: &mut Vec<u8>, name: &str) {
    script.push(OP_SYSCALL);
    script.extend_from_slice(&syscall_id(name).to_le_bytes());
}

/// Builds the verification script of a single-signature account.
pub fn signature_redeem_script(public_key: &ECPoint) -> Vec<u8> {
    let mut script = Vec::with_capacity(40);
    emit_push_bytes(&mut script, public_key.as_bytes());
    emit_syscall(&mut script, "System.Crypto.CheckSig");
    script
}

/// Builds the verification script of an `m`-of-`n` multisig account.
///
/// Keys are sorted by their compressed encoding; the same key set always
/// produces the same script and therefore the same address.
pub fn multisig_redeem_script(m: usize, public_keys: &[ECPoint]) -> CryptoResult<Vec<u8>> {
    let n = public_keys.len();
    if m == 0 || m > n || n > 1024 {
        return Err(CryptoError::InvalidMultisig { m, n });
    }
    let mut keys = public_keys.to_vec();
    keys.sort();

    let mut script = Vec::with_capacity(4 + n * 35 + 8);
    emit_push_int(&mut script, m);
    for key in &keys {
        emit_push_bytes(&mut script, key.as_bytes());
    }
    emit_push_int(&mut script, n);
    emit_syscall(&mut script, "System.Crypto.CheckMultisig");
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn signature_script_shape() {
        let key = KeyPair::generate().public_key();
        let script = signature_redeem_script(&key);
        assert_eq!(script[0], OP_PUSHDATA1);
        assert_eq!(script[1], 33);
        assert_eq!(&script[2..35], key.as_bytes());
        assert_eq!(script[35], OP_SYSCALL);
        assert_eq!(script.len(), 40);
    }

    #[test]
    fn multisig_script_is_order_independent() {
        let mut keys: Vec<ECPoint> = (0..4).map(|_| KeyPair::generate().public_key()).collect();
        let script = multisig_redeem_script(3, &keys).unwrap();
        keys.reverse();
        assert_eq!(multisig_redeem_script(3, &keys).unwrap(), script);
    }

    #[test]
    fn multisig_rejects_bad_parameters() {
        let keys: Vec<ECPoint> = (0..2).map(|_| KeyPair::generate().public_key()).collect();
        assert!(multisig_redeem_script(0, &keys).is_err());
        assert!(multisig_redeem_script(3, &keys).is_err());
    }

    #[test]
    fn syscall_id_is_stable() {
        // Ids are a pure function of the name.
        assert_eq!(syscall_id("System.Crypto.CheckSig"), syscall_id("System.Crypto.CheckSig"));
        assert_ne!(
            syscall_id("System.Crypto.CheckSig"),
            syscall_id("System.Crypto.CheckMultisig")
        );
    }
}
