//! Structural verification of signature and multisig witnesses.
//!
//! Blocks and state roots carry witnesses over account scripts with a
//! fixed shape; parsing that shape directly keeps consensus verification
//! off the VM path and independent of any script container.

use neo3_core::{UInt160, Witness};
use neo3_cryptography::{syscall_id, verify_signature, ECPoint};

const OP_PUSHINT8: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x0C;
const OP_PUSH0: u8 = 0x10;
const OP_PUSH16: u8 = 0x20;
const OP_SYSCALL: u8 = 0x41;

fn read_small_int(script: &[u8], position: &mut usize) -> Option<usize> {
    let byte = *script.get(*position)?;
    if (OP_PUSH0..=OP_PUSH16).contains(&byte) {
        *position += 1;
        Some((byte - OP_PUSH0) as usize)
    } else if byte == OP_PUSHINT8 {
        let value = *script.get(*position + 1)?;
        *position += 2;
        Some(value as usize)
    } else {
        None
    }
}

/// Parses an `m`-of-`n` multisig verification script into its threshold
/// and key list.
pub fn parse_multisig_script(script: &[u8]) -> Option<(usize, Vec<ECPoint>)> {
    let mut position = 0;
    let m = read_small_int(script, &mut position)?;
    let mut keys = Vec::new();
    while script.get(position) == Some(&OP_PUSHDATA1) && script.get(position + 1) == Some(&33) {
        let start = position + 2;
        let key = ECPoint::from_bytes(script.get(start..start + 33)?).ok()?;
        keys.push(key);
        position = start + 33;
    }
    let n = read_small_int(script, &mut position)?;
    if n != keys.len() || m == 0 || m > n {
        return None;
    }
    if script.get(position) != Some(&OP_SYSCALL) {
        return None;
    }
    let id = u32::from_le_bytes(script.get(position + 1..position + 5)?.try_into().ok()?);
    if id != syscall_id("System.Crypto.CheckMultisig") || script.len() != position + 5 {
        return None;
    }
    Some((m, keys))
}

/// Parses an invocation script that pushes nothing but 64-byte signatures.
pub fn parse_signatures(invocation: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut signatures = Vec::new();
    let mut position = 0;
    while position < invocation.len() {
        if invocation.get(position) != Some(&OP_PUSHDATA1) || invocation.get(position + 1) != Some(&64)
        {
            return None;
        }
        signatures.push(invocation.get(position + 2..position + 66)?.to_vec());
        position += 66;
    }
    Some(signatures)
}

/// Builds the invocation script pushing `signatures` in order.
pub fn build_invocation(signatures: &[Vec<u8>]) -> Vec<u8> {
    let mut script = Vec::with_capacity(signatures.len() * 66);
    for signature in signatures {
        script.push(OP_PUSHDATA1);
        script.push(64);
        script.extend_from_slice(signature);
    }
    script
}

/// Verifies a multisig witness over `sign_data` for the account
/// `expected`. Signatures must match keys in key order.
pub fn verify_multisig_witness(sign_data: &[u8], witness: &Witness, expected: &UInt160) -> bool {
    if witness.script_hash() != *expected {
        return false;
    }
    let Some((m, keys)) = parse_multisig_script(&witness.verification_script) else {
        return false;
    };
    let Some(signatures) = parse_signatures(&witness.invocation_script) else {
        return false;
    };
    if signatures.len() < m {
        return false;
    }
    let mut key_index = 0;
    let mut verified = 0;
    for signature in &signatures {
        let mut matched = false;
        while key_index < keys.len() {
            let key = keys[key_index];
            key_index += 1;
            if verify_signature(sign_data, signature, &key) {
                matched = true;
                break;
            }
        }
        if !matched {
            return false;
        }
        verified += 1;
        if verified >= m {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_cryptography::{multisig_redeem_script, KeyPair};

    #[test]
    fn multisig_roundtrip_parses() {
        let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
        let points: Vec<ECPoint> = keys.iter().map(|k| k.public_key()).collect();
        let script = multisig_redeem_script(3, &points).unwrap();
        let (m, parsed) = parse_multisig_script(&script).unwrap();
        assert_eq!(m, 3);
        let mut sorted = points.clone();
        sorted.sort();
        assert_eq!(parsed, sorted);
    }

    #[test]
    fn multisig_witness_verifies_with_quorum() {
        let data = b"signed payload".to_vec();
        let mut keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        // Sign in sorted key order, as the verification demands.
        keys.sort_by_key(|k| k.public_key());
        let points: Vec<ECPoint> = keys.iter().map(|k| k.public_key()).collect();
        let script = multisig_redeem_script(2, &points).unwrap();
        let expected = UInt160::from_script(&script);

        let signatures: Vec<Vec<u8>> = keys.iter().take(2).map(|k| k.sign(&data)).collect();
        let witness = Witness::new(build_invocation(&signatures), script.clone());
        assert!(verify_multisig_witness(&data, &witness, &expected));

        // One signature short of the threshold.
        let short = Witness::new(build_invocation(&signatures[..1]), script.clone());
        assert!(!verify_multisig_witness(&data, &short, &expected));

        // Wrong account.
        assert!(!verify_multisig_witness(&data, &witness, &UInt160::zero()));
    }

    #[test]
    fn garbage_scripts_do_not_parse() {
        assert!(parse_multisig_script(&[0xFF, 0x00]).is_none());
        assert!(parse_signatures(&[0x0C, 63, 0]).is_none());
    }
}
