//! Transaction and block witnesses.

use crate::UInt160;
use neo3_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum size of an invocation script in bytes.
pub const MAX_INVOCATION_SCRIPT: usize = 1024;

/// Maximum size of a verification script in bytes.
pub const MAX_VERIFICATION_SCRIPT: usize = 1024;

/// A witness: the invocation script pushes arguments (typically signatures),
/// the verification script consumes them and leaves a boolean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub invocation_script: Vec<u8>,
    pub verification_script: Vec<u8>,
}

impl Witness {
    /// Creates a witness from its two scripts.
    pub fn new(invocation_script: Vec<u8>, verification_script: Vec<u8>) -> Self {
        Self {
            invocation_script,
            verification_script,
        }
    }

    /// Gets the script hash of the verification script, which is the account
    /// this witness answers for.
    pub fn script_hash(&self) -> UInt160 {
        UInt160::from_script(&self.verification_script)
    }
}

impl Serializable for Witness {
    fn size(&self) -> usize {
        helper::get_var_bytes_size(&self.invocation_script)
            + helper::get_var_bytes_size(&self.verification_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_bytes(&self.invocation_script)?;
        writer.write_var_bytes(&self.verification_script)
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let invocation_script = reader.read_var_bytes(MAX_INVOCATION_SCRIPT)?;
        let verification_script = reader.read_var_bytes(MAX_VERIFICATION_SCRIPT)?;
        Ok(Self {
            invocation_script,
            verification_script,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn roundtrip() {
        let witness = Witness::new(vec![1, 2, 3], vec![4, 5]);
        let bytes = witness.to_array().unwrap();
        assert_eq!(bytes.len(), witness.size());
        assert_eq!(Witness::from_array(&bytes).unwrap(), witness);
    }

    #[test]
    fn script_hash_is_verification_hash() {
        let witness = Witness::new(Vec::new(), vec![0x40]);
        assert_eq!(witness.script_hash(), UInt160::from_script(&[0x40]));
    }
}
