//! Byte-string splice instructions.

use crate::{ExecutionEngine, Instruction, OpCode, StackItem, VmError, VmResult, MAX_ITEM_SIZE};

impl ExecutionEngine {
    pub(crate) fn exec_splice(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        match ix.opcode {
            NewBuffer => {
                let size = self.pop_usize()?;
                if size > MAX_ITEM_SIZE {
                    return Err(VmError::LimitExceeded(format!("buffer of {size} bytes")));
                }
                self.push(StackItem::Buffer(vec![0u8; size]))
            }
            Cat => {
                let tail = self.pop_bytes()?;
                let mut head = self.pop_bytes()?;
                if head.len() + tail.len() > MAX_ITEM_SIZE {
                    return Err(VmError::LimitExceeded("CAT result too large".to_string()));
                }
                head.extend_from_slice(&tail);
                self.push(StackItem::Buffer(head))
            }
            SubStr => {
                let count = self.pop_usize()?;
                let index = self.pop_usize()?;
                let data = self.pop_bytes()?;
                if index + count > data.len() {
                    return Err(VmError::InvalidOperation(format!(
                        "SUBSTR {index}+{count} beyond {} bytes",
                        data.len()
                    )));
                }
                self.push(StackItem::Buffer(data[index..index + count].to_vec()))
            }
            Left => {
                let count = self.pop_usize()?;
                let data = self.pop_bytes()?;
                if count > data.len() {
                    return Err(VmError::InvalidOperation("LEFT beyond data".to_string()));
                }
                self.push(StackItem::Buffer(data[..count].to_vec()))
            }
            Right => {
                let count = self.pop_usize()?;
                let data = self.pop_bytes()?;
                if count > data.len() {
                    return Err(VmError::InvalidOperation("RIGHT beyond data".to_string()));
                }
                self.push(StackItem::Buffer(data[data.len() - count..].to_vec()))
            }
            _ => unreachable!("splice dispatch covers all variants"),
        }
    }
}
