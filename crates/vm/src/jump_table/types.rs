//! Type-introspection instructions.

use crate::stack_item::StackItemType;
use crate::{ExecutionEngine, Instruction, OpCode, StackItem, VmError, VmResult};

impl ExecutionEngine {
    pub(crate) fn exec_type_op(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        match ix.opcode {
            IsNull => {
                let item = self.pop()?;
                self.push(StackItem::Boolean(item.is_null()))
            }
            IsType => {
                let target = decode_type(ix)?;
                if target == StackItemType::Any {
                    return Err(VmError::InvalidScript("ISTYPE of Any".to_string()));
                }
                let item = self.pop()?;
                self.push(StackItem::Boolean(item.item_type() == target))
            }
            Convert => {
                let target = decode_type(ix)?;
                let item = self.pop()?;
                let converted = item.convert(target)?;
                self.push(converted)
            }
            _ => unreachable!("type dispatch covers all variants"),
        }
    }
}

fn decode_type(ix: &Instruction) -> VmResult<StackItemType> {
    StackItemType::from_byte(ix.operand_u8(0)).ok_or_else(|| {
        VmError::InvalidScript(format!("unknown item type {:#04x}", ix.operand_u8(0)))
    })
}
