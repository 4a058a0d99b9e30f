//! Constant-pushing instructions.

use crate::execution_engine::offset_target;
use crate::stack_item::check_integer;
use crate::{ExecutionEngine, Instruction, OpCode, StackItem, VmError, VmResult};
use num_bigint::BigInt;

impl ExecutionEngine {
    pub(crate) fn exec_push(&mut self, ix: &Instruction) -> VmResult<()> {
        let item = match ix.opcode {
            OpCode::PushInt8
            | OpCode::PushInt16
            | OpCode::PushInt32
            | OpCode::PushInt64
            | OpCode::PushInt128
            | OpCode::PushInt256 => {
                let value = BigInt::from_signed_bytes_le(&ix.operand);
                check_integer(&value)?;
                StackItem::Integer(value)
            }
            OpCode::PushT => StackItem::Boolean(true),
            OpCode::PushF => StackItem::Boolean(false),
            OpCode::PushA => {
                let target = offset_target(ix, ix.operand_i32())?;
                if target > self.current_context()?.script.len() {
                    return Err(VmError::InvalidScript(format!(
                        "pointer target {target} out of bounds"
                    )));
                }
                StackItem::Pointer(target)
            }
            OpCode::PushNull => StackItem::Null,
            OpCode::PushData1 | OpCode::PushData2 | OpCode::PushData4 => {
                StackItem::ByteString(ix.operand.clone())
            }
            OpCode::PushM1 => StackItem::from_int(-1),
            // PUSH0 through PUSH16 encode their value in the opcode byte.
            other => StackItem::from_int(other as u8 as i64 - OpCode::Push0 as u8 as i64),
        };
        self.push(item)
    }
}
