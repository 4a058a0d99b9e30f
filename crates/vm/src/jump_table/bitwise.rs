//! Bitwise and equality instructions.

use crate::stack_item::check_integer;
use crate::{ExecutionEngine, Instruction, OpCode, StackItem, VmResult};
use num_bigint::BigInt;

impl ExecutionEngine {
    pub(crate) fn exec_bitwise(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        match ix.opcode {
            Invert => {
                let value = self.pop_int()?;
                // Two's-complement inversion.
                self.push(StackItem::Integer(-(value + BigInt::from(1))))
            }
            And | Or | Xor => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let result = match ix.opcode {
                    And => a & b,
                    Or => a | b,
                    _ => a ^ b,
                };
                check_integer(&result)?;
                self.push(StackItem::Integer(result))
            }
            Equal | NotEqual => {
                let b = self.pop()?;
                let a = self.pop()?;
                let equal = a.equals(&b)?;
                self.push(StackItem::Boolean(if ix.opcode == Equal {
                    equal
                } else {
                    !equal
                }))
            }
            _ => unreachable!("bitwise dispatch covers all variants"),
        }
    }
}
