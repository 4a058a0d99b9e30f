//! Jumps and exception-frame instructions.
//!
//! `CALL`, `RET`, `SYSCALL`, `ABORT`, `ASSERT` and `THROW` live in the
//! engine itself; this module holds the relative jumps and the try frames.

use crate::execution_context::{TryContext, TryState};
use crate::execution_engine::offset_target;
use crate::{ExecutionEngine, Instruction, OpCode, VmError, VmResult};

/// Upper bound on nested try frames per context.
const MAX_TRY_NESTING: usize = 16;

impl ExecutionEngine {
    pub(crate) fn exec_jump(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        let long = matches!(
            ix.opcode,
            JmpL | JmpIfL | JmpIfNotL | JmpEqL | JmpNeL | JmpGtL | JmpGeL | JmpLtL | JmpLeL
        );
        let relative = if long {
            ix.operand_i32()
        } else {
            ix.operand_i8() as i32
        };

        let taken = match ix.opcode {
            Jmp | JmpL => true,
            JmpIf | JmpIfL => self.pop_bool()?,
            JmpIfNot | JmpIfNotL => !self.pop_bool()?,
            _ => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                match ix.opcode {
                    JmpEq | JmpEqL => a == b,
                    JmpNe | JmpNeL => a != b,
                    JmpGt | JmpGtL => a > b,
                    JmpGe | JmpGeL => a >= b,
                    JmpLt | JmpLtL => a < b,
                    JmpLe | JmpLeL => a <= b,
                    _ => unreachable!("jump dispatch covers all variants"),
                }
            }
        };

        if taken {
            let target = offset_target(ix, relative)?;
            let context = self.current_context_mut()?;
            if target > context.script.len() {
                return Err(VmError::InvalidScript(format!(
                    "jump target {target} out of bounds"
                )));
            }
            context.ip = target;
        }
        Ok(())
    }

    pub(crate) fn exec_try(&mut self, ix: &Instruction) -> VmResult<()> {
        let (catch_rel, finally_rel) = if ix.opcode == OpCode::Try {
            let (c, f) = ix.try_offsets_i8();
            (c as i32, f as i32)
        } else {
            ix.try_offsets_i32()
        };
        if catch_rel == 0 && finally_rel == 0 {
            return Err(VmError::InvalidScript(
                "TRY with neither catch nor finally".to_string(),
            ));
        }
        let catch_offset = if catch_rel != 0 {
            Some(offset_target(ix, catch_rel)?)
        } else {
            None
        };
        let finally_offset = if finally_rel != 0 {
            Some(offset_target(ix, finally_rel)?)
        } else {
            None
        };
        let context = self.current_context_mut()?;
        if context.try_stack.len() >= MAX_TRY_NESTING {
            return Err(VmError::LimitExceeded("try nesting too deep".to_string()));
        }
        context.try_stack.push(TryContext {
            catch_offset,
            finally_offset,
            end_offset: 0,
            state: TryState::Try,
        });
        Ok(())
    }

    pub(crate) fn exec_end_try(&mut self, ix: &Instruction) -> VmResult<()> {
        let relative = if ix.opcode == OpCode::EndTry {
            ix.operand_i8() as i32
        } else {
            ix.operand_i32()
        };
        let target = offset_target(ix, relative)?;
        let context = self.current_context_mut()?;
        let mut try_context = context
            .try_stack
            .pop()
            .ok_or_else(|| VmError::InvalidOperation("ENDTRY outside try".to_string()))?;
        if try_context.state == TryState::Finally {
            return Err(VmError::InvalidOperation(
                "ENDTRY inside finally".to_string(),
            ));
        }
        match try_context.finally_offset {
            Some(finally_offset) => {
                try_context.state = TryState::Finally;
                try_context.end_offset = target;
                context.ip = finally_offset;
                context.try_stack.push(try_context);
            }
            None => {
                context.ip = target;
            }
        }
        Ok(())
    }

    pub(crate) fn exec_end_finally(&mut self) -> VmResult<()> {
        let end_offset = {
            let context = self.current_context_mut()?;
            let try_context = context
                .try_stack
                .pop()
                .ok_or_else(|| VmError::InvalidOperation("ENDFINALLY outside try".to_string()))?;
            if try_context.state != TryState::Finally {
                return Err(VmError::InvalidOperation(
                    "ENDFINALLY outside finally".to_string(),
                ));
            }
            try_context.end_offset
        };
        // A finally entered during unwinding rethrows the pending exception.
        if let Some(exception) = self.pending_exception() {
            return self.throw_item(exception);
        }
        self.current_context_mut()?.ip = end_offset;
        Ok(())
    }
}
