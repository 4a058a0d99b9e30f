//! Evaluation-stack shuffling instructions.

use crate::{ExecutionEngine, Instruction, OpCode, StackItem, VmError, VmResult};

impl ExecutionEngine {
    pub(crate) fn exec_stack_op(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        match ix.opcode {
            Depth => {
                let depth = self.current_context()?.stack_depth();
                self.push(StackItem::from_int(depth as i64))
            }
            Drop => {
                self.pop()?;
                Ok(())
            }
            Nip => {
                let removed = self.remove_at(1)?;
                self.counter().remove(&removed);
                Ok(())
            }
            XDrop => {
                let depth = self.pop_usize()?;
                let removed = self.remove_at(depth)?;
                self.counter().remove(&removed);
                Ok(())
            }
            Clear => {
                while self.current_context()?.stack_depth() > 0 {
                    self.pop()?;
                }
                Ok(())
            }
            Dup => {
                let top = self.peek(0)?;
                self.push(top)
            }
            Over => {
                let second = self.peek(1)?;
                self.push(second)
            }
            Pick => {
                let depth = self.pop_usize()?;
                let item = self.peek(depth)?;
                self.push(item)
            }
            Tuck => {
                let top = self.peek(0)?;
                self.counter().add(&top)?;
                self.with_stack(|stack| {
                    let len = stack.len();
                    if len < 2 {
                        return Err(VmError::InvalidOperation("TUCK needs two items".to_string()));
                    }
                    stack.insert(len - 2, top);
                    Ok(())
                })
            }
            Swap => self.with_stack(|stack| {
                let len = stack.len();
                if len < 2 {
                    return Err(VmError::InvalidOperation("SWAP needs two items".to_string()));
                }
                stack.swap(len - 1, len - 2);
                Ok(())
            }),
            Rot => self.with_stack(|stack| {
                let len = stack.len();
                if len < 3 {
                    return Err(VmError::InvalidOperation("ROT needs three items".to_string()));
                }
                let third = stack.remove(len - 3);
                stack.push(third);
                Ok(())
            }),
            Roll => {
                let depth = self.pop_usize()?;
                if depth > 0 {
                    let item = self.remove_at(depth)?;
                    self.with_stack(|stack| {
                        stack.push(item);
                        Ok(())
                    })?;
                }
                Ok(())
            }
            Reverse3 => self.reverse_top(3),
            Reverse4 => self.reverse_top(4),
            ReverseN => {
                let count = self.pop_usize()?;
                self.reverse_top(count)
            }
            _ => unreachable!("stack dispatch covers all variants"),
        }
    }

    /// Removes and returns the item `depth` positions from the top.
    fn remove_at(&mut self, depth: usize) -> VmResult<StackItem> {
        self.with_stack(|stack| {
            let len = stack.len();
            if depth >= len {
                return Err(VmError::InvalidOperation(format!(
                    "remove {depth} beyond stack of {len}"
                )));
            }
            Ok(stack.remove(len - 1 - depth))
        })
    }

    fn reverse_top(&mut self, count: usize) -> VmResult<()> {
        self.with_stack(|stack| {
            let len = stack.len();
            if count > len {
                return Err(VmError::InvalidOperation(format!(
                    "reverse {count} beyond stack of {len}"
                )));
            }
            stack[len - count..].reverse();
            Ok(())
        })
    }
}
