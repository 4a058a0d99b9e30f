//! Static, local and argument slot instructions.

use crate::{ExecutionEngine, Instruction, OpCode, StackItem, VmError, VmResult};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Static,
    Local,
    Argument,
}

impl ExecutionEngine {
    pub(crate) fn exec_slot_op(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        let byte = ix.opcode as u8;
        match ix.opcode {
            InitSSlot => {
                let count = ix.operand_u8(0) as usize;
                if count == 0 {
                    return Err(VmError::InvalidScript("INITSSLOT of zero".to_string()));
                }
                let fields: Vec<StackItem> = (0..count).map(|_| StackItem::Null).collect();
                for field in &fields {
                    self.counter().add(field)?;
                }
                let context = self.current_context_mut()?;
                if context.static_fields.is_some() {
                    return Err(VmError::InvalidOperation(
                        "static slot already initialized".to_string(),
                    ));
                }
                context.static_fields = Some(Rc::new(RefCell::new(fields)));
                Ok(())
            }
            InitSlot => {
                let local_count = ix.operand_u8(0) as usize;
                let argument_count = ix.operand_u8(1) as usize;
                if local_count == 0 && argument_count == 0 {
                    return Err(VmError::InvalidScript("INITSLOT of zero".to_string()));
                }
                {
                    let context = self.current_context()?;
                    if context.local_variables.is_some() || context.arguments.is_some() {
                        return Err(VmError::InvalidOperation(
                            "slots already initialized".to_string(),
                        ));
                    }
                }
                let locals: Vec<StackItem> = (0..local_count).map(|_| StackItem::Null).collect();
                for local in &locals {
                    self.counter().add(local)?;
                }
                // Arguments are popped top-first: the topmost item becomes
                // argument 0.
                let mut arguments = Vec::with_capacity(argument_count);
                for _ in 0..argument_count {
                    let argument = self.pop()?;
                    self.counter().add(&argument)?;
                    arguments.push(argument);
                }
                let context = self.current_context_mut()?;
                context.local_variables = Some(locals);
                context.arguments = Some(arguments);
                Ok(())
            }
            LdSFld0 | LdSFld1 | LdSFld2 | LdSFld3 | LdSFld4 | LdSFld5 | LdSFld6 => {
                self.load_slot(SlotKind::Static, (byte - LdSFld0 as u8) as usize)
            }
            LdSFld => self.load_slot(SlotKind::Static, ix.operand_u8(0) as usize),
            StSFld0 | StSFld1 | StSFld2 | StSFld3 | StSFld4 | StSFld5 | StSFld6 => {
                self.store_slot(SlotKind::Static, (byte - StSFld0 as u8) as usize)
            }
            StSFld => self.store_slot(SlotKind::Static, ix.operand_u8(0) as usize),
            LdLoc0 | LdLoc1 | LdLoc2 | LdLoc3 | LdLoc4 | LdLoc5 | LdLoc6 => {
                self.load_slot(SlotKind::Local, (byte - LdLoc0 as u8) as usize)
            }
            LdLoc => self.load_slot(SlotKind::Local, ix.operand_u8(0) as usize),
            StLoc0 | StLoc1 | StLoc2 | StLoc3 | StLoc4 | StLoc5 | StLoc6 => {
                self.store_slot(SlotKind::Local, (byte - StLoc0 as u8) as usize)
            }
            StLoc => self.store_slot(SlotKind::Local, ix.operand_u8(0) as usize),
            LdArg0 | LdArg1 | LdArg2 | LdArg3 | LdArg4 | LdArg5 | LdArg6 => {
                self.load_slot(SlotKind::Argument, (byte - LdArg0 as u8) as usize)
            }
            LdArg => self.load_slot(SlotKind::Argument, ix.operand_u8(0) as usize),
            StArg0 | StArg1 | StArg2 | StArg3 | StArg4 | StArg5 | StArg6 => {
                self.store_slot(SlotKind::Argument, (byte - StArg0 as u8) as usize)
            }
            StArg => self.store_slot(SlotKind::Argument, ix.operand_u8(0) as usize),
            _ => unreachable!("slot dispatch covers all variants"),
        }
    }

    fn load_slot(&mut self, kind: SlotKind, index: usize) -> VmResult<()> {
        let item = {
            let context = self.current_context()?;
            match kind {
                SlotKind::Static => {
                    let fields = context
                        .static_fields
                        .as_ref()
                        .ok_or_else(|| slot_missing("static"))?;
                    let fields = fields.borrow();
                    fields.get(index).cloned().ok_or_else(|| slot_oob(index))?
                }
                SlotKind::Local => {
                    let locals = context
                        .local_variables
                        .as_ref()
                        .ok_or_else(|| slot_missing("local"))?;
                    locals.get(index).cloned().ok_or_else(|| slot_oob(index))?
                }
                SlotKind::Argument => {
                    let arguments = context
                        .arguments
                        .as_ref()
                        .ok_or_else(|| slot_missing("argument"))?;
                    arguments.get(index).cloned().ok_or_else(|| slot_oob(index))?
                }
            }
        };
        self.push(item)
    }

    fn store_slot(&mut self, kind: SlotKind, index: usize) -> VmResult<()> {
        let item = self.pop()?;
        self.counter().add(&item)?;
        let old = {
            let context = self.current_context_mut()?;
            match kind {
                SlotKind::Static => {
                    let fields = context
                        .static_fields
                        .as_ref()
                        .ok_or_else(|| slot_missing("static"))?;
                    let mut fields = fields.borrow_mut();
                    let slot = fields.get_mut(index).ok_or_else(|| slot_oob(index))?;
                    std::mem::replace(slot, item)
                }
                SlotKind::Local => {
                    let locals = context
                        .local_variables
                        .as_mut()
                        .ok_or_else(|| slot_missing("local"))?;
                    let slot = locals.get_mut(index).ok_or_else(|| slot_oob(index))?;
                    std::mem::replace(slot, item)
                }
                SlotKind::Argument => {
                    let arguments = context
                        .arguments
                        .as_mut()
                        .ok_or_else(|| slot_missing("argument"))?;
                    let slot = arguments.get_mut(index).ok_or_else(|| slot_oob(index))?;
                    std::mem::replace(slot, item)
                }
            }
        };
        self.counter().remove(&old);
        Ok(())
    }
}

fn slot_missing(kind: &str) -> VmError {
    VmError::InvalidOperation(format!("{kind} slot not initialized"))
}

fn slot_oob(index: usize) -> VmError {
    VmError::InvalidOperation(format!("slot index {index} out of range"))
}
