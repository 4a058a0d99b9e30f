//! Execution contexts: one frame per loaded script or call.

use crate::{CallFlags, Script, StackItem};
use neo3_core::UInt160;
use std::cell::RefCell;
use std::rc::Rc;

/// State of a try block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryState {
    Try,
    Catch,
    Finally,
}

/// An active `TRY` region of a context.
#[derive(Debug, Clone)]
pub struct TryContext {
    pub catch_offset: Option<usize>,
    pub finally_offset: Option<usize>,
    /// Where execution resumes after `ENDFINALLY`.
    pub end_offset: usize,
    pub state: TryState,
}

/// A frame of the invocation stack.
///
/// The evaluation stack is shared between frames created by `CALL` within
/// the same script and fresh for every loaded script, so arguments flow to
/// callees and results flow back without copying.
pub struct ExecutionContext {
    pub script: Script,
    pub ip: usize,
    pub evaluation_stack: Rc<RefCell<Vec<StackItem>>>,
    pub static_fields: Option<Rc<RefCell<Vec<StackItem>>>>,
    pub local_variables: Option<Vec<StackItem>>,
    pub arguments: Option<Vec<StackItem>>,
    pub try_stack: Vec<TryContext>,
    /// Number of values handed back to the caller; `-1` means all.
    pub rv_count: i32,
    pub call_flags: CallFlags,
    /// Hash of the executing script, when known to the host.
    pub script_hash: UInt160,
    /// Hash of the script that loaded this one.
    pub calling_script_hash: UInt160,
}

impl ExecutionContext {
    /// Creates a fresh context over a script.
    pub fn new(script: Script, rv_count: i32, call_flags: CallFlags) -> Self {
        Self {
            script_hash: UInt160::from_script(script.as_bytes()),
            script,
            ip: 0,
            evaluation_stack: Rc::new(RefCell::new(Vec::new())),
            static_fields: None,
            local_variables: None,
            arguments: None,
            try_stack: Vec::new(),
            rv_count,
            call_flags,
            calling_script_hash: UInt160::zero(),
        }
    }

    /// Creates the frame for a `CALL` into the same script: shared
    /// evaluation stack and static fields, fresh slots and try stack.
    pub fn fork_for_call(&self, ip: usize) -> Self {
        Self {
            script: self.script.clone(),
            ip,
            evaluation_stack: Rc::clone(&self.evaluation_stack),
            static_fields: self.static_fields.clone(),
            local_variables: None,
            arguments: None,
            try_stack: Vec::new(),
            rv_count: -1,
            call_flags: self.call_flags,
            script_hash: self.script_hash,
            calling_script_hash: self.calling_script_hash,
        }
    }

    /// Depth of this frame's evaluation stack.
    pub fn stack_depth(&self) -> usize {
        self.evaluation_stack.borrow().len()
    }
}
