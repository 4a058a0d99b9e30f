//! The execution engine: invocation stack, gas metering and the main loop.

use crate::execution_context::{ExecutionContext, TryState};
use crate::interop::InteropRegistry;
use crate::stack_item::StackItem;
use crate::{CallFlags, Instruction, OpCode, ReferenceCounter, Script, VMState, VmError, VmResult};
use num_bigint::BigInt;
use std::rc::Rc;

/// Upper bound on the invocation stack depth.
pub const MAX_INVOCATION_STACK_SIZE: usize = 1024;

/// Default execution fee factor applied to opcode and syscall base prices.
pub const DEFAULT_EXEC_FEE_FACTOR: i64 = 30;

/// What the engine paused on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// An instruction retired; the engine is still running.
    Continue,
    /// A `SYSCALL` was validated and charged; the host must perform the
    /// service identified by the id, then resume stepping.
    Syscall(u32),
    /// The engine reached `Halt` or `Fault`.
    Done,
}

/// A deterministic, gas-metered stack machine.
///
/// Hosts that expose syscalls drive the engine through
/// [`ExecutionEngine::execute_step`] and dispatch [`StepResult::Syscall`]
/// themselves; scripts without syscalls can just call
/// [`ExecutionEngine::execute`].
pub struct ExecutionEngine {
    state: VMState,
    invocation_stack: Vec<ExecutionContext>,
    result_stack: Vec<StackItem>,
    reference_counter: ReferenceCounter,
    interops: InteropRegistry,
    gas_consumed: i64,
    gas_limit: i64,
    fee_factor: i64,
    uncaught_exception: Option<StackItem>,
    fault_message: Option<String>,
}

impl ExecutionEngine {
    /// Creates an engine with the given gas budget; a negative budget
    /// disables metering (test invocations meter through their own cap).
    pub fn new(gas_limit: i64) -> Self {
        Self {
            state: VMState::Break,
            invocation_stack: Vec::new(),
            result_stack: Vec::new(),
            reference_counter: ReferenceCounter::new(),
            interops: InteropRegistry::new(),
            gas_consumed: 0,
            gas_limit,
            fee_factor: DEFAULT_EXEC_FEE_FACTOR,
            uncaught_exception: None,
            fault_message: None,
        }
    }

    /// Replaces the interop table. Built once by the host at startup.
    pub fn set_interops(&mut self, interops: InteropRegistry) {
        self.interops = interops;
    }

    /// Sets the execution fee factor.
    pub fn set_fee_factor(&mut self, factor: i64) {
        self.fee_factor = factor;
    }

    /// Gets the engine state.
    pub fn state(&self) -> VMState {
        self.state
    }

    /// Gets the gas consumed so far, fee factor included.
    pub fn gas_consumed(&self) -> i64 {
        self.gas_consumed
    }

    /// Gets the remaining gas, or `-1` when unmetered.
    pub fn gas_left(&self) -> i64 {
        if self.gas_limit < 0 {
            -1
        } else {
            self.gas_limit - self.gas_consumed
        }
    }

    /// The message of the fault, if the engine faulted.
    pub fn fault_message(&self) -> Option<&str> {
        self.fault_message.as_deref()
    }

    /// Items left for the caller after a clean halt.
    pub fn result_stack(&self) -> &[StackItem] {
        &self.result_stack
    }

    /// The shared reference counter.
    pub fn reference_counter(&self) -> &ReferenceCounter {
        &self.reference_counter
    }

    /// A cheap handle to the counter for use inside opcode handlers.
    pub(crate) fn counter(&self) -> ReferenceCounter {
        self.reference_counter.clone()
    }

    /// Depth of the invocation stack.
    pub fn invocation_depth(&self) -> usize {
        self.invocation_stack.len()
    }

    /// Loads a script as a new entry on the invocation stack.
    pub fn load_script(&mut self, script: Script, rv_count: i32, call_flags: CallFlags) {
        let context = ExecutionContext::new(script, rv_count, call_flags);
        self.load_context(context);
    }

    /// Pushes a prepared context.
    pub fn load_context(&mut self, context: ExecutionContext) {
        self.invocation_stack.push(context);
        if self.state == VMState::Break {
            self.state = VMState::None;
        }
    }

    /// Gets the executing context.
    pub fn current_context(&self) -> VmResult<&ExecutionContext> {
        self.invocation_stack
            .last()
            .ok_or_else(|| VmError::InvalidOperation("no executing context".to_string()))
    }

    /// Gets the executing context mutably.
    pub fn current_context_mut(&mut self) -> VmResult<&mut ExecutionContext> {
        self.invocation_stack
            .last_mut()
            .ok_or_else(|| VmError::InvalidOperation("no executing context".to_string()))
    }

    /// Gets the entry (bottom) context.
    pub fn entry_context(&self) -> VmResult<&ExecutionContext> {
        self.invocation_stack
            .first()
            .ok_or_else(|| VmError::InvalidOperation("no executing context".to_string()))
    }

    // === Stack access ===

    /// Pushes onto the current evaluation stack.
    pub fn push(&mut self, item: StackItem) -> VmResult<()> {
        self.reference_counter.add(&item)?;
        let context = self.current_context_mut()?;
        context.evaluation_stack.borrow_mut().push(item);
        Ok(())
    }

    /// Pops from the current evaluation stack.
    pub fn pop(&mut self) -> VmResult<StackItem> {
        let context = self.current_context_mut()?;
        let item = context
            .evaluation_stack
            .borrow_mut()
            .pop()
            .ok_or_else(|| VmError::InvalidOperation("evaluation stack is empty".to_string()))?;
        self.reference_counter.remove(&item);
        Ok(item)
    }

    /// Pops an integer.
    pub fn pop_int(&mut self) -> VmResult<BigInt> {
        self.pop()?.try_integer()
    }

    /// Pops an integer that must fit a machine word.
    pub fn pop_usize(&mut self) -> VmResult<usize> {
        let value = self.pop_int()?;
        usize::try_from(&value)
            .map_err(|_| VmError::InvalidOperation(format!("{value} is not a valid count")))
    }

    /// Pops a boolean.
    pub fn pop_bool(&mut self) -> VmResult<bool> {
        self.pop()?.try_bool()
    }

    /// Pops a byte string.
    pub fn pop_bytes(&mut self) -> VmResult<Vec<u8>> {
        self.pop()?.try_bytes()
    }

    /// Clones the item `depth` positions from the top.
    pub fn peek(&self, depth: usize) -> VmResult<StackItem> {
        let context = self.current_context()?;
        let stack = context.evaluation_stack.borrow();
        let len = stack.len();
        if depth >= len {
            return Err(VmError::InvalidOperation(format!(
                "peek {depth} beyond stack of {len}"
            )));
        }
        Ok(stack[len - 1 - depth].clone())
    }

    /// Runs a closure over the current evaluation stack.
    pub(crate) fn with_stack<T>(
        &mut self,
        f: impl FnOnce(&mut Vec<StackItem>) -> VmResult<T>,
    ) -> VmResult<T> {
        let context = self.current_context_mut()?;
        let stack = Rc::clone(&context.evaluation_stack);
        let mut stack = stack.borrow_mut();
        f(&mut stack)
    }

    // === Gas ===

    /// Charges `base_price * fee_factor` gas; faults the caller once the
    /// budget is exceeded.
    pub fn add_fee(&mut self, base_price: i64) -> VmResult<()> {
        self.gas_consumed = self
            .gas_consumed
            .saturating_add(base_price.saturating_mul(self.fee_factor));
        if self.gas_limit >= 0 && self.gas_consumed > self.gas_limit {
            return Err(VmError::OutOfGas {
                consumed: self.gas_consumed,
                limit: self.gas_limit,
            });
        }
        Ok(())
    }

    // === Main loop ===

    /// Runs to completion. Scripts reaching a `SYSCALL` fault, because no
    /// host is attached; hosts use [`ExecutionEngine::execute_step`].
    pub fn execute(&mut self) -> VMState {
        loop {
            match self.execute_step() {
                StepResult::Continue => {}
                StepResult::Syscall(id) => {
                    self.fault(VmError::UnknownSyscall(id).to_string());
                    return self.state;
                }
                StepResult::Done => return self.state,
            }
        }
    }

    /// Executes one instruction.
    pub fn execute_step(&mut self) -> StepResult {
        match self.state {
            VMState::Halt | VMState::Fault => return StepResult::Done,
            VMState::Break => self.state = VMState::None,
            VMState::None => {}
        }
        if self.invocation_stack.is_empty() {
            self.state = VMState::Halt;
            return StepResult::Done;
        }
        match self.execute_next() {
            Ok(Some(id)) => StepResult::Syscall(id),
            Ok(None) => {
                if self.invocation_stack.is_empty() {
                    self.state = VMState::Halt;
                    StepResult::Done
                } else {
                    StepResult::Continue
                }
            }
            Err(error) => self.route_error(error),
        }
    }

    /// Whether an error can be intercepted by a script `TRY` handler.
    fn is_catchable(error: &VmError) -> bool {
        matches!(
            error,
            VmError::InvalidOperation(_) | VmError::InvalidCast(_) | VmError::UncaughtException(_)
        )
    }

    fn route_error(&mut self, error: VmError) -> StepResult {
        if let VmError::UncaughtException(message) = &error {
            self.fault(format!("uncaught exception: {message}"));
            return StepResult::Done;
        }
        if Self::is_catchable(&error) {
            let exception = StackItem::from_bytes(error.to_string().into_bytes());
            match self.throw_item(exception) {
                Ok(()) => StepResult::Continue,
                Err(inner) => {
                    self.fault(inner.to_string());
                    StepResult::Done
                }
            }
        } else {
            self.fault(error.to_string());
            StepResult::Done
        }
    }

    /// Marks the engine faulted.
    pub fn fault(&mut self, message: impl Into<String>) {
        self.state = VMState::Fault;
        self.fault_message = Some(message.into());
    }

    fn execute_next(&mut self) -> VmResult<Option<u32>> {
        let (instruction, next_ip) = {
            let context = self.current_context()?;
            if context.ip >= context.script.len() {
                // Running off the end of a script behaves like RET.
                (
                    Instruction {
                        opcode: OpCode::Ret,
                        operand: Vec::new(),
                        offset: context.ip,
                        size: 0,
                    },
                    context.ip,
                )
            } else {
                let instruction = context.script.instruction_at(context.ip)?;
                let next_ip = instruction.offset + instruction.size;
                (instruction, next_ip)
            }
        };

        self.add_fee(instruction.opcode.price())?;
        self.current_context_mut()?.ip = next_ip;
        self.dispatch(&instruction)
    }

    fn dispatch(&mut self, ix: &Instruction) -> VmResult<Option<u32>> {
        use OpCode::*;
        match ix.opcode {
            // Constants
            PushInt8 | PushInt16 | PushInt32 | PushInt64 | PushInt128 | PushInt256 | PushT
            | PushF | PushA | PushNull | PushData1 | PushData2 | PushData4 | PushM1 | Push0
            | Push1 | Push2 | Push3 | Push4 | Push5 | Push6 | Push7 | Push8 | Push9 | Push10
            | Push11 | Push12 | Push13 | Push14 | Push15 | Push16 => self.exec_push(ix)?,

            // Flow control
            Nop => {}
            Jmp | JmpL | JmpIf | JmpIfL | JmpIfNot | JmpIfNotL | JmpEq | JmpEqL | JmpNe
            | JmpNeL | JmpGt | JmpGtL | JmpGe | JmpGeL | JmpLt | JmpLtL | JmpLe | JmpLeL => {
                self.exec_jump(ix)?
            }
            Call | CallL | CallA => self.exec_call(ix)?,
            Abort => return Err(VmError::Aborted("ABORT".to_string())),
            Assert => {
                if !self.pop_bool()? {
                    return Err(VmError::Aborted("ASSERT failed".to_string()));
                }
            }
            Throw => {
                let exception = self.pop()?;
                self.throw_item(exception)?;
            }
            Try | TryL => self.exec_try(ix)?,
            EndTry | EndTryL => self.exec_end_try(ix)?,
            EndFinally => self.exec_end_finally()?,
            Ret => self.exec_ret()?,
            Syscall => return self.exec_syscall(ix).map(Some),

            // Stack
            Depth | Drop | Nip | XDrop | Clear | Dup | Over | Pick | Tuck | Swap | Rot | Roll
            | Reverse3 | Reverse4 | ReverseN => self.exec_stack_op(ix)?,

            // Slots
            InitSSlot | InitSlot | LdSFld0 | LdSFld1 | LdSFld2 | LdSFld3 | LdSFld4 | LdSFld5
            | LdSFld6 | LdSFld | StSFld0 | StSFld1 | StSFld2 | StSFld3 | StSFld4 | StSFld5
            | StSFld6 | StSFld | LdLoc0 | LdLoc1 | LdLoc2 | LdLoc3 | LdLoc4 | LdLoc5 | LdLoc6
            | LdLoc | StLoc0 | StLoc1 | StLoc2 | StLoc3 | StLoc4 | StLoc5 | StLoc6 | StLoc
            | LdArg0 | LdArg1 | LdArg2 | LdArg3 | LdArg4 | LdArg5 | LdArg6 | LdArg | StArg0
            | StArg1 | StArg2 | StArg3 | StArg4 | StArg5 | StArg6 | StArg => {
                self.exec_slot_op(ix)?
            }

            // Splice
            NewBuffer | Cat | SubStr | Left | Right => self.exec_splice(ix)?,

            // Bitwise and equality
            Invert | And | Or | Xor | Equal | NotEqual => self.exec_bitwise(ix)?,

            // Numeric
            Sign | Abs | Negate | Inc | Dec | Add | Sub | Mul | Div | Mod | Pow | Sqrt | Shl
            | Shr | Not | BoolAnd | BoolOr | Nz | NumEqual | NumNotEqual | Lt | Le | Gt | Ge
            | Min | Max | Within => self.exec_numeric(ix)?,

            // Compound types
            Pack | Unpack | NewArray0 | NewArray | NewStruct0 | NewStruct | NewMap | Size
            | HasKey | Keys | Values | PickItem | Append | SetItem | ReverseItems | Remove
            | ClearItems | PopItem => self.exec_compound(ix)?,

            // Types
            IsNull | IsType | Convert => self.exec_type_op(ix)?,
        }
        Ok(None)
    }

    fn exec_syscall(&mut self, ix: &Instruction) -> VmResult<u32> {
        let id = ix.operand_u32();
        let descriptor = self
            .interops
            .get(id)
            .cloned()
            .ok_or(VmError::UnknownSyscall(id))?;
        let current_flags = self.current_context()?.call_flags;
        if !current_flags.contains(descriptor.required_call_flags) {
            return Err(VmError::MissingCallFlags {
                have: current_flags.0,
                need: descriptor.required_call_flags.0,
            });
        }
        self.add_fee(descriptor.price)?;
        Ok(id)
    }

    // === Calls and returns ===

    pub(crate) fn exec_call(&mut self, ix: &Instruction) -> VmResult<()> {
        if self.invocation_stack.len() >= MAX_INVOCATION_STACK_SIZE {
            return Err(VmError::LimitExceeded(
                "invocation stack overflow".to_string(),
            ));
        }
        let target = match ix.opcode {
            OpCode::CallA => match self.pop()? {
                StackItem::Pointer(position) => position,
                other => {
                    return Err(VmError::InvalidOperation(format!(
                        "CALLA expects a pointer, got {:?}",
                        other.item_type()
                    )))
                }
            },
            OpCode::Call => offset_target(ix, ix.operand_i8() as i32)?,
            _ => offset_target(ix, ix.operand_i32())?,
        };
        let context = self.current_context()?;
        if target > context.script.len() {
            return Err(VmError::InvalidScript(format!(
                "call target {target} out of bounds"
            )));
        }
        let frame = context.fork_for_call(target);
        self.invocation_stack.push(frame);
        Ok(())
    }

    pub(crate) fn exec_ret(&mut self) -> VmResult<()> {
        let finished = self
            .invocation_stack
            .pop()
            .ok_or_else(|| VmError::InvalidOperation("RET without context".to_string()))?;

        let shares_stack = self
            .invocation_stack
            .last()
            .map(|parent| Rc::ptr_eq(&parent.evaluation_stack, &finished.evaluation_stack))
            .unwrap_or(false);

        if !shares_stack {
            let mut items: Vec<StackItem> =
                std::mem::take(&mut *finished.evaluation_stack.borrow_mut());
            if finished.rv_count >= 0 && items.len() > finished.rv_count as usize {
                let keep_from = items.len() - finished.rv_count as usize;
                for dropped in items.drain(..keep_from) {
                    self.reference_counter.remove(&dropped);
                }
            }
            match self.invocation_stack.last_mut() {
                Some(parent) => parent.evaluation_stack.borrow_mut().extend(items),
                None => self.result_stack.extend(items),
            }
        }
        Ok(())
    }

    // === Exceptions ===

    /// Raises `exception`, unwinding through try handlers.
    pub fn throw_item(&mut self, exception: StackItem) -> VmResult<()> {
        self.uncaught_exception = Some(exception);
        self.handle_exception()
    }

    fn handle_exception(&mut self) -> VmResult<()> {
        enum Action {
            Catch,
            Finally,
        }
        loop {
            if self.invocation_stack.is_empty() {
                let message = self
                    .uncaught_exception
                    .take()
                    .and_then(|item| item.try_bytes().ok())
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_default();
                return Err(VmError::UncaughtException(message));
            }
            let action = {
                let context = self
                    .invocation_stack
                    .last_mut()
                    .ok_or_else(|| VmError::InvalidOperation("no context".to_string()))?;
                let mut found = None;
                while let Some(mut try_context) = context.try_stack.pop() {
                    if try_context.state == TryState::Try && try_context.catch_offset.is_some() {
                        try_context.state = TryState::Catch;
                        context.ip = try_context
                            .catch_offset
                            .ok_or_else(|| VmError::InvalidOperation("no catch".to_string()))?;
                        context.try_stack.push(try_context);
                        found = Some(Action::Catch);
                        break;
                    }
                    if try_context.state != TryState::Finally
                        && try_context.finally_offset.is_some()
                    {
                        try_context.state = TryState::Finally;
                        context.ip = try_context
                            .finally_offset
                            .ok_or_else(|| VmError::InvalidOperation("no finally".to_string()))?;
                        context.try_stack.push(try_context);
                        found = Some(Action::Finally);
                        break;
                    }
                }
                found
            };
            match action {
                Some(Action::Catch) => {
                    let exception = self.uncaught_exception.take().ok_or_else(|| {
                        VmError::InvalidOperation("no pending exception".to_string())
                    })?;
                    self.push(exception)?;
                    return Ok(());
                }
                Some(Action::Finally) => return Ok(()),
                None => {
                    self.unwind_top_context()?;
                }
            }
        }
    }

    fn unwind_top_context(&mut self) -> VmResult<()> {
        let finished = self
            .invocation_stack
            .pop()
            .ok_or_else(|| VmError::InvalidOperation("no context to unwind".to_string()))?;
        if Rc::strong_count(&finished.evaluation_stack) == 1 {
            for item in finished.evaluation_stack.borrow().iter() {
                self.reference_counter.remove(item);
            }
        }
        Ok(())
    }

    /// Pending exception, set while a finally block runs during unwind.
    pub(crate) fn pending_exception(&mut self) -> Option<StackItem> {
        self.uncaught_exception.take()
    }
}

/// Resolves a relative jump operand into an absolute script offset.
pub(crate) fn offset_target(ix: &Instruction, relative: i32) -> VmResult<usize> {
    let target = ix.offset as i64 + relative as i64;
    usize::try_from(target)
        .map_err(|_| VmError::InvalidScript(format!("jump target {target} out of bounds")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: Vec<u8>) -> ExecutionEngine {
        let mut engine = ExecutionEngine::new(-1);
        engine.load_script(Script::new(script), -1, CallFlags::ALL);
        engine.execute();
        engine
    }

    #[test]
    fn empty_script_halts() {
        let engine = run(vec![]);
        assert_eq!(engine.state(), VMState::Halt);
    }

    #[test]
    fn push_and_add() {
        // PUSH2 PUSH3 ADD RET
        let engine = run(vec![0x12, 0x13, 0x9E, 0x40]);
        assert_eq!(engine.state(), VMState::Halt);
        assert_eq!(
            engine.result_stack()[0].try_integer().unwrap(),
            BigInt::from(5)
        );
    }

    #[test]
    fn gas_exhaustion_faults() {
        let mut engine = ExecutionEngine::new(10);
        engine.load_script(Script::new(vec![0x12, 0x13, 0x9E, 0x40]), -1, CallFlags::ALL);
        assert_eq!(engine.execute(), VMState::Fault);
        assert!(engine.fault_message().unwrap().contains("gas"));
    }

    #[test]
    fn abort_is_uncatchable() {
        // TRY(catch=+4, finally=0) ABORT ... catch: PUSH1 RET
        let script = vec![0x3B, 0x04, 0x00, 0x38, 0x11, 0x40];
        let engine = run(script);
        assert_eq!(engine.state(), VMState::Fault);
        assert!(engine.fault_message().unwrap().contains("abort"));
    }

    #[test]
    fn throw_reaches_catch() {
        // 0: TRY catch=+5 finally=0
        // 3: PUSH9
        // 4: THROW
        // 5: (catch) PUSH7 -> exception replaced by 7 on stack
        // 6: RET
        let script = vec![0x3B, 0x05, 0x00, 0x19, 0x3A, 0x17, 0x40];
        let engine = run(script);
        assert_eq!(engine.state(), VMState::Halt);
        // Top of stack is 7, below it the thrown 9.
        let results = engine.result_stack();
        let top = results.last().unwrap();
        assert_eq!(top.try_integer().unwrap(), BigInt::from(7));
    }

    #[test]
    fn uncaught_throw_faults() {
        // PUSH1 THROW
        let engine = run(vec![0x11, 0x3A]);
        assert_eq!(engine.state(), VMState::Fault);
    }

    #[test]
    fn call_and_return() {
        // 0: CALL +3 ; 2: RET ; 3: PUSH5 ; 4: RET
        let engine = run(vec![0x34, 0x03, 0x40, 0x15, 0x40]);
        assert_eq!(engine.state(), VMState::Halt);
        assert_eq!(
            engine.result_stack()[0].try_integer().unwrap(),
            BigInt::from(5)
        );
    }

    #[test]
    fn conditional_jump() {
        // PUSH1 JMPIF +3 (skip PUSH2) PUSH2 PUSH3 RET -> stack [3]
        let engine = run(vec![0x11, 0x24, 0x03, 0x12, 0x13, 0x40]);
        assert_eq!(engine.state(), VMState::Halt);
        assert_eq!(engine.result_stack().len(), 1);
        assert_eq!(
            engine.result_stack()[0].try_integer().unwrap(),
            BigInt::from(3)
        );
    }

    #[test]
    fn syscall_without_host_faults() {
        let mut engine = ExecutionEngine::new(-1);
        let mut registry = InteropRegistry::new();
        registry.register(crate::InteropDescriptor::new(
            "System.Runtime.Platform",
            1 << 3,
            CallFlags::NONE,
        ));
        engine.set_interops(registry);
        let id = neo3_cryptography::syscall_id("System.Runtime.Platform");
        let mut script = vec![0x41];
        script.extend_from_slice(&id.to_le_bytes());
        script.push(0x40);
        engine.load_script(Script::new(script), -1, CallFlags::ALL);
        // Without a host loop, execute() faults on the syscall.
        assert_eq!(engine.execute(), VMState::Fault);
    }

    #[test]
    fn step_surfaces_syscall_to_host() {
        let mut engine = ExecutionEngine::new(-1);
        let mut registry = InteropRegistry::new();
        registry.register(crate::InteropDescriptor::new(
            "System.Runtime.Platform",
            1 << 3,
            CallFlags::NONE,
        ));
        engine.set_interops(registry);
        let id = neo3_cryptography::syscall_id("System.Runtime.Platform");
        let mut script = vec![0x41];
        script.extend_from_slice(&id.to_le_bytes());
        script.push(0x40);
        engine.load_script(Script::new(script), -1, CallFlags::ALL);

        loop {
            match engine.execute_step() {
                StepResult::Syscall(received) => {
                    assert_eq!(received, id);
                    engine.push(StackItem::from_bytes(b"NEO".to_vec())).unwrap();
                }
                StepResult::Continue => {}
                StepResult::Done => break,
            }
        }
        assert_eq!(engine.state(), VMState::Halt);
        assert_eq!(engine.result_stack()[0].try_bytes().unwrap(), b"NEO");
    }

    #[test]
    fn missing_call_flags_fault() {
        let mut engine = ExecutionEngine::new(-1);
        let mut registry = InteropRegistry::new();
        registry.register(crate::InteropDescriptor::new(
            "System.Storage.Put",
            1 << 15,
            CallFlags::WRITE_STATES,
        ));
        engine.set_interops(registry);
        let id = neo3_cryptography::syscall_id("System.Storage.Put");
        let mut script = vec![0x41];
        script.extend_from_slice(&id.to_le_bytes());
        script.push(0x40);
        engine.load_script(Script::new(script), -1, CallFlags::READ_ONLY);
        assert_eq!(engine.execute(), VMState::Fault);
    }
}
