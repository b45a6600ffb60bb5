//! Execution engine module for the Neo Virtual Machine.
//!
//! This module provides the execution engine implementation for the Neo VM:
//! the fetch-decode-execute loop, gas metering, the script cache and the
//! three host callbacks (interop dispatch, script loading and the signable
//! message provider).

use crate::error::{VmError, VmResult};
use crate::evaluation_stack::EvaluationStack;
use crate::execution_context::ExecutionContext;
use crate::execution_context_stack::ExecutionContextStack;
use crate::instruction::Instruction;
use crate::jump_table::JumpTable;
use crate::op_code::OpCode;
use crate::script::{Script, SCRIPT_HASH_SIZE};
use crate::stack_item::{CompoundTracker, StackItem};
use crate::vm_state::VMState;
use neo_legacy_crypto::{Crypto, NeoCrypto};
use std::fmt;
use std::sync::Arc;

/// Host handler for SYSCALL. Receives the method name; returns `false` to fault.
pub type InvokeInteropCallback = Box<dyn FnMut(&mut ExecutionEngine, &[u8]) -> bool>;

/// Host resolver for APPCALL, TAILCALL and CALL_E*. Receives the script hash,
/// whether it was taken from the stack, and the requested return count. On
/// success it must push exactly one context, normally via
/// [`ExecutionEngine::load_script`].
pub type LoadScriptCallback =
    Box<dyn FnMut(&mut ExecutionEngine, &[u8; SCRIPT_HASH_SIZE], bool, i32) -> bool>;

/// Host provider of the signable message for a given iteration.
pub type GetMessageCallback = Box<dyn FnMut(u32) -> Vec<u8>>;

/// Restrictions on the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ExecutionEngineLimits {
    /// The maximum number of items across every stack of the engine.
    pub max_stack_size: usize,

    /// The maximum size of a byte string in bytes.
    pub max_item_size: usize,

    /// The maximum number of frames allowed on the invocation stack.
    pub max_invocation_stack_size: usize,

    /// The maximum number of elements in an array, struct or map.
    pub max_array_size: usize,

    /// The maximum encoded size of an integer operand or result.
    pub max_big_integer_size: usize,

    /// The largest shift accepted by SHL and SHR.
    pub max_shl_shr: i32,

    /// The smallest shift accepted by SHL and SHR.
    pub min_shl_shr: i32,

    /// The maximum length of a SYSCALL method name.
    pub max_syscall_name_size: usize,
}

impl ExecutionEngineLimits {
    /// The default execution engine limits.
    pub const DEFAULT: Self = Self {
        max_stack_size: 2 * 1024,
        max_item_size: 1024 * 1024,
        max_invocation_stack_size: 1024,
        max_array_size: 1024,
        max_big_integer_size: 32,
        max_shl_shr: u16::MAX as i32,
        min_shl_shr: -(u16::MAX as i32),
        max_syscall_name_size: 252,
    };

    /// Element budget for struct clone and equality walks.
    pub fn traversal_limit(&self) -> usize {
        self.max_stack_size.saturating_mul(self.max_array_size)
    }
}

impl Default for ExecutionEngineLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything that is reset between independent executions.
#[derive(Debug)]
struct Session {
    state: VMState,
    iteration: u32,
    invocation_stack: ExecutionContextStack,
    result_stack: EvaluationStack,
    scripts: Vec<Arc<Script>>,
    gas_consumed: u64,
    gas_limit: u64,
    /// Empties cyclic containers when the session is dropped.
    containers: CompoundTracker,
}

impl Session {
    fn new(iteration: u32, limits: &ExecutionEngineLimits) -> Self {
        Self {
            state: VMState::NONE,
            iteration,
            invocation_stack: ExecutionContextStack::new(limits.max_invocation_stack_size),
            result_stack: EvaluationStack::new(),
            scripts: Vec::new(),
            gas_consumed: 0,
            gas_limit: u64::MAX,
            containers: CompoundTracker::new(),
        }
    }
}

/// The execution engine for the Neo VM.
pub struct ExecutionEngine {
    /// Restrictions on the VM
    limits: ExecutionEngineLimits,

    /// The jump table used to execute instructions
    jump_table: JumpTable,

    /// Hash and signature primitives
    crypto: Arc<dyn Crypto>,

    /// State of the current execution
    session: Session,

    invoke_interop: Option<InvokeInteropCallback>,
    load_script: Option<LoadScriptCallback>,
    get_message: Option<GetMessageCallback>,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("limits", &self.limits)
            .field("session", &self.session)
            .field("invoke_interop", &self.invoke_interop.is_some())
            .field("load_script", &self.load_script.is_some())
            .field("get_message", &self.get_message.is_some())
            .finish()
    }
}

impl ExecutionEngine {
    /// Creates an engine with the default limits and [`NeoCrypto`].
    pub fn new() -> Self {
        Self::with_limits(ExecutionEngineLimits::default())
    }

    /// Creates an engine with the specified limits.
    pub fn with_limits(limits: ExecutionEngineLimits) -> Self {
        Self {
            limits,
            jump_table: JumpTable::new(),
            crypto: Arc::new(NeoCrypto),
            session: Session::new(0, &limits),
            invoke_interop: None,
            load_script: None,
            get_message: None,
        }
    }

    /// Replaces the crypto capability.
    pub fn with_crypto(mut self, crypto: Arc<dyn Crypto>) -> Self {
        self.crypto = crypto;
        self
    }

    /// Replaces the jump table.
    pub fn with_jump_table(mut self, jump_table: JumpTable) -> Self {
        self.jump_table = jump_table;
        self
    }

    pub fn set_invoke_interop(
        &mut self,
        callback: impl FnMut(&mut ExecutionEngine, &[u8]) -> bool + 'static,
    ) {
        self.invoke_interop = Some(Box::new(callback));
    }

    pub fn set_load_script(
        &mut self,
        callback: impl FnMut(&mut ExecutionEngine, &[u8; SCRIPT_HASH_SIZE], bool, i32) -> bool
            + 'static,
    ) {
        self.load_script = Some(Box::new(callback));
    }

    pub fn set_get_message(&mut self, callback: impl FnMut(u32) -> Vec<u8> + 'static) {
        self.get_message = Some(Box::new(callback));
    }

    /// Discards the current execution and starts a fresh one for `iteration`.
    ///
    /// Limits, crypto and host callbacks are kept.
    pub fn clean(&mut self, iteration: u32) {
        self.session = Session::new(iteration, &self.limits);
    }

    /// Returns the current state of the VM.
    pub fn state(&self) -> VMState {
        self.session.state
    }

    pub(crate) fn set_state(&mut self, state: VMState) {
        if self.session.state != state {
            log::debug!("state {:?} -> {:?}", self.session.state, state);
            self.session.state = state;
        }
    }

    pub fn iteration(&self) -> u32 {
        self.session.iteration
    }

    pub fn gas_consumed(&self) -> u64 {
        self.session.gas_consumed
    }

    pub fn gas_limit(&self) -> u64 {
        self.session.gas_limit
    }

    pub fn limits(&self) -> &ExecutionEngineLimits {
        &self.limits
    }

    pub fn crypto(&self) -> &Arc<dyn Crypto> {
        &self.crypto
    }

    pub fn jump_table(&self) -> &JumpTable {
        &self.jump_table
    }

    pub fn jump_table_mut(&mut self) -> &mut JumpTable {
        &mut self.jump_table
    }

    /// Returns the invocation stack.
    pub fn invocation_stack(&self) -> &ExecutionContextStack {
        &self.session.invocation_stack
    }

    pub fn invocation_stack_mut(&mut self) -> &mut ExecutionContextStack {
        &mut self.session.invocation_stack
    }

    /// Returns the result stack.
    pub fn result_stack(&self) -> &EvaluationStack {
        &self.session.result_stack
    }

    pub fn result_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.session.result_stack
    }

    /// Returns the current context, if any.
    pub fn current_context(&self) -> Option<&ExecutionContext> {
        self.session.invocation_stack.peek(0)
    }

    /// Returns the current context (mutable), if any.
    pub fn current_context_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.session.invocation_stack.peek_mut(0)
    }

    /// Returns the context that called the current one, if any.
    pub fn calling_context(&self) -> Option<&ExecutionContext> {
        self.session.invocation_stack.peek(1)
    }

    /// Returns the outermost context, if any.
    pub fn entry_context(&self) -> Option<&ExecutionContext> {
        self.session.invocation_stack.bottom()
    }

    /// Records that `container` now holds another container.
    ///
    /// Recorded containers that can reach themselves are emptied when the
    /// session ends (on [`Self::clean`] or drop). Hosts that nest containers
    /// from a callback register the outer one here.
    pub fn track_container(&mut self, container: &StackItem) {
        self.session.containers.track(container);
    }

    /// Number of distinct scripts loaded in this session.
    pub fn script_count(&self) -> usize {
        self.session.scripts.len()
    }

    pub fn cached_script(&self, index: usize) -> Option<&Arc<Script>> {
        self.session.scripts.get(index)
    }

    /// Adds `script` to the cache (reusing an identical one) and pushes a new
    /// context for it. Returns the cache index.
    pub fn load_script(&mut self, script: impl Into<Box<[u8]>>, rvcount: i32) -> VmResult<usize> {
        let script = Script::new(script);
        let hash = script.hash(self.crypto.as_ref());
        let index = match self.find_cached_script(&hash) {
            Some(index) => index,
            None => {
                self.session.scripts.push(Arc::new(script));
                self.session.scripts.len() - 1
            }
        };
        self.load_cached_script(index, rvcount)?;
        Ok(index)
    }

    /// Pushes a new context for a script already in the cache.
    pub fn load_cached_script(&mut self, index: usize, rvcount: i32) -> VmResult<()> {
        let script = self
            .session
            .scripts
            .get(index)
            .cloned()
            .ok_or_else(|| VmError::invalid_parameter_msg(format!("no cached script {index}")))?;
        self.session
            .invocation_stack
            .push(ExecutionContext::new(script, rvcount))
    }

    fn find_cached_script(&self, hash: &[u8; SCRIPT_HASH_SIZE]) -> Option<usize> {
        let crypto = self.crypto.as_ref();
        self.session
            .scripts
            .iter()
            .position(|script| script.hash(crypto) == *hash)
    }

    /// Resolves `hash` from the cache or through the host loader and pushes
    /// exactly one new context.
    pub(crate) fn load_script_by_hash(
        &mut self,
        hash: &[u8; SCRIPT_HASH_SIZE],
        is_dynamic: bool,
        rvcount: i32,
    ) -> VmResult<()> {
        if let Some(index) = self.find_cached_script(hash) {
            return self.load_cached_script(index, rvcount);
        }

        let mut loader = self
            .load_script
            .take()
            .ok_or_else(|| VmError::HostCallback("no script loader registered".into()))?;
        let depth = self.session.invocation_stack.len();
        let loaded = loader(self, hash, is_dynamic, rvcount);
        if self.load_script.is_none() {
            self.load_script = Some(loader);
        }

        log::debug!("load script {} -> {loaded}", hex::encode(hash));
        if !loaded {
            return Err(VmError::HostCallback(format!(
                "script {} could not be loaded",
                hex::encode(hash)
            )));
        }
        if self.session.invocation_stack.len() != depth + 1 {
            return Err(VmError::HostCallback(format!(
                "loader for {} pushed {} contexts",
                hex::encode(hash),
                self.session.invocation_stack.len() as i64 - depth as i64
            )));
        }
        Ok(())
    }

    /// Dispatches a SYSCALL to the host.
    pub(crate) fn invoke_interop(&mut self, method: &[u8]) -> VmResult<()> {
        let name = String::from_utf8_lossy(method).into_owned();
        let mut handler = self
            .invoke_interop
            .take()
            .ok_or_else(|| VmError::HostCallback(format!("no interop handler for {name}")))?;
        let success = handler(self, method);
        if self.invoke_interop.is_none() {
            self.invoke_interop = Some(handler);
        }

        log::debug!("syscall {name} -> {success}");
        if success {
            Ok(())
        } else {
            Err(VmError::HostCallback(format!("syscall {name} failed")))
        }
    }

    /// Fetches the signable message for the current iteration.
    pub(crate) fn get_message(&mut self) -> VmResult<Vec<u8>> {
        let iteration = self.session.iteration;
        let provider = self
            .get_message
            .as_mut()
            .ok_or_else(|| VmError::HostCallback("no message provider registered".into()))?;
        Ok(provider(iteration))
    }

    /// Charges `amount` gas. On exhaustion the engine enters `FAULT_BY_GAS`
    /// and `false` is returned.
    pub fn consume_gas(&mut self, amount: u64) -> bool {
        let total = self.session.gas_consumed.saturating_add(amount);
        if total > self.session.gas_limit {
            log::debug!(
                "gas exhausted: {} + {amount} > {}",
                self.session.gas_consumed,
                self.session.gas_limit
            );
            self.set_state(VMState::FAULT_BY_GAS);
            return false;
        }
        self.session.gas_consumed = total;
        true
    }

    /// Gas price of `opcode` given the current stack.
    pub fn price(&self, opcode: OpCode) -> u64 {
        match opcode {
            OpCode::SHA1 | OpCode::SHA256 => 10,
            OpCode::HASH160 | OpCode::HASH256 => 20,
            OpCode::CHECKSIG | OpCode::VERIFY => 100,
            OpCode::CHECKMULTISIG => self.multisig_price(),
            OpCode::APPCALL
            | OpCode::TAILCALL
            | OpCode::CALL_E
            | OpCode::CALL_ED
            | OpCode::CALL_ET
            | OpCode::CALL_EDT => 10,
            _ => 1,
        }
    }

    fn multisig_price(&self) -> u64 {
        let Some(item) = self.current_context().and_then(|c| c.peek(0).ok()) else {
            return 1;
        };
        let keys = match item {
            StackItem::Array(array) => array.len() as i64,
            StackItem::Struct(item) => item.len() as i64,
            other => other
                .get_big_integer()
                .ok()
                .and_then(|n| n.to_i64())
                .unwrap_or(0),
        };
        if keys < 1 {
            1
        } else {
            (keys as u64).saturating_mul(100)
        }
    }

    /// Total items across every context's stacks and the result stack.
    pub fn stack_item_count(&self) -> usize {
        let frames: usize = self
            .session
            .invocation_stack
            .iter()
            .map(|context| context.evaluation_stack().len() + context.alt_stack().len())
            .sum();
        frames + self.session.result_stack.len()
    }

    /// Sets the budget checked by [`Self::step_into`].
    pub fn set_gas_limit(&mut self, gas_limit: u64) {
        self.session.gas_limit = gas_limit;
    }

    /// Runs until the engine leaves `NONE` or `gas_limit` is exhausted.
    pub fn execute(&mut self, gas_limit: u64) -> VMState {
        self.set_gas_limit(gas_limit);
        while self.session.state.is_none() {
            self.step_into();
        }
        self.session.state
    }

    /// Executes exactly one instruction. A no-op once the engine is terminal.
    pub fn step_into(&mut self) -> VMState {
        if self.session.state.is_terminal() {
            return self.session.state;
        }
        if self.session.invocation_stack.is_empty() {
            self.set_state(VMState::HALT);
            return self.session.state;
        }

        if let Err(err) = self.execute_next() {
            log::debug!("fault: {err}");
            // A host callback may already have exhausted the gas budget.
            if self.session.state.is_none() {
                self.set_state(VMState::FAULT);
            }
            return self.session.state;
        }

        if self.session.state.is_none() {
            let count = self.stack_item_count();
            if count > self.limits.max_stack_size {
                log::debug!(
                    "fault: {}",
                    VmError::StackOverflow(format!("{count} > {}", self.limits.max_stack_size))
                );
                self.set_state(VMState::FAULT);
            } else if self.session.invocation_stack.is_empty() {
                self.set_state(VMState::HALT);
            }
        }

        self.session.state
    }

    /// Steps until control returns to the current frame or a shallower one.
    pub fn step_over(&mut self) -> VMState {
        if self.session.state.is_terminal() {
            return self.session.state;
        }
        let depth = self.session.invocation_stack.len();
        self.step_into();
        while self.session.state.is_none() && self.session.invocation_stack.len() > depth {
            self.step_into();
        }
        self.session.state
    }

    /// Steps until the current frame has returned.
    pub fn step_out(&mut self) -> VMState {
        if self.session.state.is_terminal() {
            return self.session.state;
        }
        let depth = self.session.invocation_stack.len();
        self.step_into();
        while self.session.state.is_none() && self.session.invocation_stack.len() >= depth {
            self.step_into();
        }
        self.session.state
    }

    /// Fetches, charges and dispatches the next instruction.
    fn execute_next(&mut self) -> VmResult<()> {
        let context = self
            .current_context()
            .ok_or_else(|| VmError::invalid_operation_msg("No current context"))?;

        let position = context.instruction_pointer();
        let byte = context.current_byte();
        // Running off the end of a script returns from it.
        let opcode = byte.map_or(Some(OpCode::RET), OpCode::from_byte);

        let price = opcode.map_or(1, |opcode| self.price(opcode));
        if !self.consume_gas(price) {
            return Ok(());
        }

        if byte.is_some() {
            let context = self
                .current_context_mut()
                .ok_or_else(|| VmError::invalid_operation_msg("No current context"))?;
            context.set_instruction_pointer(position + 1)?;
        }

        let opcode = opcode.ok_or_else(|| {
            VmError::InvalidOpcode(format!("{:#04x} at {position}", byte.unwrap_or_default()))
        })?;

        log::trace!("{opcode:?} at {position}");
        let instruction = Instruction::new(opcode, position);
        let handler = self.jump_table.handler(opcode);
        handler(self, &instruction).map_err(|err| {
            log::debug!("{opcode:?} at {position} failed: {err}");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ExecutionEngineLimits::default();
        assert_eq!(limits.max_stack_size, 2048);
        assert_eq!(limits.max_item_size, 1024 * 1024);
        assert_eq!(limits.max_invocation_stack_size, 1024);
        assert_eq!(limits.max_array_size, 1024);
        assert_eq!(limits.max_big_integer_size, 32);
        assert_eq!(limits.max_shl_shr, 65535);
        assert_eq!(limits.min_shl_shr, -65535);
        assert_eq!(limits.max_syscall_name_size, 252);
    }

    #[test]
    fn test_empty_engine_halts() {
        let mut engine = ExecutionEngine::new();
        assert_eq!(engine.execute(10), VMState::HALT);
        assert_eq!(engine.gas_consumed(), 0);
    }

    #[test]
    fn test_zero_gas_faults_before_first_opcode() {
        let mut engine = ExecutionEngine::new();
        engine.load_script(vec![0x51], -1).expect("load");
        assert_eq!(engine.execute(0), VMState::FAULT_BY_GAS);
        let context = engine.current_context().expect("context");
        assert!(context.evaluation_stack().is_empty());
        assert_eq!(context.instruction_pointer(), 0);
        assert_eq!(engine.gas_consumed(), 0);
    }

    #[test]
    fn test_gas_accounting() {
        let mut engine = ExecutionEngine::new();
        // PUSH1 SHA256 plus the implicit RET
        engine.load_script(vec![0x51, 0xA8], -1).expect("load");
        assert_eq!(engine.execute(100), VMState::HALT);
        assert_eq!(engine.gas_consumed(), 1 + 10 + 1);
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let mut engine = ExecutionEngine::new();
        engine.load_script(vec![0xF0, 0x51], -1).expect("load");
        assert_eq!(engine.step_into(), VMState::FAULT);
        let ip = engine.current_context().expect("context").instruction_pointer();
        assert_eq!(engine.step_into(), VMState::FAULT);
        assert_eq!(
            engine.current_context().expect("context").instruction_pointer(),
            ip
        );
    }

    #[test]
    fn test_invalid_opcode_faults() {
        let mut engine = ExecutionEngine::new();
        engine.load_script(vec![0xFF], -1).expect("load");
        assert_eq!(engine.execute(u64::MAX), VMState::FAULT);
        assert_eq!(engine.gas_consumed(), 1);
    }

    #[test]
    fn test_load_script_reuses_cache() {
        let mut engine = ExecutionEngine::new();
        let first = engine.load_script(vec![0x51], -1).expect("load");
        let second = engine.load_script(vec![0x51], -1).expect("load");
        let third = engine.load_script(vec![0x52], -1).expect("load");
        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(engine.script_count(), 2);
        assert_eq!(engine.invocation_stack().len(), 3);
        assert!(engine.load_cached_script(7, -1).is_err());
    }

    #[test]
    fn test_clean_resets_session() {
        let mut engine = ExecutionEngine::new();
        engine.load_script(vec![0x51], -1).expect("load");
        engine.execute(u64::MAX);
        assert_eq!(engine.state(), VMState::HALT);

        engine.clean(7);
        assert_eq!(engine.state(), VMState::NONE);
        assert_eq!(engine.iteration(), 7);
        assert_eq!(engine.gas_consumed(), 0);
        assert!(engine.result_stack().is_empty());
        assert_eq!(engine.script_count(), 0);
    }

    #[test]
    fn test_step_over_runs_whole_call() {
        let mut engine = ExecutionEngine::new();
        // 0: CALL +4 -> 4; 3: RET; 4: PUSH1 PUSH2 RET
        engine
            .load_script(vec![0x65, 0x04, 0x00, 0x66, 0x51, 0x52, 0x66], -1)
            .expect("load");
        assert_eq!(engine.step_over(), VMState::NONE);
        assert_eq!(engine.invocation_stack().len(), 1);
        let context = engine.current_context().expect("context");
        assert_eq!(context.instruction_pointer(), 3);
        assert_eq!(context.evaluation_stack().len(), 2);
    }

    #[test]
    fn test_step_out_returns_to_caller() {
        let mut engine = ExecutionEngine::new();
        engine
            .load_script(vec![0x65, 0x04, 0x00, 0x66, 0x51, 0x52, 0x66], -1)
            .expect("load");
        engine.step_into();
        assert_eq!(engine.invocation_stack().len(), 2);
        assert_eq!(engine.step_out(), VMState::NONE);
        assert_eq!(engine.invocation_stack().len(), 1);
        assert_eq!(engine.calling_context().map(|c| c.rvcount()), None);
    }

    #[test]
    fn test_stack_size_limit() {
        let limits = ExecutionEngineLimits {
            max_stack_size: 2,
            ..ExecutionEngineLimits::default()
        };
        let mut engine = ExecutionEngine::with_limits(limits);
        engine.load_script(vec![0x51, 0x51, 0x51], -1).expect("load");
        assert_eq!(engine.execute(u64::MAX), VMState::FAULT);
        assert_eq!(engine.current_context().expect("context").instruction_pointer(), 3);
    }

    #[test]
    fn test_consume_gas_from_host() {
        let mut engine = ExecutionEngine::new();
        engine.load_script(vec![0x68, 0x01, b'x'], -1).expect("load");
        engine.set_invoke_interop(|engine, _method| engine.consume_gas(50));
        assert_eq!(engine.execute(20), VMState::FAULT_BY_GAS);
    }
}
