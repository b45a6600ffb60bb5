//! Jump table module for the Neo Virtual Machine.
//!
//! This module provides the jump table implementation used in the Neo VM.
//! Every opcode byte maps to at most one handler; bytes without a handler
//! fault when executed.

pub mod bitwise;
pub mod compound;
pub mod control;
pub mod crypto;
pub mod numeric;
pub mod push;
pub mod splice;
pub mod stack;

use crate::big_integer::BigInteger;
use crate::error::{VmError, VmResult};
use crate::execution_context::ExecutionContext;
use crate::execution_engine::{ExecutionEngine, ExecutionEngineLimits};
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use crate::stack_item::StackItem;
use std::fmt;

/// A handler for a VM instruction.
pub type InstructionHandler = fn(&mut ExecutionEngine, &Instruction) -> VmResult<()>;

/// Represents a jump table for the VM.
#[derive(Clone)]
pub struct JumpTable {
    /// The handlers for each opcode, indexed by opcode byte.
    handlers: [Option<InstructionHandler>; 256],
}

impl Default for JumpTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JumpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = self.handlers.iter().filter(|h| h.is_some()).count();
        f.debug_struct("JumpTable")
            .field("registered", &registered)
            .finish()
    }
}

impl JumpTable {
    /// Creates a jump table with every instruction of the set registered.
    pub fn new() -> Self {
        let mut jump_table = Self {
            handlers: [None; 256],
        };

        jump_table.register_default_handlers();

        jump_table
    }

    /// Registers a handler for an opcode, replacing any existing one.
    pub fn register(&mut self, opcode: OpCode, handler: InstructionHandler) {
        self.handlers[opcode as usize] = Some(handler);
    }

    /// Gets the handler for an opcode.
    pub fn get(&self, opcode: OpCode) -> Option<InstructionHandler> {
        self.handlers[opcode as usize]
    }

    /// Resolves the handler for an opcode, falling back to the invalid-opcode handler.
    pub fn handler(&self, opcode: OpCode) -> InstructionHandler {
        self.get(opcode).unwrap_or(invalid_opcode)
    }

    /// Executes an instruction.
    pub fn execute(&self, engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
        (self.handler(instruction.opcode()))(engine, instruction)
    }

    fn register_default_handlers(&mut self) {
        push::register_handlers(self);
        control::register_handlers(self);
        stack::register_handlers(self);
        splice::register_handlers(self);
        bitwise::register_handlers(self);
        numeric::register_handlers(self);
        crypto::register_handlers(self);
        compound::register_handlers(self);
    }
}

/// Handles an opcode with no registered handler.
pub fn invalid_opcode(_engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    Err(VmError::InvalidOpcode(format!(
        "{:?} at {}",
        instruction.opcode(),
        instruction.position()
    )))
}

/// Current context of the engine, or an error when nothing is loaded.
pub(crate) fn context_mut(engine: &mut ExecutionEngine) -> VmResult<&mut ExecutionContext> {
    engine
        .current_context_mut()
        .ok_or_else(|| VmError::invalid_operation_msg("No current context"))
}

/// Pops a numeric operand whose encoding fits the big-integer bound.
pub(crate) fn pop_integer(
    context: &mut ExecutionContext,
    limits: &ExecutionEngineLimits,
) -> VmResult<BigInteger> {
    let item = context.pop()?;
    check_integer_item(&item, limits)?;
    item.get_big_integer()
}

/// Pushes a numeric result if its encoding fits the big-integer bound.
pub(crate) fn push_integer(
    context: &mut ExecutionContext,
    value: BigInteger,
    limits: &ExecutionEngineLimits,
) -> VmResult<()> {
    check_integer(&value, limits)?;
    context.push(StackItem::Integer(value));
    Ok(())
}

pub(crate) fn check_integer_item(item: &StackItem, limits: &ExecutionEngineLimits) -> VmResult<()> {
    let size = item.byte_array_size()?;
    if size > limits.max_big_integer_size {
        return Err(VmError::item_too_large(size, limits.max_big_integer_size));
    }
    Ok(())
}

pub(crate) fn check_integer(value: &BigInteger, limits: &ExecutionEngineLimits) -> VmResult<()> {
    let size = value.byte_len();
    if size > limits.max_big_integer_size {
        return Err(VmError::item_too_large(size, limits.max_big_integer_size));
    }
    Ok(())
}

/// Converts a popped count or index to `usize`, rejecting negatives.
pub(crate) fn non_negative(value: i32, what: &str) -> VmResult<usize> {
    usize::try_from(value).map_err(|_| {
        VmError::invalid_parameter_msg(format!("{what} must not be negative: {value}"))
    })
}
