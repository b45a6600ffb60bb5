//! Bitwise operations for the Neo Virtual Machine.
//!
//! This module provides the bitwise operation handlers for the Neo VM.

use crate::error::VmResult;
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, pop_integer, push_integer, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the bitwise operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::INVERT, invert);
    jump_table.register(OpCode::AND, and);
    jump_table.register(OpCode::OR, or);
    jump_table.register(OpCode::XOR, xor);
    jump_table.register(OpCode::EQUAL, equal);
}

/// Implements the INVERT operation.
fn invert(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let value = pop_integer(context, &limits)?;
    push_integer(context, !value, &limits)
}

/// Implements the AND operation.
fn and(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let b = pop_integer(context, &limits)?;
    let a = pop_integer(context, &limits)?;
    push_integer(context, a & b, &limits)
}

/// Implements the OR operation.
fn or(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let b = pop_integer(context, &limits)?;
    let a = pop_integer(context, &limits)?;
    push_integer(context, a | b, &limits)
}

/// Implements the XOR operation.
fn xor(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let b = pop_integer(context, &limits)?;
    let a = pop_integer(context, &limits)?;
    push_integer(context, a ^ b, &limits)
}

/// Implements the EQUAL operation.
fn equal(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limit = engine.limits().traversal_limit();
    let context = context_mut(engine)?;
    let b = context.pop()?;
    let a = context.pop()?;
    let equal = a.equals_within(&b, limit)?;
    context.push(StackItem::from_bool(equal));
    Ok(())
}
