//! Push operations for the Neo Virtual Machine.
//!
//! This module provides the push operation handlers for the Neo VM.

use crate::error::{VmError, VmResult};
use crate::execution_context::ExecutionContext;
    use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the push operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::PUSH0, push_0);

    for byte in u8::from(OpCode::PUSHBYTES1)..=u8::from(OpCode::PUSHBYTES75) {
        if let Some(opcode) = OpCode::from_byte(byte) {
            jump_table.register(opcode, push_bytes);
        }
    }

    jump_table.register(OpCode::PUSHDATA1, push_data1);
    jump_table.register(OpCode::PUSHDATA2, push_data2);
    jump_table.register(OpCode::PUSHDATA4, push_data4);
    jump_table.register(OpCode::PUSHM1, push_m1);

    for byte in u8::from(OpCode::PUSH1)..=u8::from(OpCode::PUSH16) {
        if let Some(opcode) = OpCode::from_byte(byte) {
            jump_table.register(opcode, push_small_int);
        }
    }
}

/// Implements the PUSH0 operation.
fn push_0(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    context.push(StackItem::from_bytes(Vec::new()));
    Ok(())
}

/// Implements PUSHBYTES1 through PUSHBYTES75: the opcode byte is the length.
fn push_bytes(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let length = usize::from(u8::from(instruction.opcode()));
    let context = context_mut(engine)?;
    let data = context.read_bytes(length)?.to_vec();
    context.push(StackItem::from_bytes(data));
    Ok(())
}

/// Implements the PUSHDATA1 operation.
fn push_data1(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let max = engine.limits().max_item_size;
    let context = context_mut(engine)?;
    let length = usize::from(context.read_u8()?);
    push_prefixed(context, length, max)
}

/// Implements the PUSHDATA2 operation.
fn push_data2(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let max = engine.limits().max_item_size;
    let context = context_mut(engine)?;
    let length = usize::from(context.read_u16()?);
    push_prefixed(context, length, max)
}

/// Implements the PUSHDATA4 operation.
fn push_data4(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let max = engine.limits().max_item_size;
    let context = context_mut(engine)?;
    let length = context.read_u32()? as usize;
    push_prefixed(context, length, max)
}

fn push_prefixed(context: &mut ExecutionContext, length: usize, max: usize) -> VmResult<()> {
    if length > max {
        return Err(VmError::item_too_large(length, max));
    }
    let data = context.read_bytes(length)?.to_vec();
    context.push(StackItem::from_bytes(data));
    Ok(())
}

/// Implements the PUSHM1 operation.
fn push_m1(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    context.push(StackItem::from_int(-1));
    Ok(())
}

/// Implements PUSH1 through PUSH16.
fn push_small_int(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let value = i32::from(u8::from(instruction.opcode()) - u8::from(OpCode::PUSH1)) + 1;
    let context = context_mut(engine)?;
    context.push(StackItem::from_int(value));
    Ok(())
}
