//! Control flow operations for the Neo Virtual Machine.
//!
//! This module provides the handlers for jumps, calls, returns, system calls
//! and the exception opcodes. Jump offsets are signed 16-bit values relative
//! to the position of the opcode that carries them.

use crate::error::{VmError, VmResult};
use crate::execution_context::{ExecutionContext, RVCOUNT_ALL};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, JumpTable};
use crate::op_code::OpCode;
use crate::script::SCRIPT_HASH_SIZE;
use crate::vm_state::VMState;
use std::sync::Arc;

/// Registers the control flow handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::NOP, nop);
    jump_table.register(OpCode::JMP, jmp);
    jump_table.register(OpCode::JMPIF, jmp);
    jump_table.register(OpCode::JMPIFNOT, jmp);
    jump_table.register(OpCode::CALL, call);
    jump_table.register(OpCode::RET, ret);
    jump_table.register(OpCode::APPCALL, app_call);
    jump_table.register(OpCode::TAILCALL, app_call);
    jump_table.register(OpCode::SYSCALL, syscall);
    jump_table.register(OpCode::CALL_I, call_i);
    jump_table.register(OpCode::CALL_E, call_e);
    jump_table.register(OpCode::CALL_ED, call_e);
    jump_table.register(OpCode::CALL_ET, call_e);
    jump_table.register(OpCode::CALL_EDT, call_e);
    jump_table.register(OpCode::THROW, throw);
    jump_table.register(OpCode::THROWIFNOT, throw_if_not);
}

/// Implements the NOP operation.
fn nop(_engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    Ok(())
}

/// Implements JMP, JMPIF and JMPIFNOT.
///
/// The target is validated even when a conditional jump is not taken. CALL
/// reuses this handler on the freshly pushed context, where it jumps
/// unconditionally.
pub(crate) fn jmp(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let target = read_jump_target(context, instruction.position())?;

    let taken = match instruction.opcode() {
        OpCode::JMPIF => context.pop()?.get_boolean(),
        OpCode::JMPIFNOT => !context.pop()?.get_boolean(),
        _ => true,
    };

    if taken {
        context.set_instruction_pointer(target)?;
    }

    Ok(())
}

/// Implements the CALL operation.
///
/// The callee shares the caller's script, takes over the caller's whole
/// evaluation stack and returns everything it leaves behind.
fn call(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let position = instruction.position();
    let context = context_mut(engine)?;

    let script = Arc::clone(context.script());
    context.set_instruction_pointer(position + 3)?;
    let depth = context.evaluation_stack().len();
    let arguments = context.evaluation_stack_mut().take(depth)?;

    let mut callee = ExecutionContext::new(script, RVCOUNT_ALL);
    callee.set_instruction_pointer(position + 1)?;
    callee.evaluation_stack_mut().extend(arguments);
    engine.invocation_stack_mut().push(callee)?;

    jmp(engine, instruction)
}

/// Implements the RET operation.
fn ret(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = engine
        .invocation_stack_mut()
        .pop()
        .ok_or_else(|| VmError::invalid_operation_msg("No current context"))?;

    let rvcount = context.rvcount();
    let available = context.evaluation_stack().len();
    let count = if rvcount == RVCOUNT_ALL {
        available
    } else {
        let expected = usize::try_from(rvcount)
            .map_err(|_| VmError::invalid_operation_msg(format!("invalid rvcount {rvcount}")))?;
        if available != expected {
            return Err(VmError::invalid_operation_msg(format!(
                "expected {expected} return values, found {available}"
            )));
        }
        expected
    };

    let (mut evaluation_stack, mut alt_stack) = context.into_stacks();

    if engine.invocation_stack().is_empty() {
        evaluation_stack.move_to(engine.result_stack_mut(), count)?;
        engine.set_state(VMState::HALT);
        return Ok(());
    }

    let caller = context_mut(engine)?;
    evaluation_stack.move_to(caller.evaluation_stack_mut(), count)?;
    if rvcount == RVCOUNT_ALL {
        let remaining = alt_stack.len();
        alt_stack.move_to(caller.alt_stack_mut(), remaining)?;
    }

    Ok(())
}

/// Implements APPCALL and TAILCALL.
///
/// A hash of twenty zero bytes in the script means the hash is taken from the
/// evaluation stack instead.
fn app_call(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let mut hash = read_script_hash(context)?;
    let is_dynamic = hash.iter().all(|b| *b == 0);
    if is_dynamic {
        hash = pop_script_hash(context)?;
    }

    engine.load_script_by_hash(&hash, is_dynamic, RVCOUNT_ALL)?;
    transfer_arguments(engine, None)?;

    if instruction.opcode() == OpCode::TAILCALL {
        engine.invocation_stack_mut().remove(1);
    }

    Ok(())
}

/// Implements the SYSCALL operation.
fn syscall(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let max = engine.limits().max_syscall_name_size;
    let context = context_mut(engine)?;
    let method = context.read_var_bytes(max)?;
    engine.invoke_interop(&method)
}

/// Implements the CALL_I operation.
fn call_i(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let rvcount = i32::from(context.read_u8()?);
    let pcount = usize::from(context.read_u8()?);
    // The offset counts from the byte after the two count operands.
    let target = read_jump_target(context, instruction.position() + 2)?;

    let depth = context.evaluation_stack().len();
    if depth < pcount {
        return Err(VmError::stack_underflow(pcount, depth));
    }

    let script = Arc::clone(context.script());
    let arguments = context.evaluation_stack_mut().take(pcount)?;

    let mut callee = ExecutionContext::new(script, rvcount);
    callee.set_instruction_pointer(target)?;
    callee.evaluation_stack_mut().extend(arguments);
    engine.invocation_stack_mut().push(callee)
}

/// Implements CALL_E, CALL_ED, CALL_ET and CALL_EDT.
fn call_e(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let opcode = instruction.opcode();
    let is_dynamic = matches!(opcode, OpCode::CALL_ED | OpCode::CALL_EDT);
    let is_tail = matches!(opcode, OpCode::CALL_ET | OpCode::CALL_EDT);

    let context = context_mut(engine)?;
    let rvcount = i32::from(context.read_u8()?);
    let pcount = usize::from(context.read_u8()?);

    let needed = pcount + usize::from(is_dynamic);
    let depth = context.evaluation_stack().len();
    if depth < needed {
        return Err(VmError::stack_underflow(needed, depth));
    }

    if is_tail && context.rvcount() != rvcount {
        return Err(VmError::invalid_operation_msg(format!(
            "tail call changes return count from {} to {rvcount}",
            context.rvcount()
        )));
    }

    let hash = if is_dynamic {
        pop_script_hash(context)?
    } else {
        read_script_hash(context)?
    };

    engine.load_script_by_hash(&hash, is_dynamic, rvcount)?;
    transfer_arguments(engine, Some(pcount))?;

    if is_tail {
        engine.invocation_stack_mut().remove(1);
    }

    Ok(())
}

/// Implements the THROW operation.
fn throw(_engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    Err(VmError::Throw(format!("THROW at {}", instruction.position())))
}

/// Implements the THROWIFNOT operation.
fn throw_if_not(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    if !context.pop()?.get_boolean() {
        return Err(VmError::Throw(format!(
            "THROWIFNOT at {}",
            instruction.position()
        )));
    }
    Ok(())
}

/// Reads a 16-bit offset and resolves it against `position`.
fn read_jump_target(context: &mut ExecutionContext, position: usize) -> VmResult<usize> {
    let offset = context.read_i16()?;
    let target = position as i64 + i64::from(offset);
    if target < 0 || target > context.script().len() as i64 {
        return Err(VmError::InvalidJump(format!(
            "offset {offset} from {position} leaves the script"
        )));
    }
    Ok(target as usize)
}

fn read_script_hash(context: &mut ExecutionContext) -> VmResult<[u8; SCRIPT_HASH_SIZE]> {
    let mut hash = [0u8; SCRIPT_HASH_SIZE];
    hash.copy_from_slice(context.read_bytes(SCRIPT_HASH_SIZE)?);
    Ok(hash)
}

fn pop_script_hash(context: &mut ExecutionContext) -> VmResult<[u8; SCRIPT_HASH_SIZE]> {
    let bytes = context.pop()?.get_byte_array()?;
    <[u8; SCRIPT_HASH_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
        VmError::invalid_parameter_msg(format!("script hash must be 20 bytes, got {}", bytes.len()))
    })
}

/// Moves `count` items (all when `None`) from the caller to the callee that
/// was just pushed on top of it.
fn transfer_arguments(engine: &mut ExecutionEngine, count: Option<usize>) -> VmResult<()> {
    let stack = engine.invocation_stack_mut();

    let caller = stack
        .peek_mut(1)
        .ok_or_else(|| VmError::invalid_operation_msg("No calling context"))?;
    let count = count.unwrap_or_else(|| caller.evaluation_stack().len());
    let arguments = caller.evaluation_stack_mut().take(count)?;

    let callee = stack
        .peek_mut(0)
        .ok_or_else(|| VmError::invalid_operation_msg("No current context"))?;
    callee.evaluation_stack_mut().extend(arguments);

    Ok(())
}
