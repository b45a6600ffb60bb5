//! Stack operations for the Neo Virtual Machine.
//!
//! This module provides the stack manipulation handlers for the Neo VM.
//! Indexed variants pop their index from the evaluation stack first.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, non_negative, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the stack operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::DUPFROMALTSTACK, dup_from_alt_stack);
    jump_table.register(OpCode::TOALTSTACK, to_alt_stack);
    jump_table.register(OpCode::FROMALTSTACK, from_alt_stack);
    jump_table.register(OpCode::XDROP, xdrop);
    jump_table.register(OpCode::XSWAP, xswap);
    jump_table.register(OpCode::XTUCK, xtuck);
    jump_table.register(OpCode::DEPTH, depth);
    jump_table.register(OpCode::DROP, drop);
    jump_table.register(OpCode::DUP, dup);
    jump_table.register(OpCode::NIP, nip);
    jump_table.register(OpCode::OVER, over);
    jump_table.register(OpCode::PICK, pick);
    jump_table.register(OpCode::ROLL, roll);
    jump_table.register(OpCode::ROT, rot);
    jump_table.register(OpCode::SWAP, swap);
    jump_table.register(OpCode::TUCK, tuck);
}

/// Implements the DUPFROMALTSTACK operation.
fn dup_from_alt_stack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.alt_stack().peek(0)?.clone();
    context.push(item);
    Ok(())
}

/// Implements the TOALTSTACK operation.
fn to_alt_stack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.pop()?;
    context.alt_stack_mut().push(item);
    Ok(())
}

/// Implements the FROMALTSTACK operation.
fn from_alt_stack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.alt_stack_mut().pop()?;
    context.push(item);
    Ok(())
}

/// Implements the XDROP operation.
fn xdrop(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let n = non_negative(context.pop()?.get_int32()?, "XDROP index")?;
    context.evaluation_stack_mut().remove(n)?;
    Ok(())
}

/// Implements the XSWAP operation.
fn xswap(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let n = non_negative(context.pop()?.get_int32()?, "XSWAP index")?;
    if n == 0 {
        return Ok(());
    }
    let stack = context.evaluation_stack_mut();
    let deep = stack.peek(n)?.clone();
    let top = stack.peek(0)?.clone();
    stack.set(n, top)?;
    stack.set(0, deep)?;
    Ok(())
}

/// Implements the XTUCK operation.
fn xtuck(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let n = context.pop()?.get_int32()?;
    if n <= 0 {
        return Err(VmError::invalid_parameter_msg(format!(
            "XTUCK index must be positive: {n}"
        )));
    }
    let top = context.peek(0)?.clone();
    context.evaluation_stack_mut().insert(n as usize, top)
}

/// Implements the DEPTH operation.
fn depth(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let depth = context.evaluation_stack().len();
    context.push(StackItem::from_int(depth));
    Ok(())
}

/// Implements the DROP operation.
fn drop(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    context.pop()?;
    Ok(())
}

/// Implements the DUP operation.
fn dup(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.peek(0)?.clone();
    context.push(item);
    Ok(())
}

/// Implements the NIP operation.
fn nip(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    context.evaluation_stack_mut().remove(1)?;
    Ok(())
}

/// Implements the OVER operation.
fn over(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.peek(1)?.clone();
    context.push(item);
    Ok(())
}

/// Implements the PICK operation.
fn pick(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let n = non_negative(context.pop()?.get_int32()?, "PICK index")?;
    let item = context.peek(n)?.clone();
    context.push(item);
    Ok(())
}

/// Implements the ROLL operation.
fn roll(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let n = non_negative(context.pop()?.get_int32()?, "ROLL index")?;
    if n == 0 {
        return Ok(());
    }
    let item = context.evaluation_stack_mut().remove(n)?;
    context.push(item);
    Ok(())
}

/// Implements the ROT operation.
fn rot(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.evaluation_stack_mut().remove(2)?;
    context.push(item);
    Ok(())
}

/// Implements the SWAP operation.
fn swap(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.evaluation_stack_mut().remove(1)?;
    context.push(item);
    Ok(())
}

/// Implements the TUCK operation.
fn tuck(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let top = context.peek(0)?.clone();
    context.evaluation_stack_mut().insert(2, top)
}

#[cfg(test)]
mod tests {
    use crate::execution_engine::ExecutionEngine;
    use crate::vm_state::VMState;

    /// Runs `script` and returns the result stack as integers, bottom first.
    fn run_ints(script: &[u8]) -> (VMState, Vec<i64>) {
        let mut engine = ExecutionEngine::new();
        engine.load_script(script.to_vec(), -1).expect("load");
        let state = engine.execute(u64::MAX);
        let values = engine
            .result_stack()
            .iter()
            .map(|item| {
                item.get_big_integer()
                    .expect("integer")
                    .to_i64()
                    .expect("fits i64")
            })
            .collect();
        (state, values)
    }

    #[test]
    fn test_rot_swap_over() {
        // PUSH1 PUSH2 PUSH3 ROT -> 2 3 1
        assert_eq!(run_ints(&[0x51, 0x52, 0x53, 0x7B]), (VMState::HALT, vec![2, 3, 1]));
        // PUSH1 PUSH2 SWAP -> 2 1
        assert_eq!(run_ints(&[0x51, 0x52, 0x7C]), (VMState::HALT, vec![2, 1]));
        // PUSH1 PUSH2 OVER -> 1 2 1
        assert_eq!(run_ints(&[0x51, 0x52, 0x78]), (VMState::HALT, vec![1, 2, 1]));
    }

    #[test]
    fn test_nip_tuck() {
        assert_eq!(run_ints(&[0x51, 0x52, 0x77]), (VMState::HALT, vec![2]));
        assert_eq!(run_ints(&[0x51, 0x52, 0x7D]), (VMState::HALT, vec![2, 1, 2]));
    }

    #[test]
    fn test_indexed_ops() {
        // PUSH1 PUSH2 PUSH3 PUSH2 PICK -> 1 2 3 1
        assert_eq!(
            run_ints(&[0x51, 0x52, 0x53, 0x52, 0x79]),
            (VMState::HALT, vec![1, 2, 3, 1])
        );
        // PUSH1 PUSH2 PUSH3 PUSH2 ROLL -> 2 3 1
        assert_eq!(
            run_ints(&[0x51, 0x52, 0x53, 0x52, 0x7A]),
            (VMState::HALT, vec![2, 3, 1])
        );
        // PUSH1 PUSH2 PUSH3 PUSH2 XSWAP -> 3 2 1
        assert_eq!(
            run_ints(&[0x51, 0x52, 0x53, 0x52, 0x72]),
            (VMState::HALT, vec![3, 2, 1])
        );
        // PUSH1 PUSH2 PUSH3 PUSH1 XDROP -> 1 3
        assert_eq!(
            run_ints(&[0x51, 0x52, 0x53, 0x51, 0x6D]),
            (VMState::HALT, vec![1, 3])
        );
        // PUSH1 PUSH2 PUSH2 XTUCK -> 2 1 2
        assert_eq!(
            run_ints(&[0x51, 0x52, 0x52, 0x73]),
            (VMState::HALT, vec![2, 1, 2])
        );
    }

    #[test]
    fn test_index_preconditions() {
        // PUSHM1 PICK
        assert_eq!(run_ints(&[0x51, 0x4F, 0x79]).0, VMState::FAULT);
        // PUSH1 PUSH5 ROLL: index beyond depth
        assert_eq!(run_ints(&[0x51, 0x55, 0x7A]).0, VMState::FAULT);
        // PUSH1 PUSH0 XTUCK: zero is rejected
        assert_eq!(run_ints(&[0x51, 0x00, 0x73]).0, VMState::FAULT);
        // DROP on empty stack
        assert_eq!(run_ints(&[0x75]).0, VMState::FAULT);
    }

    #[test]
    fn test_alt_stack_and_depth() {
        // PUSH4 TOALTSTACK DUPFROMALTSTACK FROMALTSTACK DEPTH -> 4 4 2
        assert_eq!(
            run_ints(&[0x54, 0x6B, 0x6A, 0x6C, 0x74]),
            (VMState::HALT, vec![4, 4, 2])
        );
    }
}
