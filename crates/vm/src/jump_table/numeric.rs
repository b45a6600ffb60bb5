//! Numeric operations for the Neo Virtual Machine.
//!
//! This module provides the numeric operation handlers for the Neo VM.
//! Operands and results are bounded by the engine's big-integer size limit.

use crate::big_integer::BigInteger;
use crate::error::{VmError, VmResult};
use crate::execution_engine::{ExecutionEngine, ExecutionEngineLimits};
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, pop_integer, push_integer, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the numeric operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::INC, inc);
    jump_table.register(OpCode::DEC, dec);
    jump_table.register(OpCode::SIGN, sign);
    jump_table.register(OpCode::NEGATE, negate);
    jump_table.register(OpCode::ABS, abs);
    jump_table.register(OpCode::NOT, not);
    jump_table.register(OpCode::NZ, nz);
    jump_table.register(OpCode::ADD, add);
    jump_table.register(OpCode::SUB, sub);
    jump_table.register(OpCode::MUL, mul);
    jump_table.register(OpCode::DIV, div);
    jump_table.register(OpCode::MOD, modulo);
    jump_table.register(OpCode::SHL, shl);
    jump_table.register(OpCode::SHR, shr);

    // Logical operations
    jump_table.register(OpCode::BOOLAND, booland);
    jump_table.register(OpCode::BOOLOR, boolor);

    // Comparison operations
    jump_table.register(OpCode::NUMEQUAL, numequal);
    jump_table.register(OpCode::NUMNOTEQUAL, numnotequal);
    jump_table.register(OpCode::LT, lt);
    jump_table.register(OpCode::GT, gt);
    jump_table.register(OpCode::LTE, lte);
    jump_table.register(OpCode::GTE, gte);
    jump_table.register(OpCode::MIN, min);
    jump_table.register(OpCode::MAX, max);
    jump_table.register(OpCode::WITHIN, within);
}

/// Pops one operand, applies `op` and pushes the bounded result.
fn unary(
    engine: &mut ExecutionEngine,
    op: impl FnOnce(BigInteger) -> BigInteger,
) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let value = pop_integer(context, &limits)?;
    push_integer(context, op(value), &limits)
}

/// Pops `b` then `a`, applies `op(a, b)` and pushes the bounded result.
fn binary(
    engine: &mut ExecutionEngine,
    op: impl FnOnce(BigInteger, BigInteger) -> VmResult<BigInteger>,
) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let b = pop_integer(context, &limits)?;
    let a = pop_integer(context, &limits)?;
    push_integer(context, op(a, b)?, &limits)
}

/// Pops `b` then `a` and pushes the boolean `op(a, b)`.
fn compare(
    engine: &mut ExecutionEngine,
    op: impl FnOnce(&BigInteger, &BigInteger) -> bool,
) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let b = pop_integer(context, &limits)?;
    let a = pop_integer(context, &limits)?;
    context.push(StackItem::from_bool(op(&a, &b)));
    Ok(())
}

/// Implements the INC operation.
fn inc(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    unary(engine, |x| x + BigInteger::ONE)
}

/// Implements the DEC operation.
fn dec(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    unary(engine, |x| x - BigInteger::ONE)
}

/// Implements the SIGN operation.
fn sign(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    unary(engine, |x| BigInteger::from(x.signum()))
}

/// Implements the NEGATE operation.
fn negate(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    unary(engine, |x| -x)
}

/// Implements the ABS operation.
fn abs(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    unary(engine, |x| x.abs())
}

/// Implements the NOT operation.
fn not(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let value = context.pop()?.get_boolean();
    context.push(StackItem::from_bool(!value));
    Ok(())
}

/// Implements the NZ operation.
fn nz(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let value = pop_integer(context, &limits)?;
    context.push(StackItem::from_bool(!value.is_zero()));
    Ok(())
}

/// Implements the ADD operation.
fn add(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    binary(engine, |a, b| Ok(a + b))
}

/// Implements the SUB operation.
fn sub(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    binary(engine, |a, b| Ok(a - b))
}

/// Implements the MUL operation.
fn mul(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    binary(engine, |a, b| Ok(a * b))
}

/// Implements the DIV operation. Truncates toward zero.
fn div(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    binary(engine, |a, b| {
        a.checked_div(&b)
            .ok_or_else(|| VmError::DivisionByZero(format!("{a} / 0")))
    })
}

/// Implements the MOD operation. The remainder takes the dividend's sign.
fn modulo(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    binary(engine, |a, b| {
        a.checked_rem(&b)
            .ok_or_else(|| VmError::DivisionByZero(format!("{a} % 0")))
    })
}

/// Pops a shift amount and checks it against the configured range.
fn pop_shift(engine: &mut ExecutionEngine) -> VmResult<(i32, ExecutionEngineLimits)> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let shift = context.pop()?.get_int32()?;
    if shift < limits.min_shl_shr || shift > limits.max_shl_shr {
        return Err(VmError::invalid_parameter_msg(format!(
            "shift {shift} outside [{}, {}]",
            limits.min_shl_shr, limits.max_shl_shr
        )));
    }
    Ok((shift, limits))
}

/// Implements the SHL operation. A zero shift leaves the operand in place.
fn shl(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (shift, limits) = pop_shift(engine)?;
    if shift == 0 {
        return Ok(());
    }
    let context = context_mut(engine)?;
    let value = pop_integer(context, &limits)?;
    push_integer(context, &value << shift, &limits)
}

/// Implements the SHR operation. A zero shift leaves the operand in place.
fn shr(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (shift, limits) = pop_shift(engine)?;
    if shift == 0 {
        return Ok(());
    }
    let context = context_mut(engine)?;
    let value = pop_integer(context, &limits)?;
    push_integer(context, &value >> shift, &limits)
}

/// Implements the BOOLAND operation.
fn booland(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let b = context.pop()?.get_boolean();
    let a = context.pop()?.get_boolean();
    context.push(StackItem::from_bool(a && b));
    Ok(())
}

/// Implements the BOOLOR operation.
fn boolor(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let b = context.pop()?.get_boolean();
    let a = context.pop()?.get_boolean();
    context.push(StackItem::from_bool(a || b));
    Ok(())
}

/// Implements the NUMEQUAL operation.
fn numequal(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    compare(engine, |a, b| a == b)
}

/// Implements the NUMNOTEQUAL operation.
fn numnotequal(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    compare(engine, |a, b| a != b)
}

/// Implements the LT operation.
fn lt(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    compare(engine, |a, b| a < b)
}

/// Implements the GT operation.
fn gt(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    compare(engine, |a, b| a > b)
}

/// Implements the LTE operation.
fn lte(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    compare(engine, |a, b| a <= b)
}

/// Implements the GTE operation.
fn gte(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    compare(engine, |a, b| a >= b)
}

/// Implements the MIN operation.
fn min(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    binary(engine, |a, b| Ok(a.min(b)))
}

/// Implements the MAX operation.
fn max(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    binary(engine, |a, b| Ok(a.max(b)))
}

/// Implements the WITHIN operation: `a <= x < b`.
fn within(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;
    let b = pop_integer(context, &limits)?;
    let a = pop_integer(context, &limits)?;
    let x = pop_integer(context, &limits)?;
    context.push(StackItem::from_bool(a <= x && x < b));
    Ok(())
}
