//! Splice operations for the Neo Virtual Machine.
//!
//! This module provides the byte-string handlers for the Neo VM.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, non_negative, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the splice operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::CAT, cat);
    jump_table.register(OpCode::SUBSTR, substr);
    jump_table.register(OpCode::LEFT, left);
    jump_table.register(OpCode::RIGHT, right);
    jump_table.register(OpCode::SIZE, size);
}

/// Implements the CAT operation.
fn cat(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let max = engine.limits().max_item_size;
    let context = context_mut(engine)?;

    let second = context.pop()?;
    let first = context.pop()?;

    let length = first.byte_array_size()? + second.byte_array_size()?;
    if length > max {
        return Err(VmError::item_too_large(length, max));
    }

    let mut result = first.get_byte_array()?;
    result.extend_from_slice(&second.get_byte_array()?);
    context.push(StackItem::from_bytes(result));
    Ok(())
}

/// Implements the SUBSTR operation.
fn substr(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let count = non_negative(context.pop()?.get_int32()?, "SUBSTR count")?;
    let index = non_negative(context.pop()?.get_int32()?, "SUBSTR index")?;
    let bytes = context.pop()?.get_byte_array()?;

    if index > bytes.len() {
        return Err(VmError::invalid_parameter_msg(format!(
            "SUBSTR index {index} beyond length {}",
            bytes.len()
        )));
    }
    let end = index + count.min(bytes.len() - index);
    context.push(StackItem::from_bytes(&bytes[index..end]));
    Ok(())
}

/// Implements the LEFT operation.
fn left(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let count = non_negative(context.pop()?.get_int32()?, "LEFT count")?;
    let mut bytes = context.pop()?.get_byte_array()?;
    bytes.truncate(count);
    context.push(StackItem::from_bytes(bytes));
    Ok(())
}

/// Implements the RIGHT operation.
fn right(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let count = non_negative(context.pop()?.get_int32()?, "RIGHT count")?;
    let bytes = context.pop()?.get_byte_array()?;
    if count > bytes.len() {
        return Err(VmError::invalid_parameter_msg(format!(
            "RIGHT count {count} beyond length {}",
            bytes.len()
        )));
    }
    context.push(StackItem::from_bytes(&bytes[bytes.len() - count..]));
    Ok(())
}

/// Implements the SIZE operation. Collections report their element count.
fn size(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let item = context.pop()?;
    let size = match &item {
        StackItem::Array(array) => array.len(),
        StackItem::Struct(item) => item.len(),
        StackItem::Map(map) => map.len(),
        other => other.byte_array_size()?,
    };
    context.push(StackItem::from_int(size));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::execution_engine::ExecutionEngine;
    use crate::vm_state::VMState;

    fn run_bytes(script: &[u8]) -> (VMState, Option<Vec<u8>>) {
        let mut engine = ExecutionEngine::new();
        engine.load_script(script.to_vec(), -1).expect("load");
        let state = engine.execute(u64::MAX);
        let top = engine
            .result_stack()
            .peek(0)
            .ok()
            .map(|item| item.get_byte_array().expect("bytes"));
        (state, top)
    }

    #[test]
    fn test_cat() {
        // PUSHBYTES2 "ab" PUSHBYTES1 "c" CAT
        let (state, top) = run_bytes(&[0x02, b'a', b'b', 0x01, b'c', 0x7E]);
        assert_eq!(state, VMState::HALT);
        assert_eq!(top, Some(b"abc".to_vec()));
    }

    #[test]
    fn test_substr_clamps_count() {
        // "hello" PUSH1 PUSH10 SUBSTR -> "ello"
        let (state, top) = run_bytes(&[0x05, b'h', b'e', b'l', b'l', b'o', 0x51, 0x5A, 0x7F]);
        assert_eq!(state, VMState::HALT);
        assert_eq!(top, Some(b"ello".to_vec()));

        // "hi" PUSH3 PUSH1 SUBSTR: index beyond length
        let (state, _) = run_bytes(&[0x02, b'h', b'i', 0x53, 0x51, 0x7F]);
        assert_eq!(state, VMState::FAULT);
    }

    #[test]
    fn test_left_right() {
        // "hello" PUSH2 LEFT -> "he"
        let (_, top) = run_bytes(&[0x05, b'h', b'e', b'l', b'l', b'o', 0x52, 0x80]);
        assert_eq!(top, Some(b"he".to_vec()));
        // "hello" PUSH10 LEFT -> "hello"
        let (_, top) = run_bytes(&[0x05, b'h', b'e', b'l', b'l', b'o', 0x5A, 0x80]);
        assert_eq!(top, Some(b"hello".to_vec()));
        // "hello" PUSH3 RIGHT -> "llo"
        let (_, top) = run_bytes(&[0x05, b'h', b'e', b'l', b'l', b'o', 0x53, 0x81]);
        assert_eq!(top, Some(b"llo".to_vec()));
        // "hello" PUSH6 RIGHT faults
        let (state, _) = run_bytes(&[0x05, b'h', b'e', b'l', b'l', b'o', 0x56, 0x81]);
        assert_eq!(state, VMState::FAULT);
        // PUSHM1 LEFT faults
        let (state, _) = run_bytes(&[0x51, 0x4F, 0x80]);
        assert_eq!(state, VMState::FAULT);
    }

    #[test]
    fn test_size() {
        let mut engine = ExecutionEngine::new();
        // "abc" SIZE
        engine.load_script(vec![0x03, b'a', b'b', b'c', 0x82], -1).expect("load");
        assert_eq!(engine.execute(u64::MAX), VMState::HALT);
        let size = engine.result_stack().peek(0).expect("top").get_int32().expect("int");
        assert_eq!(size, 3);
    }
}
