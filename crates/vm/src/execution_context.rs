//! Execution context module for the Neo Virtual Machine.
//!
//! This module provides the execution context implementation for the Neo VM.
//! A context is one activation record: a shared script, a cursor into it, the
//! declared return-value count, and private evaluation and alt stacks.

use crate::error::{VmError, VmResult};
use crate::evaluation_stack::EvaluationStack;
use crate::script::{Script, SCRIPT_HASH_SIZE};
use crate::stack_item::StackItem;
use neo_legacy_crypto::Crypto;
use std::sync::Arc;

/// Return-value count meaning "return every item left on the stack".
pub const RVCOUNT_ALL: i32 = -1;

/// Represents a frame in the VM execution stack.
#[derive(Debug)]
pub struct ExecutionContext {
    /// The script to run in this context.
    script: Arc<Script>,

    /// Offset of the next byte to read.
    instruction_pointer: usize,

    /// The number of values to return when the context is popped, or -1.
    rvcount: i32,

    /// The evaluation stack for this context.
    evaluation_stack: EvaluationStack,

    /// The alternative stack for this context.
    alt_stack: EvaluationStack,
}

impl ExecutionContext {
    /// Creates a new execution context positioned at the start of `script`.
    pub fn new(script: Arc<Script>, rvcount: i32) -> Self {
        Self {
            script,
            instruction_pointer: 0,
            rvcount,
            evaluation_stack: EvaluationStack::new(),
            alt_stack: EvaluationStack::new(),
        }
    }

    /// Returns the script for this context.
    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    /// Hash160 of the script.
    pub fn script_hash(&self, crypto: &dyn Crypto) -> [u8; SCRIPT_HASH_SIZE] {
        self.script.hash(crypto)
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    /// Moves the cursor. Any offset in `[0, script.len()]` is valid; the end
    /// of the script behaves as an implicit RET.
    pub fn set_instruction_pointer(&mut self, position: usize) -> VmResult<()> {
        if position > self.script.len() {
            return Err(VmError::InvalidJump(format!(
                "target {position} outside script of length {}",
                self.script.len()
            )));
        }
        self.instruction_pointer = position;
        Ok(())
    }

    pub fn rvcount(&self) -> i32 {
        self.rvcount
    }

    pub fn evaluation_stack(&self) -> &EvaluationStack {
        &self.evaluation_stack
    }

    pub fn evaluation_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.evaluation_stack
    }

    pub fn alt_stack(&self) -> &EvaluationStack {
        &self.alt_stack
    }

    pub fn alt_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.alt_stack
    }

    /// Consumes the context, yielding its evaluation and alt stacks.
    pub fn into_stacks(self) -> (EvaluationStack, EvaluationStack) {
        (self.evaluation_stack, self.alt_stack)
    }

    /// Opcode byte at the cursor, or `None` at the end of the script.
    pub fn current_byte(&self) -> Option<u8> {
        self.script.get(self.instruction_pointer)
    }

    /// Pushes an item onto the evaluation stack.
    pub fn push(&mut self, item: StackItem) {
        self.evaluation_stack.push(item);
    }

    /// Pops an item from the evaluation stack.
    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.evaluation_stack.pop()
    }

    /// Peeks at the evaluation stack, `n` positions below the top.
    pub fn peek(&self, n: usize) -> VmResult<&StackItem> {
        self.evaluation_stack.peek(n)
    }

    /// Reads `count` operand bytes and advances the cursor.
    pub fn read_bytes(&mut self, count: usize) -> VmResult<&[u8]> {
        let start = self.instruction_pointer;
        let end = start
            .checked_add(count)
            .filter(|end| *end <= self.script.len())
            .ok_or_else(|| {
                VmError::ScriptTruncated(format!("need {count} bytes at offset {start}"))
            })?;
        self.instruction_pointer = end;
        Ok(&self.script.as_bytes()[start..end])
    }

    pub fn read_u8(&mut self) -> VmResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> VmResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16(&mut self) -> VmResult<i16> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> VmResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a variable-length integer (0xFD/0xFE/0xFF prefixed) no greater than `max`.
    pub fn read_var_int(&mut self, max: u64) -> VmResult<u64> {
        let value = match self.read_u8()? {
            0xFD => u64::from(self.read_u16()?),
            0xFE => u64::from(self.read_u32()?),
            0xFF => {
                let bytes = self.read_bytes(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                u64::from_le_bytes(buf)
            }
            small => u64::from(small),
        };
        if value > max {
            return Err(VmError::item_too_large(value as usize, max as usize));
        }
        Ok(value)
    }

    /// Reads a var-int length prefix followed by that many bytes.
    pub fn read_var_bytes(&mut self, max: usize) -> VmResult<Vec<u8>> {
        let len = self.read_var_int(max as u64)? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(bytes: Vec<u8>) -> ExecutionContext {
        ExecutionContext::new(Arc::new(Script::new(bytes)), RVCOUNT_ALL)
    }

    #[test]
    fn test_operand_reads_advance_cursor() {
        let mut ctx = context(vec![0x07, 0xFE, 0xFF, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(ctx.read_u8().expect("u8"), 7);
        assert_eq!(ctx.read_i16().expect("i16"), -2);
        assert_eq!(ctx.instruction_pointer(), 3);
        assert_eq!(ctx.read_bytes(3).expect("bytes"), &[0x01, 0x02, 0x03]);
        assert!(ctx.read_u16().is_err());
        assert_eq!(ctx.instruction_pointer(), 6);
    }

    #[test]
    fn test_var_bytes() {
        let mut ctx = context(vec![0x03, b'a', b'b', b'c', 0xFD, 0x00, 0x01]);
        assert_eq!(ctx.read_var_bytes(252).expect("var bytes"), b"abc".to_vec());
        // 0xFD prefix announcing 256 bytes exceeds the cap.
        assert!(ctx.read_var_bytes(252).is_err());
    }

    #[test]
    fn test_instruction_pointer_bounds() {
        let mut ctx = context(vec![0x61, 0x61]);
        ctx.set_instruction_pointer(2).expect("end of script is valid");
        assert_eq!(ctx.current_byte(), None);
        assert!(ctx.set_instruction_pointer(3).is_err());
    }

    #[test]
    fn test_stacks_are_private() {
        let mut ctx = context(vec![]);
        ctx.push(StackItem::from_int(1));
        ctx.alt_stack_mut().push(StackItem::from_int(2));
        let (eval, alt) = ctx.into_stacks();
        assert_eq!(eval.len(), 1);
        assert_eq!(alt.len(), 1);
    }
}
