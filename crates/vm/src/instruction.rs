//! Decoded instruction handed to opcode handlers.

use crate::op_code::OpCode;

/// An opcode together with the script offset it was fetched from.
///
/// Operands are read by the handler from the current context's cursor, which
/// already points one byte past `position` when the handler runs. Relative
/// jump offsets are measured from `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    opcode: OpCode,
    position: usize,
}

impl Instruction {
    pub fn new(opcode: OpCode, position: usize) -> Self {
        Self { opcode, position }
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    pub fn position(&self) -> usize {
        self.position
    }
}
