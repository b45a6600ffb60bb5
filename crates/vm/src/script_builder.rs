//! Script builder module for the Neo Virtual Machine.
//!
//! This module provides a way to programmatically construct scripts for the Neo VM.

use crate::big_integer::BigInteger;
use crate::error::{VmError, VmResult};
use crate::op_code::OpCode;
use crate::script::{Script, SCRIPT_HASH_SIZE};
use crate::stack_item::StackItem;

/// Helps construct VM scripts programmatically.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    /// The script being built
    script: Vec<u8>,
}

impl ScriptBuilder {
    /// Creates a new script builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset at which the next instruction will be emitted.
    pub fn offset(&self) -> usize {
        self.script.len()
    }

    /// Emits a single byte to the script.
    pub fn emit(&mut self, byte: u8) -> &mut Self {
        self.script.push(byte);
        self
    }

    /// Emits an opcode to the script.
    pub fn emit_opcode(&mut self, opcode: OpCode) -> &mut Self {
        self.emit(opcode.into())
    }

    /// Emits raw bytes to the script.
    pub fn emit_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.script.extend_from_slice(bytes);
        self
    }

    /// Emits the shortest push for `data`.
    pub fn emit_push(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();

        if len == 0 {
            return self.emit_opcode(OpCode::PUSH0);
        }

        if len <= usize::from(u8::from(OpCode::PUSHBYTES75)) {
            self.emit(len as u8);
        } else if len <= 0xFF {
            self.emit_opcode(OpCode::PUSHDATA1);
            self.emit(len as u8);
        } else if len <= 0xFFFF {
            self.emit_opcode(OpCode::PUSHDATA2);
            self.emit_bytes(&(len as u16).to_le_bytes());
        } else {
            self.emit_opcode(OpCode::PUSHDATA4);
            self.emit_bytes(&(len as u32).to_le_bytes());
        }

        self.emit_bytes(data)
    }

    /// Emits a push for an integer, using PUSHM1 and PUSH0 through PUSH16 when possible.
    pub fn emit_push_int(&mut self, value: impl Into<BigInteger>) -> &mut Self {
        let value = value.into();
        match value.to_i32() {
            Some(-1) => self.emit_opcode(OpCode::PUSHM1),
            Some(0) => self.emit_opcode(OpCode::PUSH0),
            Some(small @ 1..=16) => self.emit(u8::from(OpCode::PUSH1) + (small as u8 - 1)),
            _ => self.emit_push(&value.to_byte_array()),
        }
    }

    /// Emits a push operation for a boolean.
    pub fn emit_push_bool(&mut self, value: bool) -> &mut Self {
        if value {
            self.emit_opcode(OpCode::PUSH1)
        } else {
            self.emit_opcode(OpCode::PUSH0)
        }
    }

    /// Emits a push operation for a string.
    pub fn emit_push_string(&mut self, value: &str) -> &mut Self {
        self.emit_push(value.as_bytes())
    }

    /// Emits code that rebuilds `item` on the stack.
    ///
    /// Interop handles have no script representation.
    pub fn emit_push_stack_item(&mut self, item: &StackItem) -> VmResult<&mut Self> {
        match item {
            StackItem::Boolean(value) => {
                self.emit_push_bool(*value);
            }
            StackItem::Integer(value) => {
                self.emit_push_int(value.clone());
            }
            StackItem::ByteArray(bytes) => {
                self.emit_push(bytes);
            }
            StackItem::Array(_) | StackItem::Struct(_) => {
                let items = item.as_list().unwrap_or_default();
                for element in items.iter().rev() {
                    self.emit_push_stack_item(element)?;
                }
                self.emit_push_int(items.len());
                self.emit_opcode(OpCode::PACK);
                if matches!(item, StackItem::Struct(_)) {
                    self.emit_opcode(OpCode::NEWSTRUCT);
                }
            }
            StackItem::Map(map) => {
                self.emit_opcode(OpCode::NEWMAP);
                for (key, value) in map.keys().iter().zip(map.values().iter()) {
                    self.emit_opcode(OpCode::DUP);
                    self.emit_push_stack_item(key)?;
                    self.emit_push_stack_item(value)?;
                    self.emit_opcode(OpCode::SETITEM);
                }
            }
            StackItem::Interop(_) => {
                return Err(VmError::invalid_type_msg(
                    "interop handles cannot be pushed from a script",
                ));
            }
        }
        Ok(self)
    }

    /// Emits JMP, JMPIF, JMPIFNOT or CALL with an offset relative to the opcode.
    pub fn emit_jump(&mut self, opcode: OpCode, offset: i16) -> VmResult<&mut Self> {
        if !matches!(
            opcode,
            OpCode::JMP | OpCode::JMPIF | OpCode::JMPIFNOT | OpCode::CALL
        ) {
            return Err(VmError::invalid_parameter_msg(format!(
                "{opcode:?} is not a jump"
            )));
        }
        self.emit_opcode(opcode);
        Ok(self.emit_bytes(&offset.to_le_bytes()))
    }

    /// Emits CALL_I. The offset is relative to the opcode position plus two,
    /// the byte after the return and parameter counts.
    pub fn emit_call_i(&mut self, rvcount: u8, pcount: u8, offset: i16) -> &mut Self {
        self.emit_opcode(OpCode::CALL_I)
            .emit(rvcount)
            .emit(pcount)
            .emit_bytes(&offset.to_le_bytes())
    }

    /// Emits APPCALL or TAILCALL. `None` emits the all-zero hash, which makes
    /// the engine pop the hash from the stack.
    pub fn emit_app_call(
        &mut self,
        hash: Option<&[u8; SCRIPT_HASH_SIZE]>,
        tail: bool,
    ) -> &mut Self {
        let opcode = if tail { OpCode::TAILCALL } else { OpCode::APPCALL };
        self.emit_opcode(opcode);
        self.emit_bytes(hash.unwrap_or(&[0u8; SCRIPT_HASH_SIZE]))
    }

    /// Emits one of the CALL_E family. `None` selects the dynamic variant.
    pub fn emit_call_e(
        &mut self,
        hash: Option<&[u8; SCRIPT_HASH_SIZE]>,
        rvcount: u8,
        pcount: u8,
        tail: bool,
    ) -> &mut Self {
        let opcode = match (hash.is_some(), tail) {
            (true, false) => OpCode::CALL_E,
            (false, false) => OpCode::CALL_ED,
            (true, true) => OpCode::CALL_ET,
            (false, true) => OpCode::CALL_EDT,
        };
        self.emit_opcode(opcode).emit(rvcount).emit(pcount);
        if let Some(hash) = hash {
            self.emit_bytes(hash);
        }
        self
    }

    /// Emits SYSCALL with a var-int length-prefixed method name.
    pub fn emit_syscall(&mut self, method: &str) -> VmResult<&mut Self> {
        let name = method.as_bytes();
        if name.is_empty() || name.len() > 252 {
            return Err(VmError::invalid_parameter_msg(format!(
                "syscall name length {} outside [1, 252]",
                name.len()
            )));
        }
        self.emit_opcode(OpCode::SYSCALL);
        self.emit(name.len() as u8);
        Ok(self.emit_bytes(name))
    }

    /// Returns a copy of the bytes emitted so far.
    pub fn to_array(&self) -> Vec<u8> {
        self.script.clone()
    }

    /// Consumes the builder into a script.
    pub fn into_script(self) -> Script {
        Script::new(self.script)
    }
}
