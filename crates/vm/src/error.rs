//! VM error types and result handling.
//!
//! Every opcode handler reports failure through [`VmError`]. The engine never
//! lets an error escape a step: any `Err` becomes the terminal `FAULT` state.

use thiserror::Error;

/// Represents errors during VM execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Stack underflow: {0}")]
    StackUnderflow(String),

    #[error("Stack size limit exceeded: {0}")]
    StackOverflow(String),

    #[error("Invocation stack size limit exceeded: {0}")]
    InvocationStackOverflow(String),

    #[error("Item size exceeds limit: {0}")]
    ItemTooLarge(String),

    #[error("Encountered invalid opcode: {0}")]
    InvalidOpcode(String),

    #[error("Tried to divide by zero: {0}")]
    DivisionByZero(String),

    #[error("Invalid jump offset: {0}")]
    InvalidJump(String),

    #[error("Type mismatch for operation: {0}")]
    InvalidType(String),

    #[error("Invalid parameter for operation: {0}")]
    InvalidParameter(String),

    #[error("Unexpected end of script: {0}")]
    ScriptTruncated(String),

    #[error("Host callback failed: {0}")]
    HostCallback(String),

    #[error("Script raised a fault: {0}")]
    Throw(String),
}

impl VmError {
    pub fn invalid_operation_msg(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    pub fn stack_underflow(needed: usize, available: usize) -> Self {
        Self::StackUnderflow(format!("needed {needed} items, found {available}"))
    }

    pub fn invalid_type_msg(message: impl Into<String>) -> Self {
        Self::InvalidType(message.into())
    }

    pub fn invalid_parameter_msg(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn item_too_large(size: usize, limit: usize) -> Self {
        Self::ItemTooLarge(format!("{size} exceeds {limit}"))
    }
}

/// Result type for VM operations.
pub type VmResult<T> = std::result::Result<T, VmError>;
