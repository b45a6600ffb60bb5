//! # Neo Legacy Virtual Machine
//!
//! A deterministic stack-based bytecode interpreter for NEO 2 smart-contract
//! scripts. Given the same script, host callbacks and gas budget, every
//! instance reaches the same terminal state and consumes the same gas.
//!
//! ## Architecture
//!
//! - **BigInteger**: canonical arbitrary-precision integers
//! - **StackItem**: the seven runtime value kinds
//! - **Script / ExecutionContext**: shared bytecode and per-call frames
//! - **ExecutionEngine**: the interpreter loop, gas metering and host callbacks
//! - **JumpTable**: opcode dispatch
//! - **ScriptBuilder**: bytecode emission for hosts and tests
//!
//! ## Example
//!
//! ```rust
//! use neo_legacy_vm::{ExecutionEngine, OpCode, ScriptBuilder, VMState};
//!
//! let mut sb = ScriptBuilder::new();
//! sb.emit_push_int(2).emit_push_int(3).emit_opcode(OpCode::ADD);
//!
//! let mut engine = ExecutionEngine::new();
//! engine.load_script(sb.to_array(), -1).expect("script fits the call stack");
//!
//! assert_eq!(engine.execute(1_000), VMState::HALT);
//! let sum = engine.result_stack().peek(0).expect("one result");
//! assert_eq!(sum.get_int32().expect("integer"), 5);
//! ```
//!
//! ## Host callbacks
//!
//! ```rust
//! use neo_legacy_vm::{ExecutionEngine, ScriptBuilder, VMState};
//!
//! let mut sb = ScriptBuilder::new();
//! sb.emit_push_int(7);
//! sb.emit_syscall("Test.Drop").expect("valid name");
//!
//! let mut engine = ExecutionEngine::new();
//! engine.set_invoke_interop(|engine, method| {
//!     method == b"Test.Drop"
//!         && engine
//!             .current_context_mut()
//!             .map(|context| context.pop().is_ok())
//!             .unwrap_or(false)
//! });
//! engine.load_script(sb.to_array(), -1).expect("load");
//!
//! assert_eq!(engine.execute(1_000), VMState::HALT);
//! assert!(engine.result_stack().is_empty());
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

/// Arbitrary-precision integers
pub mod big_integer;
/// VM error types and result handling
pub mod error;
/// Evaluation stack implementation
pub mod evaluation_stack;
/// Call frames
pub mod execution_context;
/// The invocation stack
pub mod execution_context_stack;
/// The interpreter loop
pub mod execution_engine;
/// VM instruction representation
pub mod instruction;
/// OpCode implementation and instruction dispatch
pub mod jump_table;
/// VM opcode definitions and utilities
pub mod op_code;
/// Immutable bytecode with a memoized hash
pub mod script;
/// Utility for constructing VM bytecode
pub mod script_builder;
/// Polymorphic data types for VM values
pub mod stack_item;
/// Engine status codes
pub mod vm_state;

pub use big_integer::BigInteger;
pub use error::{VmError, VmResult};
pub use evaluation_stack::EvaluationStack;
pub use execution_context::{ExecutionContext, RVCOUNT_ALL};
pub use execution_context_stack::ExecutionContextStack;
pub use execution_engine::{
    ExecutionEngine, ExecutionEngineLimits, GetMessageCallback, InvokeInteropCallback,
    LoadScriptCallback,
};
pub use instruction::Instruction;
pub use jump_table::{InstructionHandler, JumpTable};
pub use op_code::OpCode;
pub use script::{Script, SCRIPT_HASH_SIZE};
pub use script_builder::ScriptBuilder;
pub use stack_item::{Array, InteropInterface, Map, StackItem, StackItemType, Struct};
pub use vm_state::VMState;

pub use neo_legacy_crypto::{Crypto, NeoCrypto};
