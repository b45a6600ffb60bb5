//! Cryptographic operations for the Neo Virtual Machine.
//!
//! This module provides the hashing and signature handlers for the Neo VM.
//! The primitives come from the engine's [`Crypto`] capability; the signable
//! message for CHECKSIG and CHECKMULTISIG comes from the host.

use crate::error::{VmError, VmResult};
use crate::execution_context::ExecutionContext;
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;
use neo_legacy_crypto::Crypto;
use std::sync::Arc;

/// Registers the cryptographic operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::SHA1, sha1);
    jump_table.register(OpCode::SHA256, sha256);
    jump_table.register(OpCode::HASH160, hash160);
    jump_table.register(OpCode::HASH256, hash256);
    jump_table.register(OpCode::CHECKSIG, check_sig);
    jump_table.register(OpCode::VERIFY, verify);
    jump_table.register(OpCode::CHECKMULTISIG, check_multisig);
}

/// Pops the top item, hashes its byte view and pushes the digest.
fn hash_top(
    engine: &mut ExecutionEngine,
    digest: impl FnOnce(&dyn Crypto, &[u8]) -> Vec<u8>,
) -> VmResult<()> {
    let crypto = Arc::clone(engine.crypto());
    let context = context_mut(engine)?;
    let data = context.pop()?.get_byte_array()?;
    context.push(StackItem::from_bytes(digest(crypto.as_ref(), &data)));
    Ok(())
}

/// Implements the SHA1 operation.
fn sha1(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    hash_top(engine, |crypto, data| crypto.sha1(data).to_vec())
}

/// Implements the SHA256 operation.
fn sha256(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    hash_top(engine, |crypto, data| crypto.sha256(data).to_vec())
}

/// Implements the HASH160 operation.
fn hash160(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    hash_top(engine, |crypto, data| crypto.hash160(data).to_vec())
}

/// Implements the HASH256 operation.
fn hash256(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    hash_top(engine, |crypto, data| crypto.hash256(data).to_vec())
}

/// Implements the CHECKSIG operation.
///
/// Stack: `[signature, public_key] -> [result]`, verified against the host
/// message for the current iteration.
fn check_sig(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let public_key = context.pop()?.get_byte_array()?;
    let signature = context.pop()?.get_byte_array()?;

    let message = engine.get_message()?;
    let valid = engine
        .crypto()
        .verify_signature(&message, &signature, &public_key);

    context_mut(engine)?.push(StackItem::from_bool(valid));
    Ok(())
}

/// Implements the VERIFY operation.
///
/// Stack: `[message, signature, public_key] -> [result]`.
fn verify(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let crypto = Arc::clone(engine.crypto());
    let context = context_mut(engine)?;
    let public_key = context.pop()?.get_byte_array()?;
    let signature = context.pop()?.get_byte_array()?;
    let message = context.pop()?.get_byte_array()?;

    let valid = crypto.verify_signature(&message, &signature, &public_key);
    context.push(StackItem::from_bool(valid));
    Ok(())
}

/// Pops a list of byte strings given either as an array operand or as a
/// count followed by that many items.
///
/// Returns the list and whether it came from an array.
fn pop_byte_list(context: &mut ExecutionContext) -> VmResult<(Vec<Vec<u8>>, Option<i64>)> {
    let item = context.pop()?;
    if let Some(items) = item.as_list() {
        let list = items
            .iter()
            .map(StackItem::get_byte_array)
            .collect::<VmResult<Vec<_>>>()?;
        return Ok((list, None));
    }
    let count = item
        .get_big_integer()?
        .to_i64()
        .ok_or_else(|| VmError::invalid_parameter_msg("count does not fit in 64 bits"))?;
    Ok((Vec::new(), Some(count)))
}

/// Pops `count` byte strings after validating `count` against the stack depth.
fn pop_counted(context: &mut ExecutionContext, count: usize) -> VmResult<Vec<Vec<u8>>> {
    let depth = context.evaluation_stack().len();
    if count > depth {
        return Err(VmError::stack_underflow(count, depth));
    }
    (0..count)
        .map(|_| context.pop()?.get_byte_array())
        .collect()
}

/// Implements the CHECKMULTISIG operation.
///
/// Keys and signatures are each given either as an array or as a count
/// followed by the items. Signatures must match keys in order; the scan stops
/// as soon as the unmatched signatures outnumber the remaining keys.
fn check_multisig(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let public_keys = match pop_byte_list(context)? {
        (keys, None) if keys.is_empty() => {
            return Err(VmError::invalid_parameter_msg("no public keys"));
        }
        (keys, None) => keys,
        (_, Some(n)) => {
            let depth = context.evaluation_stack().len() as i64;
            if n < 1 || n > depth {
                return Err(VmError::invalid_parameter_msg(format!(
                    "public key count {n} outside [1, {depth}]"
                )));
            }
            pop_counted(context, n as usize)?
        }
    };
    let n = public_keys.len();

    let signatures = match pop_byte_list(context)? {
        (signatures, None) => {
            if signatures.is_empty() || signatures.len() > n {
                return Err(VmError::invalid_parameter_msg(format!(
                    "signature count {} outside [1, {n}]",
                    signatures.len()
                )));
            }
            signatures
        }
        (_, Some(m)) => {
            let depth = context.evaluation_stack().len() as i64;
            if m < 1 || m > n as i64 || m > depth {
                return Err(VmError::invalid_parameter_msg(format!(
                    "signature count {m} outside [1, {n}]"
                )));
            }
            pop_counted(context, m as usize)?
        }
    };
    let m = signatures.len();

    let message = engine.get_message()?;
    let crypto = engine.crypto();

    let mut success = true;
    let (mut i, mut j) = (0usize, 0usize);
    while success && i < m && j < n {
        if crypto.verify_signature(&message, &signatures[i], &public_keys[j]) {
            i += 1;
        }
        j += 1;
        if m - i > n - j {
            success = false;
        }
    }

    context_mut(engine)?.push(StackItem::from_bool(success));
    Ok(())
}
