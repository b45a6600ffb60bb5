//! Hash functions for Neo cryptography.
//!
//! This module provides the digests reachable from VM opcodes and the
//! script-hash derivation used by the engine's script cache.

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Computes SHA-1 hash of the input data.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-256 hash of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes RIPEMD-160 hash of the input data.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes Hash160 (RIPEMD-160 of SHA-256) of the input data.
/// Script hashes are derived this way.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Computes Hash256 (double SHA-256) of the input data.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}
