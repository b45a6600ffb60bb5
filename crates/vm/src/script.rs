//! Script module for the Neo Virtual Machine.
//!
//! A [`Script`] is an immutable bytecode buffer. Contexts share it through an
//! `Arc`, and its Hash160 is computed on first use and then memoized.

use neo_legacy_crypto::Crypto;
use once_cell::sync::OnceCell;
use std::fmt;

/// Size of a script hash.
pub const SCRIPT_HASH_SIZE: usize = 20;

/// Immutable VM bytecode.
pub struct Script {
    bytes: Box<[u8]>,
    hash: OnceCell<[u8; SCRIPT_HASH_SIZE]>,
}

impl Script {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            hash: OnceCell::new(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte at `position`, or `None` past the end.
    pub fn get(&self, position: usize) -> Option<u8> {
        self.bytes.get(position).copied()
    }

    /// Hash160 of the bytecode, memoized after the first call.
    pub fn hash(&self, crypto: &dyn Crypto) -> [u8; SCRIPT_HASH_SIZE] {
        *self.hash.get_or_init(|| crypto.hash160(&self.bytes))
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("len", &self.bytes.len())
            .field("hash", &self.hash.get().map(hex::encode))
            .finish()
    }
}
