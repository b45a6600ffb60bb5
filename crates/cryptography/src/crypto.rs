//! Pluggable cryptography capability consumed by the virtual machine.

use crate::{ecdsa::ECDsa, hash};

/// Hash and signature primitives the VM delegates to.
///
/// Implementations must be deterministic: every consensus participant has to
/// produce the same digests and the same verification verdicts.
pub trait Crypto: Send + Sync {
    /// SHA-1 digest.
    fn sha1(&self, data: &[u8]) -> [u8; 20];

    /// SHA-256 digest.
    fn sha256(&self, data: &[u8]) -> [u8; 32];

    /// RIPEMD-160 over SHA-256.
    fn hash160(&self, data: &[u8]) -> [u8; 20];

    /// Double SHA-256.
    fn hash256(&self, data: &[u8]) -> [u8; 32];

    /// Verifies `signature` over `message` with `public_key`.
    /// Malformed keys or signatures verify as `false`.
    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Standard Neo primitives: SHA family, RIPEMD-160 and secp256r1 ECDSA.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeoCrypto;

impl Crypto for NeoCrypto {
    fn sha1(&self, data: &[u8]) -> [u8; 20] {
        hash::sha1(data)
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        hash::sha256(data)
    }

    fn hash160(&self, data: &[u8]) -> [u8; 20] {
        hash::hash160(data)
    }

    fn hash256(&self, data: &[u8]) -> [u8; 32] {
        hash::hash256(data)
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        match ECDsa::verify(message, signature, public_key) {
            Ok(valid) => valid,
            Err(err) => {
                log::debug!("signature rejected: {err}");
                false
            }
        }
    }
}
