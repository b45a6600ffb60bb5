//! ECDSA (Elliptic Curve Digital Signature Algorithm) implementation for Neo.
//!
//! Signatures are the 64-byte `r || s` form used by NEO 2 witnesses and the
//! curve is secp256r1. Messages are hashed with SHA-256 before signing.

use crate::{Error, Result};
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};

/// Length of a raw `r || s` signature.
pub const SIGNATURE_SIZE: usize = 64;

/// ECDSA over secp256r1.
pub struct ECDsa;

impl ECDsa {
    /// Verifies a signature against data and public key.
    ///
    /// Accepts compressed (33 bytes), uncompressed (65 bytes) and bare
    /// `x || y` (64 bytes) public keys. A well-formed signature that does not
    /// match yields `Ok(false)`.
    pub fn verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
        if signature.len() != SIGNATURE_SIZE {
            return Err(Error::InvalidSignature(format!(
                "expected {SIGNATURE_SIZE} bytes, got {}",
                signature.len()
            )));
        }
        let sig = Signature::from_slice(signature)
            .map_err(|e| Error::InvalidSignature(format!("{e}")))?;
        let verifying_key = Self::decode_public_key(public_key)?;

        Ok(verifying_key.verify(data, &sig).is_ok())
    }

    /// Signs data with a 32-byte private key, returning `r || s`.
    pub fn sign(data: &[u8], private_key: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
        let signing_key = SigningKey::from_slice(private_key)
            .map_err(|e| Error::InvalidKey(format!("Invalid private key: {e}")))?;
        let signature: Signature = signing_key.sign(data);

        let mut out = [0u8; SIGNATURE_SIZE];
        out.copy_from_slice(&signature.to_bytes());
        Ok(out)
    }

    /// Derives the SEC1-encoded public key for a private key.
    pub fn derive_public_key(private_key: &[u8], compressed: bool) -> Result<Vec<u8>> {
        let signing_key = SigningKey::from_slice(private_key)
            .map_err(|e| Error::InvalidKey(format!("Invalid private key: {e}")))?;
        Ok(signing_key
            .verifying_key()
            .to_encoded_point(compressed)
            .as_bytes()
            .to_vec())
    }

    fn decode_public_key(public_key: &[u8]) -> Result<VerifyingKey> {
        let parsed = if public_key.len() == 64 {
            let mut sec1 = Vec::with_capacity(65);
            sec1.push(0x04);
            sec1.extend_from_slice(public_key);
            VerifyingKey::from_sec1_bytes(&sec1)
        } else {
            VerifyingKey::from_sec1_bytes(public_key)
        };
        parsed.map_err(|e| Error::InvalidKey(format!("{e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: [u8; 32] = [0x11; 32];

    #[test]
    fn test_sign_and_verify_compressed() {
        let public_key = ECDsa::derive_public_key(&PRIVATE_KEY, true).expect("derive");
        assert_eq!(public_key.len(), 33);

        let signature = ECDsa::sign(b"hello neo", &PRIVATE_KEY).expect("sign");
        assert!(ECDsa::verify(b"hello neo", &signature, &public_key).expect("verify"));
        assert!(!ECDsa::verify(b"hello neo!", &signature, &public_key).expect("verify"));
    }

    #[test]
    fn test_verify_accepts_bare_xy_key() {
        let uncompressed = ECDsa::derive_public_key(&PRIVATE_KEY, false).expect("derive");
        assert_eq!(uncompressed.len(), 65);

        let signature = ECDsa::sign(b"payload", &PRIVATE_KEY).expect("sign");
        assert!(ECDsa::verify(b"payload", &signature, &uncompressed).expect("verify"));
        assert!(ECDsa::verify(b"payload", &signature, &uncompressed[1..]).expect("verify"));
    }

    #[test]
    fn test_malformed_inputs_are_errors() {
        let public_key = ECDsa::derive_public_key(&PRIVATE_KEY, true).expect("derive");
        assert!(matches!(
            ECDsa::verify(b"x", &[0u8; 10], &public_key),
            Err(Error::InvalidSignature(_))
        ));

        let signature = ECDsa::sign(b"x", &PRIVATE_KEY).expect("sign");
        assert!(matches!(
            ECDsa::verify(b"x", &signature, &[0x02; 12]),
            Err(Error::InvalidKey(_))
        ));
    }
}
