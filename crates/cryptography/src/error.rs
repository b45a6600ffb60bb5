//! Error types for the cryptography crate.

use thiserror::Error;

/// Errors raised while decoding keys or signatures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The public key bytes are not a valid secp256r1 point.
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    /// The signature bytes are malformed.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// Result alias for cryptographic operations.
pub type Result<T> = std::result::Result<T, Error>;
