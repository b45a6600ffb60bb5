//! # Neo Legacy Cryptography
//!
//! Hash and signature primitives used by the legacy Neo virtual machine.
//!
//! The VM never calls a concrete algorithm directly. It talks to the
//! [`Crypto`] capability so a host can substitute its own primitives; the
//! [`NeoCrypto`] implementation wires the trait to the standard Neo choices:
//!
//! - **SHA-1 / SHA-256**: plain digests
//! - **Hash160**: RIPEMD-160 over SHA-256, used for script hashes
//! - **Hash256**: double SHA-256
//! - **ECDSA**: secp256r1 signatures in 64-byte `r || s` form
//!
//! ## Example
//!
//! ```rust
//! use neo_legacy_crypto::{hash, Crypto, NeoCrypto};
//!
//! let digest = hash::sha256(b"abc");
//! assert_eq!(NeoCrypto.sha256(b"abc"), digest);
//! ```

pub mod crypto;
pub mod ecdsa;
pub mod error;
pub mod hash;

pub use crypto::{Crypto, NeoCrypto};
pub use ecdsa::ECDsa;
pub use error::{Error, Result};
