//! Pure Rust cryptographic primitives for a software WebAuthn authenticator
//!
//! This crate provides the key material operations the credential flows need:
//!
//! - **ECDSA**: ES256 signatures for attestation statements and assertions
//! - **Key pairs**: P-256 credential keys with JSON Web Key import and export
//!
//! COSE algorithm registry: <https://www.iana.org/assignments/cose/cose.xhtml>

pub mod ecdsa;
pub mod error;
pub mod key_pair;

// Re-export commonly used types
pub use error::{CryptoError, Result};
pub use key_pair::{JsonWebKey, KeyPair, PublicKey};
