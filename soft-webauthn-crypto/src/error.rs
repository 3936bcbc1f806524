//! Key material and signature errors

use thiserror::Error;

/// Failures while importing keys or checking ES256 signatures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Bytes or coordinates are not a point on P-256
    #[error("Public key is not a valid P-256 point")]
    InvalidPublicKey,

    /// Scalar is zero or not below the curve order
    #[error("Private key is not a valid P-256 scalar")]
    InvalidPrivateKey,

    /// Malformed DER, or the signature does not verify
    #[error("ES256 signature rejected")]
    InvalidSignature,

    #[error("Expected {expected} key bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// A JWK member is missing or does not describe a P-256 key
    #[error("JWK member `{member}` is missing or unsupported")]
    InvalidJwk { member: &'static str },
}

pub type Result<T> = core::result::Result<T, CryptoError>;
