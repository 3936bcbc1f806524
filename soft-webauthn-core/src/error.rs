//! Error types for the WebAuthn building blocks

use crate::abort::AbortReason;

use soft_webauthn_crypto::CryptoError;
use thiserror::Error;

/// Errors raised while encoding, building or checking credential responses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A value the CBOR encoder cannot represent
    #[error("Unsupported CBOR type: {kind}")]
    UnsupportedType { kind: &'static str },

    /// A key field with no COSE label
    #[error("Unsupported key field `{0}`")]
    UnsupportedKeyField(String),

    /// A key field value with no COSE registry entry
    #[error("Unsupported value `{value}` for key field `{field}`")]
    UnsupportedKeyValue { field: &'static str, value: String },

    /// rpIdHash or clientDataHash of the wrong size
    #[error("Invalid hash length: expected 32, got {0}")]
    InvalidHashLength(usize),

    /// Credential ID longer than the 16-bit length prefix allows
    #[error("Credential ID too long: {0} bytes")]
    CredentialIdTooLong(usize),

    /// Hex or base64 text that does not decode
    #[error("Invalid encoding in {field}")]
    InvalidEncoding { field: &'static str },

    /// RP ID with no usable hostname
    #[error("Invalid RP ID `{0}`")]
    InvalidRpId(String),

    /// Authenticator data that is truncated or inconsistent with its flags
    #[error("Malformed authenticator data: {0}")]
    MalformedAuthenticatorData(&'static str),

    /// Attestation object or COSE key that cannot be decoded
    #[error("Malformed attestation object: {0}")]
    MalformedAttestation(&'static str),

    /// None of the requested algorithms is supported
    #[error("No supported algorithm among the requested parameters")]
    UnsupportedAlgorithm,

    /// The abort signal fired before the response was built
    #[error("Operation aborted: {0}")]
    Aborted(AbortReason),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result type alias for core operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
