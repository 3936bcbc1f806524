//! Error types for credential creation and assertion

use soft_webauthn_core::AbortReason;
use soft_webauthn_crypto::CryptoError;
use thiserror::Error;

/// Why request options were rejected before any key material was touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request asks for something this authenticator never provides
    #[error("NotSupported: {0}")]
    NotSupported(&'static str),

    /// The request forbids something this authenticator always does
    #[error("ConstraintError: {0}")]
    Constraint(&'static str),

    /// The calling origin may not act for the relying party
    #[error("SecurityError: origin `{origin}` is not within RP ID `{rp_id}`")]
    Security { origin: String, rp_id: String },

    /// The normalization collaborator rejected the options
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Credential flow errors
///
/// Each variant is one distinguishable failure kind. Nothing is retried and
/// no partial response accompanies an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// None of the requested algorithms can be produced
    #[error("No supported algorithm among the requested parameters")]
    UnsupportedAlgorithm,

    /// The caller's signal or the timeout fired
    #[error("Operation aborted: {0}")]
    Aborted(AbortReason),

    /// The key-storage collaborator did not produce a usable key
    #[error("Key resolution failed: {0}")]
    KeyResolution(String),

    /// Building the binary response failed
    #[error("Encoding failed: {0}")]
    Encoding(soft_webauthn_core::Error),

    #[error("Crypto operation failed: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<soft_webauthn_core::Error> for Error {
    fn from(err: soft_webauthn_core::Error) -> Self {
        use soft_webauthn_core::Error as CoreError;

        match err {
            CoreError::UnsupportedAlgorithm => Error::UnsupportedAlgorithm,
            CoreError::Aborted(reason) => Error::Aborted(reason),
            CoreError::Crypto(err) => Error::Crypto(err),
            other => Error::Encoding(other),
        }
    }
}

impl From<AbortReason> for Error {
    fn from(reason: AbortReason) -> Self {
        Error::Aborted(reason)
    }
}

/// Result type alias for credential flows
pub type Result<T> = core::result::Result<T, Error>;
