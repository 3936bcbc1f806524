#![warn(unused_extern_crates)]

//! # soft-webauthn
//!
//! A software WebAuthn authenticator backend. It answers
//! `navigator.credentials.create()` and `navigator.credentials.get()` style
//! requests with packed self-attested ES256 credentials, the way a hardware
//! security key would, without any hardware.
//!
//! ## Architecture
//!
//! - **Authenticator**: the `create`/`get` flows, with timeout and cancellation
//! - **KeyStore**: injected key storage collaborator ([`MemoryKeyStore`] in process)
//! - **OptionsNormalizer**: injected source of the trusted RP ID, origin and challenge
//! - **soft-webauthn-core**: byte-exact CBOR, COSE and authenticatorData encoding
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> soft_webauthn::Result<()> {
//! use std::sync::Arc;
//! use soft_webauthn::{
//!     Authenticator, MemoryKeyStore, PublicKeyCredentialRequestOptions, TrustedOrigin,
//! };
//!
//! let authenticator = Authenticator::new(
//!     Arc::new(MemoryKeyStore::new()),
//!     Arc::new(TrustedOrigin::new("https://example.com")),
//! );
//!
//! let options = PublicKeyCredentialRequestOptions::new(b"challenge".to_vec());
//! let assertion = authenticator.get(&options, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
pub mod config;
pub mod error;
pub mod options;
pub mod store;

// Re-export main types at root level for convenience
pub use authenticator::Authenticator;
pub use config::{AuthenticatorConfig, AuthenticatorConfigBuilder};
pub use error::{Error, Result, ValidationError};
pub use options::{
    AuthenticatorAttachment, AuthenticatorSelectionCriteria, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialRequestOptions, ResidentKeyRequirement, UserVerificationRequirement,
};
pub use store::{
    KeyStore, MemoryKeyStore, NormalizedOptions, OptionsNormalizer, ResolvedKey, TrustedOrigin,
};

pub use soft_webauthn_core::{AbortReason, AbortSignal, PublicKeyCredential};
