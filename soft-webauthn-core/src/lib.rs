//! WebAuthn authenticator building blocks
//!
//! This crate provides the byte-exact pieces of a software WebAuthn
//! authenticator, leaf to root:
//!
//! - [`cbor`]: deterministic CBOR encoder (RFC 8949)
//! - [`cose`]: JWK to COSE_Key conversion (RFC 8152)
//! - [`auth_data`]: authenticatorData layout
//! - [`client_data`]: CollectedClientData serialization
//! - [`attestation`]: packed self-attestation and assertion signing
//!
//! Implements the Web Authentication Level 3 data formats:
//! <https://www.w3.org/TR/webauthn-3/>

pub mod abort;
pub mod attestation;
pub mod auth_data;
pub mod cbor;
pub mod client_data;
pub mod cose;
pub mod error;
pub mod origin;
pub mod types;

// Re-export commonly used types
pub use abort::{AbortReason, AbortSignal};
pub use attestation::{
    AttestationObject, generate_assertion_response, generate_creation_response,
    verify_assertion, verify_attestation,
};
pub use auth_data::{AuthenticatorData, Flags};
pub use client_data::{ClientDataType, CollectedClientData};
pub use error::{Error, Result};
pub use types::{
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
    CoseAlgorithm, CredentialId, PublicKeyCredential, PublicKeyCredentialDescriptor,
    PublicKeyCredentialParameters, PublicKeyCredentialType, RelyingParty, User,
};
