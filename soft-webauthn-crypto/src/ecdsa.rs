//! P-256 ECDSA (ES256) signatures for attestation and assertions
//!
//! COSE algorithm identifier: -7 (ES256)
//! Spec: <https://www.rfc-editor.org/rfc/rfc8152.html#section-8.1>
//!
//! ES256 uses:
//! - Curve: P-256 (secp256r1 / prime256v1)
//! - Hash: SHA-256
//! - Signature format: ASN.1 DER, as WebAuthn relying parties expect

use crate::error::{CryptoError, Result};

use p256::ecdsa::{Signature, SigningKey, VerifyingKey, signature::Signer, signature::Verifier};
use rand::rngs::OsRng;

/// Length of a P-256 scalar or field element in bytes
pub const COORDINATE_LEN: usize = 32;

/// Length of an uncompressed SEC1 point (0x04 || x || y)
pub const UNCOMPRESSED_POINT_LEN: usize = 1 + 2 * COORDINATE_LEN;

/// Generate a fresh signing key from the OS random source
pub fn generate_signing_key() -> SigningKey {
    SigningKey::random(&mut OsRng)
}

/// Sign data with ES256 (P-256 + SHA-256)
///
/// The data is hashed with SHA-256 internally by the signing operation.
///
/// # Returns
///
/// DER-encoded ECDSA signature (typically 70-72 bytes)
///
/// # Examples
///
/// ```
/// use soft_webauthn_crypto::ecdsa;
///
/// let key = ecdsa::generate_signing_key();
/// let signature = ecdsa::sign(&key, b"authData || clientDataHash");
/// assert!(signature.len() >= 8 && signature.len() <= 72);
/// assert_eq!(signature[0], 0x30);
/// ```
pub fn sign(signing_key: &SigningKey, data: &[u8]) -> Vec<u8> {
    let signature: Signature = signing_key.sign(data);
    signature.to_der().to_bytes().to_vec()
}

/// Verify a DER-encoded ES256 signature
///
/// # Examples
///
/// ```
/// use soft_webauthn_crypto::ecdsa;
///
/// let key = ecdsa::generate_signing_key();
/// let signature = ecdsa::sign(&key, b"payload");
///
/// assert!(ecdsa::verify(key.verifying_key(), b"payload", &signature).is_ok());
/// assert!(ecdsa::verify(key.verifying_key(), b"wrong", &signature).is_err());
/// ```
pub fn verify(verifying_key: &VerifyingKey, data: &[u8], signature: &[u8]) -> Result<()> {
    let sig = Signature::from_der(signature).map_err(|_| CryptoError::InvalidSignature)?;

    verifying_key
        .verify(data, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Verify a DER-encoded signature against an uncompressed SEC1 public key
///
/// * `public_key` - 65-byte uncompressed SEC1 format (0x04 || x || y)
pub fn verify_sec1(public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key = verifying_key_from_sec1(public_key)?;
    verify(&verifying_key, data, signature)
}

/// Parse an uncompressed SEC1 point into a verifying key
pub fn verifying_key_from_sec1(public_key: &[u8]) -> Result<VerifyingKey> {
    if public_key.len() != UNCOMPRESSED_POINT_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: UNCOMPRESSED_POINT_LEN,
            actual: public_key.len(),
        });
    }
    if public_key[0] != 0x04 {
        return Err(CryptoError::InvalidPublicKey);
    }

    VerifyingKey::from_sec1_bytes(public_key).map_err(|_| CryptoError::InvalidPublicKey)
}

/// Parse a 32-byte private scalar
pub fn signing_key_from_bytes(private_key: &[u8]) -> Result<SigningKey> {
    let scalar: &[u8; COORDINATE_LEN] =
        private_key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: COORDINATE_LEN,
                actual: private_key.len(),
            })?;

    SigningKey::from_bytes(scalar.into()).map_err(|_| CryptoError::InvalidPrivateKey)
}

/// Uncompressed SEC1 encoding of a verifying key
pub fn to_sec1_uncompressed(verifying_key: &VerifyingKey) -> Vec<u8> {
    verifying_key.to_encoded_point(false).as_bytes().to_vec()
}
