//! ES256 credential key pairs and their JSON Web Key export form
//!
//! Credential keys leave this crate as JWKs (RFC 7517 / RFC 7518 section 6.2)
//! so that storage backends and the COSE encoder work from one
//! representation. Coordinates and the private scalar are base64url without
//! padding.

use crate::ecdsa;
use crate::error::{CryptoError, Result};

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

/// JSON Web Key for an elliptic-curve key
///
/// Member order follows the COSE key layout the attestation encoder emits.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JsonWebKey {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    pub crv: String,
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
}

impl JsonWebKey {
    /// Drop the private scalar and key operations, keeping only public members
    pub fn to_public(&self) -> Self {
        Self {
            d: None,
            key_ops: None,
            ..self.clone()
        }
    }

    /// Whether this JWK carries a private scalar
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    fn check_p256(&self) -> Result<()> {
        if self.kty != "EC" {
            return Err(CryptoError::InvalidJwk { member: "kty" });
        }
        if self.crv != "P-256" {
            return Err(CryptoError::InvalidJwk { member: "crv" });
        }
        if let Some(alg) = &self.alg
            && alg != "ES256"
        {
            return Err(CryptoError::InvalidJwk { member: "alg" });
        }
        Ok(())
    }
}

impl fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWebKey")
            .field("kty", &self.kty)
            .field("alg", &self.alg)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &self.d.as_ref().map(|_| "<redacted>"))
            .field("key_ops", &self.key_ops)
            .finish()
    }
}

/// Public half of a credential key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Parse a 65-byte uncompressed SEC1 point
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: ecdsa::verifying_key_from_sec1(bytes)?,
        })
    }

    /// Build from raw affine coordinates
    pub fn from_coordinates(x: &[u8], y: &[u8]) -> Result<Self> {
        for coordinate in [x, y] {
            if coordinate.len() != ecdsa::COORDINATE_LEN {
                return Err(CryptoError::InvalidKeyLength {
                    expected: ecdsa::COORDINATE_LEN,
                    actual: coordinate.len(),
                });
            }
        }

        let mut point = Vec::with_capacity(ecdsa::UNCOMPRESSED_POINT_LEN);
        point.push(0x04);
        point.extend_from_slice(x);
        point.extend_from_slice(y);
        Self::from_sec1_bytes(&point)
    }

    /// Parse a public (or private) P-256 JWK, ignoring `d`
    pub fn from_jwk(jwk: &JsonWebKey) -> Result<Self> {
        jwk.check_p256()?;
        let x = decode_member(&jwk.x, "x")?;
        let y = decode_member(&jwk.y, "y")?;
        Self::from_coordinates(&x, &y)
    }

    /// Uncompressed SEC1 encoding (0x04 || x || y)
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        ecdsa::to_sec1_uncompressed(&self.inner)
    }

    /// Export as a public JWK with `alg` set to ES256
    pub fn to_jwk(&self) -> JsonWebKey {
        let point = self.to_sec1_bytes();
        let (x, y) = point[1..].split_at(ecdsa::COORDINATE_LEN);

        JsonWebKey {
            kty: "EC".to_string(),
            alg: Some("ES256".to_string()),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
            d: None,
            key_ops: None,
        }
    }

    /// Verify a DER-encoded ES256 signature over `data`
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        ecdsa::verify(&self.inner, data, signature)
    }
}

/// ES256 credential key pair
///
/// # Examples
///
/// ```
/// use soft_webauthn_crypto::KeyPair;
///
/// let key_pair = KeyPair::generate();
/// let signature = key_pair.sign(b"message");
/// assert!(key_pair.public_key().verify(b"message", &signature).is_ok());
///
/// let jwk = key_pair.to_jwk();
/// assert_eq!(jwk.kty, "EC");
/// assert!(jwk.d.is_some());
/// assert!(key_pair.public_key().to_jwk().d.is_none());
/// ```
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: ecdsa::generate_signing_key(),
        }
    }

    /// Restore from a 32-byte private scalar
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            signing_key: ecdsa::signing_key_from_bytes(bytes)?,
        })
    }

    /// Restore from a private JWK
    ///
    /// The public coordinates in the JWK must match the private scalar.
    pub fn from_jwk(jwk: &JsonWebKey) -> Result<Self> {
        let public_key = PublicKey::from_jwk(jwk)?;
        let d = jwk
            .d
            .as_deref()
            .ok_or(CryptoError::InvalidJwk { member: "d" })?;
        let key_pair = Self::from_private_bytes(&decode_member(d, "d")?)?;

        if key_pair.public_key() != public_key {
            return Err(CryptoError::InvalidJwk { member: "x" });
        }
        Ok(key_pair)
    }

    /// Public half
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.signing_key.verifying_key().clone(),
        }
    }

    /// Private scalar bytes
    pub fn private_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Export as a private JWK
    pub fn to_jwk(&self) -> JsonWebKey {
        JsonWebKey {
            d: Some(URL_SAFE_NO_PAD.encode(self.private_bytes())),
            key_ops: Some(vec!["sign".to_string()]),
            ..self.public_key().to_jwk()
        }
    }

    /// Sign with ES256, returning a DER signature
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        ecdsa::sign(&self.signing_key, data)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

fn decode_member(value: &str, member: &'static str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| CryptoError::InvalidJwk { member })
}
