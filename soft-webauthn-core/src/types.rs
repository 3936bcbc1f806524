//! WebAuthn data types shared by the request and response sides
//!
//! Byte fields serialize as unpadded base64url, the WebAuthn JSON encoding.

use serde::{Deserialize, Serialize};

/// Credential ID bytes
pub type CredentialId = Vec<u8>;

/// Public key credential type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicKeyCredentialType {
    #[default]
    #[serde(rename = "public-key")]
    PublicKey,
}

impl PublicKeyCredentialType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PublicKey => "public-key",
        }
    }
}

/// COSE algorithm identifiers for the ECDSA family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CoseAlgorithm {
    /// ES256 (ECDSA with P-256 and SHA-256)
    ES256 = -7,
    /// ES384 (ECDSA with P-384 and SHA-384)
    ES384 = -35,
    /// ES512 (ECDSA with P-521 and SHA-512)
    ES512 = -36,
}

impl CoseAlgorithm {
    /// Convert to i32 value
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Create from i32 value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -7 => Some(Self::ES256),
            -35 => Some(Self::ES384),
            -36 => Some(Self::ES512),
            _ => None,
        }
    }
}

/// Relying party entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// RP identifier; ignored by the credential flows in favour of the
    /// normalized RP ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,
}

impl RelyingParty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// User account entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User handle (max 64 bytes)
    #[serde(with = "base64url")]
    pub id: Vec<u8>,

    pub name: String,

    pub display_name: String,
}

impl User {
    pub fn new(id: Vec<u8>, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

/// Public key credential descriptor
///
/// Identifies a credential by its type and ID. The type is kept as text so
/// descriptors of unknown types can be received and filtered out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type")]
    pub cred_type: String,

    #[serde(with = "base64url")]
    pub id: CredentialId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

impl PublicKeyCredentialDescriptor {
    /// Create a new public-key credential descriptor
    pub fn new(id: CredentialId) -> Self {
        Self {
            cred_type: PublicKeyCredentialType::PublicKey.as_str().to_string(),
            id,
            transports: None,
        }
    }

    pub fn is_public_key(&self) -> bool {
        self.cred_type == PublicKeyCredentialType::PublicKey.as_str()
    }
}

/// Public key credential parameters
///
/// Specifies an acceptable credential type and algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub cred_type: String,

    /// COSE algorithm identifier
    pub alg: i32,
}

impl PublicKeyCredentialParameters {
    pub fn new(alg: i32) -> Self {
        Self {
            cred_type: PublicKeyCredentialType::PublicKey.as_str().to_string(),
            alg,
        }
    }

    /// ES256 public-key parameters
    pub fn es256() -> Self {
        Self::new(CoseAlgorithm::ES256.to_i32())
    }

    pub fn is_public_key(&self) -> bool {
        self.cred_type == PublicKeyCredentialType::PublicKey.as_str()
    }
}

/// Registration response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,

    #[serde(with = "base64url")]
    pub attestation_object: Vec<u8>,
}

/// Authentication response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,

    #[serde(with = "base64url")]
    pub authenticator_data: Vec<u8>,

    #[serde(with = "base64url")]
    pub signature: Vec<u8>,

    #[serde(default, with = "base64url::option")]
    pub user_handle: Option<Vec<u8>>,
}

/// Response body of either ceremony
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthenticatorResponse {
    Attestation(AuthenticatorAttestationResponse),
    Assertion(AuthenticatorAssertionResponse),
}

/// Credential returned to the relying party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential {
    /// Standard base64 of `raw_id`
    pub id: String,

    #[serde(with = "base64url")]
    pub raw_id: CredentialId,

    #[serde(rename = "type")]
    pub cred_type: PublicKeyCredentialType,

    pub response: AuthenticatorResponse,
}

impl PublicKeyCredential {
    pub fn attestation_response(&self) -> Option<&AuthenticatorAttestationResponse> {
        match &self.response {
            AuthenticatorResponse::Attestation(response) => Some(response),
            AuthenticatorResponse::Assertion(_) => None,
        }
    }

    pub fn assertion_response(&self) -> Option<&AuthenticatorAssertionResponse> {
        match &self.response {
            AuthenticatorResponse::Assertion(response) => Some(response),
            AuthenticatorResponse::Attestation(_) => None,
        }
    }
}

/// Serde adapter for byte fields as unpadded base64url
///
/// Padded input is accepted when deserializing.
pub mod base64url {
    use base64::{
        Engine,
        engine::{
            DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig,
            general_purpose::URL_SAFE_NO_PAD,
        },
    };
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    const LENIENT: GeneralPurpose = GeneralPurpose::new(
        &base64::alphabet::URL_SAFE,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    );

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        LENIENT.decode(text).map_err(D::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super")] Vec<u8>);

            Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(bytes)| bytes))
        }
    }
}
