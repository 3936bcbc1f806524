//! Registration and assertion response assembly
//!
//! Both ceremonies sign `authenticatorData || SHA-256(clientDataJSON)` with
//! the credential key. Registration wraps the signature in a packed
//! self-attestation statement:
//!
//! ```text
//! { "fmt": "packed", "attStmt": { "alg": <COSE alg>, "sig": <DER> }, "authData": <bytes> }
//! ```
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-packed-attestation>

use crate::abort::AbortSignal;
use crate::auth_data::{self, AuthenticatorData, Flags};
use crate::cbor::MapBuilder;
use crate::client_data::CollectedClientData;
use crate::cose;
use crate::error::{Error, Result};
use crate::origin;
use crate::types::{
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
    CoseAlgorithm, PublicKeyCredential, PublicKeyCredentialType,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use soft_webauthn_crypto::{KeyPair, PublicKey};

/// Attestation statement format produced by this authenticator
pub const PACKED: &str = "packed";

/// Algorithms the signing step can produce
pub const SUPPORTED_ALGORITHMS: &[CoseAlgorithm] = &[CoseAlgorithm::ES256];

/// Pick the first requested algorithm that is also supported
///
/// Requested order is the relying party's preference order.
pub fn select_algorithm(requested: &[i32], supported: &[CoseAlgorithm]) -> Result<CoseAlgorithm> {
    requested
        .iter()
        .filter_map(|alg| CoseAlgorithm::from_i32(*alg))
        .find(|alg| supported.contains(alg))
        .ok_or(Error::UnsupportedAlgorithm)
}

/// Response `id` for a credential ID
pub fn credential_id_text(credential_id: &[u8]) -> String {
    STANDARD.encode(credential_id)
}

/// Decoded packed attestation object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationObject {
    pub fmt: String,
    pub alg: i32,
    pub sig: Vec<u8>,
    pub auth_data: Vec<u8>,
}

impl AttestationObject {
    /// Encode with members in `fmt, attStmt, authData` order
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let att_stmt = MapBuilder::new()
            .insert("alg", self.alg)
            .insert("sig", self.sig.clone())
            .build();

        MapBuilder::new()
            .insert("fmt", self.fmt.as_str())
            .insert("attStmt", att_stmt)
            .insert("authData", self.auth_data.clone())
            .encode()
    }

    /// Decode an attestation object produced by any encoder
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        use cbor4ii::core::Value as Decoded;

        fn member<'a>(entries: &'a [(Decoded, Decoded)], name: &str) -> Option<&'a Decoded> {
            entries.iter().find_map(|(key, value)| match key {
                Decoded::Text(key) if key == name => Some(value),
                _ => None,
            })
        }

        let decoded: Decoded = cbor4ii::serde::from_slice(bytes)
            .map_err(|_| Error::MalformedAttestation("attestation object is not CBOR"))?;
        let Decoded::Map(entries) = decoded else {
            return Err(Error::MalformedAttestation(
                "attestation object is not a map",
            ));
        };

        let Some(Decoded::Text(fmt)) = member(&entries, "fmt") else {
            return Err(Error::MalformedAttestation("missing fmt"));
        };
        let Some(Decoded::Bytes(auth_data)) = member(&entries, "authData") else {
            return Err(Error::MalformedAttestation("missing authData"));
        };
        let Some(Decoded::Map(att_stmt)) = member(&entries, "attStmt") else {
            return Err(Error::MalformedAttestation("missing attStmt"));
        };
        let Some(Decoded::Integer(alg)) = member(att_stmt, "alg") else {
            return Err(Error::MalformedAttestation("missing attStmt.alg"));
        };
        let Some(Decoded::Bytes(sig)) = member(att_stmt, "sig") else {
            return Err(Error::MalformedAttestation("missing attStmt.sig"));
        };

        Ok(Self {
            fmt: fmt.clone(),
            alg: i32::try_from(*alg)
                .map_err(|_| Error::MalformedAttestation("attStmt.alg out of range"))?,
            sig: sig.clone(),
            auth_data: auth_data.clone(),
        })
    }
}

/// Build a registration response
///
/// Fails with [`Error::Aborted`] if `abort` has already fired, with
/// [`Error::UnsupportedAlgorithm`] if no requested algorithm is supported,
/// and with encoding errors before anything is signed.
///
/// # Examples
///
/// ```
/// use soft_webauthn_core::{
///     abort::AbortSignal,
///     attestation,
///     client_data::{ClientDataType, CollectedClientData},
/// };
/// use soft_webauthn_crypto::KeyPair;
///
/// let client_data = CollectedClientData::new(
///     ClientDataType::Create,
///     b"challenge",
///     "https://example.com",
///     false,
/// );
/// let credential = attestation::generate_creation_response(
///     b"credential-id",
///     &KeyPair::generate(),
///     0,
///     "https://example.com",
///     &client_data,
///     &[-7],
///     &AbortSignal::new(),
/// )
/// .unwrap();
///
/// assert!(attestation::verify_attestation(&credential).is_ok());
/// ```
pub fn generate_creation_response(
    credential_id: &[u8],
    key_pair: &KeyPair,
    sign_count: u32,
    rp_id: &str,
    client_data: &CollectedClientData,
    requested_algorithms: &[i32],
    abort: &AbortSignal,
) -> Result<PublicKeyCredential> {
    abort.check().map_err(Error::Aborted)?;

    let cose_key = cose::encode_public_key(&key_pair.public_key())?;
    let rp_id_hash = origin::rp_id_hash(rp_id)?;
    let auth_data = auth_data::build_authenticator_data(
        &rp_id_hash,
        Flags::CREATE,
        sign_count,
        credential_id,
        &cose_key,
    )?;

    let client_data_json = client_data.serialize().into_bytes();
    let client_data_hash = Sha256::digest(&client_data_json);

    let alg = select_algorithm(requested_algorithms, SUPPORTED_ALGORITHMS)?;
    let sig = key_pair.sign(&[&auth_data[..], &client_data_hash[..]].concat());

    tracing::debug!(
        alg = alg.to_i32(),
        sign_count,
        auth_data_len = auth_data.len(),
        "Built packed attestation"
    );

    let attestation_object = AttestationObject {
        fmt: PACKED.to_string(),
        alg: alg.to_i32(),
        sig,
        auth_data,
    }
    .to_cbor()?;

    Ok(PublicKeyCredential {
        id: credential_id_text(credential_id),
        raw_id: credential_id.to_vec(),
        cred_type: PublicKeyCredentialType::PublicKey,
        response: AuthenticatorResponse::Attestation(AuthenticatorAttestationResponse {
            client_data_json,
            attestation_object,
        }),
    })
}

/// Build an assertion response
///
/// Assertions carry no attested credential data and always sign with ES256.
pub fn generate_assertion_response(
    credential_id: &[u8],
    key_pair: &KeyPair,
    sign_count: u32,
    rp_id: &str,
    client_data: &CollectedClientData,
    abort: &AbortSignal,
) -> Result<PublicKeyCredential> {
    abort.check().map_err(Error::Aborted)?;

    let rp_id_hash = origin::rp_id_hash(rp_id)?;
    let authenticator_data =
        auth_data::build_assertion_data(&rp_id_hash, Flags::ASSERT, sign_count)?;

    let client_data_json = client_data.serialize().into_bytes();
    let client_data_hash = Sha256::digest(&client_data_json);
    let signature = key_pair.sign(&[&authenticator_data[..], &client_data_hash[..]].concat());

    tracing::debug!(sign_count, "Built assertion");

    Ok(PublicKeyCredential {
        id: credential_id_text(credential_id),
        raw_id: credential_id.to_vec(),
        cred_type: PublicKeyCredentialType::PublicKey,
        response: AuthenticatorResponse::Assertion(AuthenticatorAssertionResponse {
            client_data_json,
            authenticator_data,
            signature,
            user_handle: None,
        }),
    })
}

/// Check a registration response against the key it attests
///
/// Decodes the attestation object, recovers the credential public key from
/// the attested credential data and verifies the packed self-attestation
/// signature. Returns the decoded authenticator data.
pub fn verify_attestation(credential: &PublicKeyCredential) -> Result<AuthenticatorData> {
    let response = credential
        .attestation_response()
        .ok_or(Error::MalformedAttestation("not a registration response"))?;
    let attestation = AttestationObject::parse(&response.attestation_object)?;

    if attestation.fmt != PACKED {
        return Err(Error::MalformedAttestation("unsupported attestation format"));
    }
    if CoseAlgorithm::from_i32(attestation.alg) != Some(CoseAlgorithm::ES256) {
        return Err(Error::UnsupportedAlgorithm);
    }

    let auth_data = AuthenticatorData::parse(&attestation.auth_data)?;
    let attested = auth_data
        .attested_credential
        .as_ref()
        .ok_or(Error::MalformedAuthenticatorData("missing attested credential data"))?;
    if attested.credential_id != credential.raw_id {
        return Err(Error::MalformedAttestation("credential ID mismatch"));
    }
    let public_key = cose::decode_public_key(&attested.credential_public_key)?;

    verify_signature(
        &public_key,
        &attestation.auth_data,
        &response.client_data_json,
        &attestation.sig,
    )?;
    Ok(auth_data)
}

/// Check an assertion response against a known credential public key
pub fn verify_assertion(
    credential: &PublicKeyCredential,
    public_key: &PublicKey,
) -> Result<AuthenticatorData> {
    let response = credential
        .assertion_response()
        .ok_or(Error::MalformedAttestation("not an assertion response"))?;
    let auth_data = AuthenticatorData::parse(&response.authenticator_data)?;

    verify_signature(
        public_key,
        &response.authenticator_data,
        &response.client_data_json,
        &response.signature,
    )?;
    Ok(auth_data)
}

fn verify_signature(
    public_key: &PublicKey,
    auth_data: &[u8],
    client_data_json: &[u8],
    signature: &[u8],
) -> Result<()> {
    let client_data_hash = Sha256::digest(client_data_json);
    public_key.verify(&[auth_data, &client_data_hash[..]].concat(), signature)?;
    Ok(())
}
