//! Wire format tests for produced credentials
//!
//! Decodes attestation objects with an independent CBOR decoder and verifies
//! signatures with p256 directly, without going through this crate's own
//! verification helpers.

use base64::prelude::*;
use cbor4ii::core::Value;
use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use sha2::{Digest, Sha256};

use soft_webauthn_core::{
    AbortSignal, AttestationObject, ClientDataType, CollectedClientData, Error, attestation,
    cose,
};
use soft_webauthn_crypto::KeyPair;

const RP_ID: &str = "https://example.com";

fn member<'a>(entries: &'a [(Value, Value)], key: &Value) -> &'a Value {
    entries
        .iter()
        .find_map(|(k, v)| (k == key).then_some(v))
        .unwrap_or_else(|| panic!("missing member {key:?}"))
}

fn text(name: &str) -> Value {
    Value::Text(name.to_string())
}

fn bytes(value: &Value) -> &[u8] {
    match value {
        Value::Bytes(bytes) => bytes,
        other => panic!("expected bytes, got {other:?}"),
    }
}

fn client_data() -> CollectedClientData {
    CollectedClientData::new(ClientDataType::Create, b"server-challenge", RP_ID, false)
}

#[test]
fn test_fresh_key_registration() {
    let key_pair = KeyPair::generate();
    let credential_id = b"credential-0001".to_vec();

    let credential = attestation::generate_creation_response(
        &credential_id,
        &key_pair,
        0,
        RP_ID,
        &client_data(),
        &[-7],
        &AbortSignal::new(),
    )
    .unwrap();

    assert_eq!(credential.id, BASE64_STANDARD.encode(&credential.raw_id));
    assert_eq!(credential.raw_id, credential_id);

    let response = credential.attestation_response().unwrap();
    let Value::Map(object) =
        cbor4ii::serde::from_slice::<Value>(&response.attestation_object).unwrap()
    else {
        panic!("attestation object is not a map");
    };
    assert_eq!(member(&object, &text("fmt")), &text("packed"));

    let Value::Map(att_stmt) = member(&object, &text("attStmt")) else {
        panic!("attStmt is not a map");
    };
    assert_eq!(member(att_stmt, &text("alg")), &Value::Integer(-7));
    let sig = bytes(member(att_stmt, &text("sig")));
    let auth_data = bytes(member(&object, &text("authData")));

    // flags UP|UV|AT, zero counter, zero AAGUID
    assert_eq!(auth_data[32], 0x45);
    assert_eq!(&auth_data[33..37], &[0; 4]);
    assert_eq!(&auth_data[37..53], &[0; 16]);
    assert_eq!(&auth_data[53..55], &[0, credential_id.len() as u8]);

    let Value::Map(cose_key) =
        cbor4ii::serde::from_slice::<Value>(&auth_data[55 + credential_id.len()..]).unwrap()
    else {
        panic!("credential public key is not a map");
    };
    assert_eq!(member(&cose_key, &Value::Integer(1)), &Value::Integer(2));
    assert_eq!(member(&cose_key, &Value::Integer(3)), &Value::Integer(-7));
    assert_eq!(member(&cose_key, &Value::Integer(-1)), &Value::Integer(1));

    let point = p256::EncodedPoint::from_affine_coordinates(
        p256::FieldBytes::from_slice(bytes(member(&cose_key, &Value::Integer(-2)))),
        p256::FieldBytes::from_slice(bytes(member(&cose_key, &Value::Integer(-3)))),
        false,
    );
    let verifying_key = VerifyingKey::from_encoded_point(&point).unwrap();
    assert_eq!(
        verifying_key.to_encoded_point(false).as_bytes(),
        &key_pair.public_key().to_sec1_bytes()[..]
    );

    let client_data_hash = Sha256::digest(&response.client_data_json);
    let signature = Signature::from_der(sig).unwrap();
    verifying_key
        .verify(&[auth_data, &client_data_hash[..]].concat(), &signature)
        .unwrap();
}

#[test]
fn test_encoding_is_deterministic() {
    let key_pair = KeyPair::generate();
    let public_key = key_pair.public_key();
    assert_eq!(
        cose::encode_public_key(&public_key).unwrap(),
        cose::encode_public_key(&public_key).unwrap()
    );

    let credential = attestation::generate_creation_response(
        b"id",
        &key_pair,
        3,
        RP_ID,
        &client_data(),
        &[-7],
        &AbortSignal::new(),
    )
    .unwrap();
    let bytes = &credential.attestation_response().unwrap().attestation_object;
    let object = AttestationObject::parse(bytes).unwrap();
    assert_eq!(object.to_cbor().unwrap(), object.to_cbor().unwrap());
    assert_eq!(&object.to_cbor().unwrap(), bytes);
}

#[test]
fn test_oversized_credential_id_fails_before_signing() {
    let result = attestation::generate_creation_response(
        &vec![0xab; 70_000],
        &KeyPair::generate(),
        0,
        RP_ID,
        &client_data(),
        &[-7],
        &AbortSignal::new(),
    );

    assert_eq!(result, Err(Error::CredentialIdTooLong(70_000)));
}

#[test]
fn test_sign_count_is_big_endian() {
    let credential = attestation::generate_creation_response(
        b"id",
        &KeyPair::generate(),
        0x0102_0304,
        RP_ID,
        &client_data(),
        &[-7],
        &AbortSignal::new(),
    )
    .unwrap();

    let auth_data = attestation::verify_attestation(&credential).unwrap();
    assert_eq!(auth_data.sign_count, 0x0102_0304);
}
