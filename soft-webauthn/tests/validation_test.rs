//! Option validation tests
//!
//! Every rejection here must happen before the key store is touched.

mod common;

use common::*;

use soft_webauthn::{
    Authenticator, AuthenticatorAttachment, AuthenticatorConfig, AuthenticatorSelectionCriteria,
    Error, ResidentKeyRequirement, TrustedOrigin, UserVerificationRequirement, ValidationError,
};
use soft_webauthn_core::PublicKeyCredentialParameters;

use std::sync::Arc;

fn selection() -> AuthenticatorSelectionCriteria {
    AuthenticatorSelectionCriteria::new()
}

#[tokio::test]
async fn test_platform_attachment_not_supported() {
    let store = TestStore::new();
    let options = creation_options()
        .with_authenticator_selection(selection().with_attachment(AuthenticatorAttachment::Platform));

    let result = authenticator(store.clone()).create(&options, None).await;

    assert_eq!(
        result,
        Err(Error::Validation(ValidationError::NotSupported(
            "platform attachment"
        )))
    );
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_cross_platform_attachment_accepted() {
    let options = creation_options().with_authenticator_selection(
        selection().with_attachment(AuthenticatorAttachment::CrossPlatform),
    );

    assert!(authenticator(TestStore::new()).create(&options, None).await.is_ok());
}

#[tokio::test]
async fn test_discouraged_resident_key_rejected() {
    let store = TestStore::new();
    let options = creation_options().with_authenticator_selection(
        selection().with_resident_key(ResidentKeyRequirement::Discouraged),
    );

    let result = authenticator(store.clone()).create(&options, None).await;

    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::Constraint(_)))
    ));
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_preferred_resident_key_accepted() {
    let options = creation_options().with_authenticator_selection(
        selection().with_resident_key(ResidentKeyRequirement::Preferred),
    );

    assert!(authenticator(TestStore::new()).create(&options, None).await.is_ok());
}

#[tokio::test]
async fn test_discouraged_user_verification_rejected() {
    let store = TestStore::new();
    let authenticator = authenticator(store.clone());

    let create = creation_options().with_authenticator_selection(
        selection().with_user_verification(UserVerificationRequirement::Discouraged),
    );
    let get = request_options().with_user_verification(UserVerificationRequirement::Discouraged);

    assert!(matches!(
        authenticator.create(&create, None).await,
        Err(Error::Validation(ValidationError::Constraint(_)))
    ));
    assert!(matches!(
        authenticator.get(&get, None).await,
        Err(Error::Validation(ValidationError::Constraint(_)))
    ));
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_unsupported_algorithms_rejected_before_key_access() {
    let store = TestStore::new();
    let options = creation_options().with_pub_key_cred_params(vec![
        PublicKeyCredentialParameters::new(-257),
        PublicKeyCredentialParameters::new(-8),
    ]);

    let result = authenticator(store.clone()).create(&options, None).await;

    assert_eq!(result, Err(Error::UnsupportedAlgorithm));
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_first_supported_algorithm_selected() {
    let options = creation_options().with_pub_key_cred_params(vec![
        PublicKeyCredentialParameters::new(-257),
        PublicKeyCredentialParameters::es256(),
    ]);

    let credential = authenticator(TestStore::new())
        .create(&options, None)
        .await
        .unwrap();
    let object = soft_webauthn_core::AttestationObject::parse(
        &credential.attestation_response().unwrap().attestation_object,
    )
    .unwrap();
    assert_eq!(object.alg, -7);
}

#[tokio::test]
async fn test_configured_algorithms_limit_negotiation() {
    let store = TestStore::new();
    let config = AuthenticatorConfig::builder().algorithms(vec![-35]).build();
    let authenticator = Authenticator::with_config(
        store.clone(),
        Arc::new(TrustedOrigin::new(ORIGIN)),
        config,
    );

    let result = authenticator.create(&creation_options(), None).await;
    assert_eq!(result, Err(Error::UnsupportedAlgorithm));
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_origin_outside_rp_id_is_security_error() {
    let store = TestStore::new();
    let authenticator = Authenticator::new(
        store.clone(),
        Arc::new(TrustedOrigin::new("https://example.org").with_rp_id(RP_ID)),
    );

    let result = authenticator.get(&request_options(), None).await;

    assert_eq!(
        result,
        Err(Error::Validation(ValidationError::Security {
            origin: "https://example.org".to_string(),
            rp_id: RP_ID.to_string(),
        }))
    );
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_subdomain_origin_accepted() {
    let authenticator = Authenticator::new(
        TestStore::new(),
        Arc::new(TrustedOrigin::new("https://login.example.com").with_rp_id(RP_ID)),
    );

    let credential = authenticator.create(&creation_options(), None).await.unwrap();
    let client_data = String::from_utf8(
        credential
            .attestation_response()
            .unwrap()
            .client_data_json
            .clone(),
    )
    .unwrap();
    assert!(client_data.contains(r#""origin":"https://login.example.com""#));
}

#[tokio::test]
async fn test_insecure_origin_rejected() {
    let authenticator = Authenticator::new(
        TestStore::new(),
        Arc::new(TrustedOrigin::new("http://example.com").with_rp_id(RP_ID)),
    );

    assert!(matches!(
        authenticator.create(&creation_options(), None).await,
        Err(Error::Validation(ValidationError::Security { .. }))
    ));
}

#[tokio::test]
async fn test_cross_origin_client_data() {
    let authenticator = Authenticator::new(
        TestStore::new(),
        Arc::new(TrustedOrigin::new(ORIGIN).with_top_origin("https://portal.example.net")),
    );

    let credential = authenticator.get(&request_options(), None).await.unwrap();
    let client_data = String::from_utf8(
        credential
            .assertion_response()
            .unwrap()
            .client_data_json
            .clone(),
    )
    .unwrap();
    assert!(client_data.ends_with(
        r#""crossOrigin":true,"topOrigin":"https://portal.example.net"}"#
    ));
}

#[tokio::test]
async fn test_empty_challenge_rejected_by_normalizer() {
    let store = TestStore::new();
    let options = soft_webauthn::PublicKeyCredentialRequestOptions::new(Vec::new());

    let result = authenticator(store.clone()).get(&options, None).await;

    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::InvalidOptions(_)))
    ));
    assert_eq!(store.total_calls(), 0);
}
