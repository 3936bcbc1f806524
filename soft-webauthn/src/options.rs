//! Public key credential request options
//!
//! These mirror `PublicKeyCredentialCreationOptions` and
//! `PublicKeyCredentialRequestOptions` from the WebAuthn JSON encoding, so a
//! relying party's options can be deserialized directly. Byte fields are
//! base64url.

use soft_webauthn_core::types::base64url;
use soft_webauthn_core::{
    PublicKeyCredentialDescriptor, PublicKeyCredentialParameters, RelyingParty, User,
};

use serde::{Deserialize, Serialize};

/// Authenticator attachment modality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    #[default]
    CrossPlatform,
}

/// Resident key (discoverable credential) requirement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Discouraged,
    Preferred,
    #[default]
    Required,
}

/// User verification requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Discouraged,
    Preferred,
    Required,
}

/// Authenticator selection criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<ResidentKeyRequirement>,

    /// Legacy form of `resident_key`
    #[serde(default)]
    pub require_resident_key: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationRequirement>,
}

impl AuthenticatorSelectionCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attachment(mut self, attachment: AuthenticatorAttachment) -> Self {
        self.authenticator_attachment = Some(attachment);
        self
    }

    pub fn with_resident_key(mut self, requirement: ResidentKeyRequirement) -> Self {
        self.resident_key = Some(requirement);
        self
    }

    pub fn with_user_verification(mut self, requirement: UserVerificationRequirement) -> Self {
        self.user_verification = Some(requirement);
        self
    }

    /// Attachment, defaulting to cross-platform
    pub fn attachment(&self) -> AuthenticatorAttachment {
        self.authenticator_attachment.unwrap_or_default()
    }

    /// Resident key requirement
    ///
    /// An explicit `resident_key` wins over the legacy boolean. Without it a
    /// resident key is required either way, since every credential this
    /// authenticator makes is discoverable.
    pub fn resident_key_requirement(&self) -> ResidentKeyRequirement {
        self.resident_key.unwrap_or_default()
    }

    /// User verification requirement, defaulting to required for creation
    pub fn user_verification_requirement(&self) -> UserVerificationRequirement {
        self.user_verification
            .unwrap_or(UserVerificationRequirement::Required)
    }
}

/// Options for creating a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    pub rp: RelyingParty,

    pub user: User,

    #[serde(with = "base64url")]
    pub challenge: Vec<u8>,

    #[serde(default)]
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,

    /// Milliseconds; replaced by the normalized timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
}

impl PublicKeyCredentialCreationOptions {
    pub fn new(rp: RelyingParty, user: User, challenge: Vec<u8>) -> Self {
        Self {
            rp,
            user,
            challenge,
            pub_key_cred_params: Vec::new(),
            timeout: None,
            exclude_credentials: Vec::new(),
            authenticator_selection: None,
            attestation: None,
        }
    }

    pub fn with_pub_key_cred_params(mut self, params: Vec<PublicKeyCredentialParameters>) -> Self {
        self.pub_key_cred_params = params;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn with_exclude_credentials(mut self, credentials: Vec<PublicKeyCredentialDescriptor>) -> Self {
        self.exclude_credentials = credentials;
        self
    }

    pub fn with_authenticator_selection(mut self, selection: AuthenticatorSelectionCriteria) -> Self {
        self.authenticator_selection = Some(selection);
        self
    }

    /// Selection criteria, or the defaults when absent
    pub fn selection(&self) -> AuthenticatorSelectionCriteria {
        self.authenticator_selection.clone().unwrap_or_default()
    }

    /// Requested algorithms in preference order
    ///
    /// Parameters of other credential types are ignored. An absent or empty
    /// list means ES256.
    pub fn requested_algorithms(&self) -> Vec<i32> {
        if self.pub_key_cred_params.is_empty() {
            return vec![PublicKeyCredentialParameters::es256().alg];
        }
        self.pub_key_cred_params
            .iter()
            .filter(|params| params.is_public_key())
            .map(|params| params.alg)
            .collect()
    }

    /// IDs of public-key credentials the RP already knows
    pub fn excluded_ids(&self) -> Vec<Vec<u8>> {
        public_key_ids(&self.exclude_credentials)
    }
}

/// Options for asserting an existing credential
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    #[serde(with = "base64url")]
    pub challenge: Vec<u8>,

    /// Milliseconds; replaced by the normalized timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Replaced by the normalized RP ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationRequirement>,
}

impl PublicKeyCredentialRequestOptions {
    pub fn new(challenge: Vec<u8>) -> Self {
        Self {
            challenge,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn with_rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = Some(rp_id.into());
        self
    }

    pub fn with_allow_credentials(mut self, credentials: Vec<PublicKeyCredentialDescriptor>) -> Self {
        self.allow_credentials = credentials;
        self
    }

    pub fn with_user_verification(mut self, requirement: UserVerificationRequirement) -> Self {
        self.user_verification = Some(requirement);
        self
    }

    /// User verification requirement, defaulting to preferred for assertion
    pub fn user_verification_requirement(&self) -> UserVerificationRequirement {
        self.user_verification
            .unwrap_or(UserVerificationRequirement::Preferred)
    }

    /// IDs of public-key credentials the RP will accept
    pub fn allowed_ids(&self) -> Vec<Vec<u8>> {
        public_key_ids(&self.allow_credentials)
    }
}

fn public_key_ids(descriptors: &[PublicKeyCredentialDescriptor]) -> Vec<Vec<u8>> {
    descriptors
        .iter()
        .filter(|descriptor| descriptor.is_public_key())
        .map(|descriptor| descriptor.id.clone())
        .collect()
}
