//! Software WebAuthn authenticator
//!
//! Runs the `create` and `get` ceremonies on behalf of a browser-like caller.
//! Each call is one flow:
//!
//! ```text
//! Validating -> AlgorithmNegotiation -> AwaitingKeyMaterial -> Signing -> Completed
//! ```
//!
//! with `Aborted` and `Failed` reachable from any state. Key material and the
//! trusted request parameters come from injected collaborators.

use crate::config::AuthenticatorConfig;
use crate::error::{Error, Result, ValidationError};
use crate::options::{
    AuthenticatorAttachment, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialRequestOptions, ResidentKeyRequirement, UserVerificationRequirement,
};
use crate::store::{KeyStore, NormalizedOptions, OptionsNormalizer, ResolvedKey};

use soft_webauthn_core::{
    AbortReason, AbortSignal, ClientDataType, CollectedClientData, CoseAlgorithm,
    PublicKeyCredential, attestation, origin,
};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Flow states, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    Validating,
    AlgorithmNegotiation,
    AwaitingKeyMaterial,
    Signing,
    Completed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::AlgorithmNegotiation => "algorithm-negotiation",
            Self::AwaitingKeyMaterial => "awaiting-key-material",
            Self::Signing => "signing",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

fn transition(ceremony: ClientDataType, state: FlowState) {
    tracing::debug!(ceremony = ceremony.as_str(), %state, "Flow state");
}

/// Fires a flow's signal with [`AbortReason::Timeout`] unless dropped first
///
/// Flows arm the configured default at entry and re-arm with the normalized
/// timeout once the options normalizer has answered.
struct TimeoutTimer {
    handle: JoinHandle<()>,
}

impl TimeoutTimer {
    fn arm(signal: &AbortSignal, timeout: Duration) -> Self {
        let signal = signal.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::info!(timeout_ms = timeout.as_millis() as u64, "Ceremony timed out");
            signal.abort_with(AbortReason::Timeout);
        });
        Self { handle }
    }
}

impl Drop for TimeoutTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Software WebAuthn authenticator
///
/// Cheap to clone; clones share the collaborators.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> soft_webauthn::Result<()> {
/// use std::sync::Arc;
/// use soft_webauthn::{
///     Authenticator, MemoryKeyStore, PublicKeyCredentialCreationOptions, TrustedOrigin,
/// };
/// use soft_webauthn_core::{RelyingParty, User};
///
/// let authenticator = Authenticator::new(
///     Arc::new(MemoryKeyStore::new()),
///     Arc::new(TrustedOrigin::new("https://example.com")),
/// );
///
/// let options = PublicKeyCredentialCreationOptions::new(
///     RelyingParty::new("Example"),
///     User::new(vec![1, 2, 3], "alice", "Alice"),
///     b"server-challenge".to_vec(),
/// );
/// let credential = authenticator.create(&options, None).await?;
/// println!("Registered {}", credential.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn KeyStore>,
    normalizer: Arc<dyn OptionsNormalizer>,
    config: AuthenticatorConfig,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create an authenticator with the default configuration
    pub fn new(store: Arc<dyn KeyStore>, normalizer: Arc<dyn OptionsNormalizer>) -> Self {
        Self::with_config(store, normalizer, AuthenticatorConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn KeyStore>,
        normalizer: Arc<dyn OptionsNormalizer>,
        config: AuthenticatorConfig,
    ) -> Self {
        Self {
            store,
            normalizer,
            config,
        }
    }

    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    /// Register a new credential
    ///
    /// # Arguments
    ///
    /// * `options` - Creation options from the relying party
    /// * `signal` - Optional caller cancellation; the flow also times out on
    ///   its own
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] - options rejected before any key access
    /// * [`Error::UnsupportedAlgorithm`] - no requested algorithm is supported
    /// * [`Error::Aborted`] - cancelled by the caller or timed out
    /// * [`Error::KeyResolution`] - the key store produced no usable key
    pub async fn create(
        &self,
        options: &PublicKeyCredentialCreationOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<PublicKeyCredential> {
        tracing::info!(rp = %options.rp.name, "Creating credential");

        self.create_inner(options, signal)
            .await
            .inspect_err(|err| log_failure(ClientDataType::Create, err))
    }

    /// Produce an assertion with an existing credential
    ///
    /// Takes the same arguments and fails the same ways as
    /// [`create`](Self::create), except that no algorithm is negotiated.
    pub async fn get(
        &self,
        options: &PublicKeyCredentialRequestOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<PublicKeyCredential> {
        tracing::info!(
            allow_credentials = options.allow_credentials.len(),
            "Getting assertion"
        );

        self.get_inner(options, signal)
            .await
            .inspect_err(|err| log_failure(ClientDataType::Get, err))
    }

    async fn create_inner(
        &self,
        options: &PublicKeyCredentialCreationOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<PublicKeyCredential> {
        const CEREMONY: ClientDataType = ClientDataType::Create;
        transition(CEREMONY, FlowState::Validating);

        let caller = signal.cloned().unwrap_or_default();
        caller.check()?;

        let selection = options.selection();
        if selection.attachment() == AuthenticatorAttachment::Platform {
            return Err(ValidationError::NotSupported("platform attachment").into());
        }
        if selection.resident_key_requirement() == ResidentKeyRequirement::Discouraged {
            return Err(ValidationError::Constraint("resident key is always created").into());
        }
        check_user_verification(selection.user_verification_requirement())?;

        let mut stripped = options.clone();
        stripped.timeout = None;
        stripped.rp.id = None;
        let flow = caller.child();
        let mut _timer = TimeoutTimer::arm(&flow, self.config.effective_timeout(None));
        let normalized = flow
            .guard(self.normalizer.normalize_creation(&stripped))
            .await??;
        tracing::debug!(
            rp_id = %normalized.rp_id,
            origin = %normalized.origin,
            "Normalized options"
        );
        check_origin(&normalized)?;

        _timer = TimeoutTimer::arm(&flow, self.config.effective_timeout(normalized.timeout));

        transition(CEREMONY, FlowState::AlgorithmNegotiation);
        let requested = options.requested_algorithms();
        let supported = self.config.supported_algorithms();
        let alg = attestation::select_algorithm(&requested, &supported)?;
        tracing::debug!(alg = alg.to_i32(), "Selected algorithm");

        transition(CEREMONY, FlowState::AwaitingKeyMaterial);
        let rp_id = normalized.rp_id.as_str();
        let excluded = options.excluded_ids();
        let resolved = if excluded.is_empty() {
            flow.guard(self.store.get_resident_key_pair(rp_id)).await??
        } else {
            flow.guard(self.store.create_key_pair_by_key_wrap(rp_id, &excluded))
                .await??
        };
        let sign_count = flow
            .guard(self.store.get_sign_count(
                &resolved.key_pair,
                rp_id,
                &resolved.credential_id,
            ))
            .await??;

        transition(CEREMONY, FlowState::Signing);
        let client_data = client_data(CEREMONY, &normalized);
        let credential = attestation::generate_creation_response(
            &resolved.credential_id,
            &resolved.key_pair,
            sign_count,
            rp_id,
            &client_data,
            &[alg.to_i32()],
            &flow,
        )?;

        self.spawn_increment(resolved, rp_id);
        transition(CEREMONY, FlowState::Completed);
        Ok(credential)
    }

    async fn get_inner(
        &self,
        options: &PublicKeyCredentialRequestOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<PublicKeyCredential> {
        const CEREMONY: ClientDataType = ClientDataType::Get;
        transition(CEREMONY, FlowState::Validating);

        let caller = signal.cloned().unwrap_or_default();
        caller.check()?;
        check_user_verification(options.user_verification_requirement())?;

        let mut stripped = options.clone();
        stripped.timeout = None;
        stripped.rp_id = None;
        let flow = caller.child();
        let mut _timer = TimeoutTimer::arm(&flow, self.config.effective_timeout(None));
        let normalized = flow
            .guard(self.normalizer.normalize_request(&stripped))
            .await??;
        tracing::debug!(
            rp_id = %normalized.rp_id,
            origin = %normalized.origin,
            "Normalized options"
        );
        check_origin(&normalized)?;

        _timer = TimeoutTimer::arm(&flow, self.config.effective_timeout(normalized.timeout));

        if !self.config.supported_algorithms().contains(&CoseAlgorithm::ES256) {
            return Err(Error::UnsupportedAlgorithm);
        }

        transition(CEREMONY, FlowState::AwaitingKeyMaterial);
        let rp_id = normalized.rp_id.as_str();
        let allowed = options.allowed_ids();
        let resolved = if allowed.is_empty() {
            flow.guard(self.store.get_resident_key_pair(rp_id)).await??
        } else {
            flow.guard(self.store.get_key_pair_by_key_wrap(rp_id, &allowed))
                .await??
                .ok_or_else(|| {
                    Error::KeyResolution("no allowed credential belongs to this authenticator".into())
                })?
        };
        let sign_count = flow
            .guard(self.store.get_sign_count(
                &resolved.key_pair,
                rp_id,
                &resolved.credential_id,
            ))
            .await??;

        transition(CEREMONY, FlowState::Signing);
        let client_data = client_data(CEREMONY, &normalized);
        let credential = attestation::generate_assertion_response(
            &resolved.credential_id,
            &resolved.key_pair,
            sign_count,
            rp_id,
            &client_data,
            &flow,
        )?;

        self.spawn_increment(resolved, rp_id);
        transition(CEREMONY, FlowState::Completed);
        Ok(credential)
    }

    /// Advance the counter in the background; the response does not wait
    fn spawn_increment(&self, resolved: ResolvedKey, rp_id: &str) {
        let store = Arc::clone(&self.store);
        let rp_id = rp_id.to_string();

        tokio::spawn(async move {
            if let Err(err) = store
                .increment_sign_count(&resolved.key_pair, &rp_id, &resolved.credential_id)
                .await
            {
                tracing::warn!(rp_id = %rp_id, error = %err, "Failed to increment sign count");
            }
        });
    }
}

fn check_user_verification(requirement: UserVerificationRequirement) -> Result<()> {
    if requirement == UserVerificationRequirement::Discouraged {
        return Err(ValidationError::Constraint("user verification is always performed").into());
    }
    Ok(())
}

fn check_origin(normalized: &NormalizedOptions) -> Result<()> {
    if !origin::is_registrable_domain(&normalized.origin, &normalized.rp_id) {
        return Err(ValidationError::Security {
            origin: normalized.origin.clone(),
            rp_id: normalized.rp_id.clone(),
        }
        .into());
    }
    Ok(())
}

fn client_data(ty: ClientDataType, normalized: &NormalizedOptions) -> CollectedClientData {
    let client_data = CollectedClientData::new(
        ty,
        &normalized.challenge,
        normalized.origin.as_str(),
        normalized.cross_origin,
    );
    match &normalized.top_origin {
        Some(top_origin) => client_data.with_top_origin(top_origin.as_str()),
        None => client_data,
    }
}

fn log_failure(ceremony: ClientDataType, err: &Error) {
    match err {
        Error::Aborted(reason) => {
            tracing::info!(ceremony = ceremony.as_str(), %reason, "Ceremony aborted");
        }
        err => {
            tracing::debug!(ceremony = ceremony.as_str(), error = %err, "Ceremony failed");
        }
    }
}
