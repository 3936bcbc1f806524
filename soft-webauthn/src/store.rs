//! Collaborator interfaces for key storage and options normalization
//!
//! The credential flows never persist keys or decide which origin is calling.
//! Both concerns are delegated: a [`KeyStore`] produces key pairs and keeps
//! signature counters, and an [`OptionsNormalizer`] supplies the trusted RP
//! ID, origin, challenge and timeout for a request.
//!
//! [`MemoryKeyStore`] and [`TrustedOrigin`] are in-process implementations
//! suitable for tests and single-process embedders.

use crate::error::{Error, Result};
use crate::options::{PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use soft_webauthn_core::CredentialId;
use soft_webauthn_crypto::KeyPair;

/// Length of credential IDs minted by [`MemoryKeyStore`]
pub const CREDENTIAL_ID_LEN: usize = 32;

/// A key pair together with the credential it belongs to
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key_pair: KeyPair,
    pub credential_id: CredentialId,
}

/// Key-storage collaborator
///
/// Implementations own key generation, wrapping and persistence. Every method
/// may suspend; the flows race each call against cancellation.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Key pair of the discoverable credential for `rp_id`, created on first use
    async fn get_resident_key_pair(&self, rp_id: &str) -> Result<ResolvedKey>;

    /// Key pair for the first candidate credential this store can unwrap
    ///
    /// # Returns
    ///
    /// `Ok(None)` when none of the candidates belongs to this store.
    async fn get_key_pair_by_key_wrap(
        &self,
        rp_id: &str,
        candidates: &[CredentialId],
    ) -> Result<Option<ResolvedKey>>;

    /// New server-side credential, unless one of `exclude` already exists here
    async fn create_key_pair_by_key_wrap(
        &self,
        rp_id: &str,
        exclude: &[CredentialId],
    ) -> Result<ResolvedKey>;

    /// Current signature counter for a credential
    async fn get_sign_count(
        &self,
        key_pair: &KeyPair,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<u32>;

    /// Advance the signature counter after a response was produced
    async fn increment_sign_count(
        &self,
        key_pair: &KeyPair,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<()>;
}

/// Authoritative request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOptions {
    pub rp_id: String,
    pub origin: String,
    pub challenge: Vec<u8>,
    pub timeout: Option<Duration>,
    pub cross_origin: bool,
    pub top_origin: Option<String>,
}

/// Options-normalization collaborator
///
/// Receives options with caller-supplied `timeout` and RP ID overrides
/// already removed.
#[async_trait]
pub trait OptionsNormalizer: Send + Sync {
    async fn normalize_creation(
        &self,
        options: &PublicKeyCredentialCreationOptions,
    ) -> Result<NormalizedOptions>;

    async fn normalize_request(
        &self,
        options: &PublicKeyCredentialRequestOptions,
    ) -> Result<NormalizedOptions>;
}

/// Normalizer for a single, already-authenticated calling origin
#[derive(Debug, Clone)]
pub struct TrustedOrigin {
    origin: String,
    rp_id: Option<String>,
    timeout: Option<Duration>,
    cross_origin: bool,
    top_origin: Option<String>,
}

impl TrustedOrigin {
    /// Calls come from `origin`, which is also the RP ID unless overridden
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            rp_id: None,
            timeout: None,
            cross_origin: false,
            top_origin: None,
        }
    }

    pub fn with_rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = Some(rp_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark calls as coming from a frame embedded in `top_origin`
    pub fn with_top_origin(mut self, top_origin: impl Into<String>) -> Self {
        self.cross_origin = true;
        self.top_origin = Some(top_origin.into());
        self
    }

    fn normalize(&self, challenge: &[u8]) -> Result<NormalizedOptions> {
        if challenge.is_empty() {
            return Err(crate::ValidationError::InvalidOptions("empty challenge".into()).into());
        }

        Ok(NormalizedOptions {
            rp_id: self.rp_id.clone().unwrap_or_else(|| self.origin.clone()),
            origin: self.origin.clone(),
            challenge: challenge.to_vec(),
            timeout: self.timeout,
            cross_origin: self.cross_origin,
            top_origin: self.top_origin.clone(),
        })
    }
}

#[async_trait]
impl OptionsNormalizer for TrustedOrigin {
    async fn normalize_creation(
        &self,
        options: &PublicKeyCredentialCreationOptions,
    ) -> Result<NormalizedOptions> {
        self.normalize(&options.challenge)
    }

    async fn normalize_request(
        &self,
        options: &PublicKeyCredentialRequestOptions,
    ) -> Result<NormalizedOptions> {
        self.normalize(&options.challenge)
    }
}

struct StoredCredential {
    key_pair: KeyPair,
    sign_count: u32,
}

#[derive(Default)]
struct Inner {
    credentials: HashMap<(String, CredentialId), StoredCredential>,
    resident: HashMap<String, CredentialId>,
}

/// In-memory key store
///
/// Keys live for the lifetime of the store. Clones are not shared; wrap the
/// store in an `Arc` to share it.
#[derive(Default)]
pub struct MemoryKeyStore {
    inner: Mutex<Inner>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of credentials held for all relying parties
    pub fn credential_count(&self) -> usize {
        self.lock().map_or(0, |inner| inner.credentials.len())
    }

    /// Current counter of a credential, if it exists
    pub fn sign_count(&self, rp_id: &str, credential_id: &[u8]) -> Option<u32> {
        let inner = self.lock().ok()?;
        inner
            .credentials
            .get(&(rp_id.to_string(), credential_id.to_vec()))
            .map(|stored| stored.sign_count)
    }

    /// Import an existing credential, replacing any with the same ID
    pub fn insert(&self, rp_id: &str, credential_id: CredentialId, key_pair: KeyPair) -> Result<()> {
        self.lock()?.credentials.insert(
            (rp_id.to_string(), credential_id),
            StoredCredential {
                key_pair,
                sign_count: 0,
            },
        );
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::KeyResolution("key store lock poisoned".into()))
    }

    fn mint(inner: &mut Inner, rp_id: &str) -> ResolvedKey {
        let mut credential_id = vec![0u8; CREDENTIAL_ID_LEN];
        rand::thread_rng().fill_bytes(&mut credential_id);
        let key_pair = KeyPair::generate();

        inner.credentials.insert(
            (rp_id.to_string(), credential_id.clone()),
            StoredCredential {
                key_pair: key_pair.clone(),
                sign_count: 0,
            },
        );
        tracing::debug!(rp_id, "Minted credential");

        ResolvedKey {
            key_pair,
            credential_id,
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get_resident_key_pair(&self, rp_id: &str) -> Result<ResolvedKey> {
        let mut inner = self.lock()?;

        if let Some(credential_id) = inner.resident.get(rp_id).cloned()
            && let Some(stored) = inner.credentials.get(&(rp_id.to_string(), credential_id.clone()))
        {
            return Ok(ResolvedKey {
                key_pair: stored.key_pair.clone(),
                credential_id,
            });
        }

        let resolved = Self::mint(&mut inner, rp_id);
        inner
            .resident
            .insert(rp_id.to_string(), resolved.credential_id.clone());
        Ok(resolved)
    }

    async fn get_key_pair_by_key_wrap(
        &self,
        rp_id: &str,
        candidates: &[CredentialId],
    ) -> Result<Option<ResolvedKey>> {
        let inner = self.lock()?;

        Ok(candidates.iter().find_map(|credential_id| {
            inner
                .credentials
                .get(&(rp_id.to_string(), credential_id.clone()))
                .map(|stored| ResolvedKey {
                    key_pair: stored.key_pair.clone(),
                    credential_id: credential_id.clone(),
                })
        }))
    }

    async fn create_key_pair_by_key_wrap(
        &self,
        rp_id: &str,
        exclude: &[CredentialId],
    ) -> Result<ResolvedKey> {
        let mut inner = self.lock()?;

        if exclude
            .iter()
            .any(|id| inner.credentials.contains_key(&(rp_id.to_string(), id.clone())))
        {
            return Err(Error::KeyResolution(
                "an excluded credential is already registered".into(),
            ));
        }

        Ok(Self::mint(&mut inner, rp_id))
    }

    async fn get_sign_count(
        &self,
        _key_pair: &KeyPair,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<u32> {
        self.sign_count(rp_id, credential_id)
            .ok_or_else(|| Error::KeyResolution("unknown credential".into()))
    }

    async fn increment_sign_count(
        &self,
        _key_pair: &KeyPair,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let stored = inner
            .credentials
            .get_mut(&(rp_id.to_string(), credential_id.to_vec()))
            .ok_or_else(|| Error::KeyResolution("unknown credential".into()))?;

        stored.sign_count = stored
            .sign_count
            .checked_add(1)
            .ok_or_else(|| Error::KeyResolution("signature counter exhausted".into()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RP_ID: &str = "https://example.com";

    #[tokio::test]
    async fn test_resident_key_is_stable() {
        let store = MemoryKeyStore::new();

        let first = store.get_resident_key_pair(RP_ID).await.unwrap();
        let second = store.get_resident_key_pair(RP_ID).await.unwrap();

        assert_eq!(first.credential_id.len(), CREDENTIAL_ID_LEN);
        assert_eq!(first.credential_id, second.credential_id);
        assert_eq!(first.key_pair.public_key(), second.key_pair.public_key());
        assert_eq!(store.credential_count(), 1);
    }

    #[tokio::test]
    async fn test_resident_keys_scoped_by_rp() {
        let store = MemoryKeyStore::new();

        let a = store.get_resident_key_pair(RP_ID).await.unwrap();
        let b = store.get_resident_key_pair("https://other.example").await.unwrap();

        assert_ne!(a.credential_id, b.credential_id);
        assert_eq!(store.credential_count(), 2);
    }

    #[tokio::test]
    async fn test_key_wrap_lookup() {
        let store = MemoryKeyStore::new();
        let created = store.create_key_pair_by_key_wrap(RP_ID, &[]).await.unwrap();

        let found = store
            .get_key_pair_by_key_wrap(RP_ID, &[vec![0xff], created.credential_id.clone()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.credential_id, created.credential_id);

        let missing = store
            .get_key_pair_by_key_wrap("https://other.example", &[created.credential_id])
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_excluded() {
        let store = MemoryKeyStore::new();
        let existing = store.create_key_pair_by_key_wrap(RP_ID, &[]).await.unwrap();

        let result = store
            .create_key_pair_by_key_wrap(RP_ID, &[existing.credential_id])
            .await;
        assert!(matches!(result, Err(Error::KeyResolution(_))));

        let fresh = store
            .create_key_pair_by_key_wrap(RP_ID, &[vec![1, 2, 3]])
            .await;
        assert!(fresh.is_ok());
    }

    #[tokio::test]
    async fn test_sign_count() {
        let store = MemoryKeyStore::new();
        let resolved = store.get_resident_key_pair(RP_ID).await.unwrap();
        let id = &resolved.credential_id;

        assert_eq!(store.get_sign_count(&resolved.key_pair, RP_ID, id).await, Ok(0));
        store
            .increment_sign_count(&resolved.key_pair, RP_ID, id)
            .await
            .unwrap();
        assert_eq!(store.get_sign_count(&resolved.key_pair, RP_ID, id).await, Ok(1));

        assert!(
            store
                .get_sign_count(&resolved.key_pair, RP_ID, &[0])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_insert_imports_credential() {
        let store = MemoryKeyStore::new();
        let key_pair = KeyPair::generate();
        store.insert(RP_ID, vec![7; 16], key_pair.clone()).unwrap();

        let found = store
            .get_key_pair_by_key_wrap(RP_ID, &[vec![7; 16]])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.key_pair.public_key(), key_pair.public_key());
    }

    #[tokio::test]
    async fn test_trusted_origin() {
        let normalizer = TrustedOrigin::new("https://login.example.com")
            .with_rp_id("https://example.com")
            .with_timeout(Duration::from_secs(30));
        let options = PublicKeyCredentialRequestOptions::new(vec![1, 2, 3]);

        let normalized = normalizer.normalize_request(&options).await.unwrap();
        assert_eq!(normalized.rp_id, "https://example.com");
        assert_eq!(normalized.origin, "https://login.example.com");
        assert_eq!(normalized.challenge, vec![1, 2, 3]);
        assert_eq!(normalized.timeout, Some(Duration::from_secs(30)));
        assert!(!normalized.cross_origin);
    }

    #[tokio::test]
    async fn test_trusted_origin_rejects_empty_challenge() {
        let normalizer = TrustedOrigin::new("https://example.com");
        let options = PublicKeyCredentialRequestOptions::new(Vec::new());

        assert!(matches!(
            normalizer.normalize_request(&options).await,
            Err(Error::Validation(_))
        ));
    }
}
