//! Common test utilities for soft-webauthn integration tests
//!
//! Provides an instrumented key store, test constants, and option builders
//! shared across test files.

#![allow(dead_code)]

use soft_webauthn::{
    Authenticator, Error, KeyStore, MemoryKeyStore, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialRequestOptions, ResolvedKey, Result, TrustedOrigin,
};
use soft_webauthn_core::{CredentialId, RelyingParty, User};
use soft_webauthn_crypto::KeyPair;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

// Test constants
pub const RP_ID: &str = "https://example.com";
pub const ORIGIN: &str = "https://example.com";
pub const RP_NAME: &str = "Example";
pub const CHALLENGE: &[u8] = b"0123456789abcdef";

/// Key store that counts collaborator calls and can misbehave on demand
#[derive(Default)]
pub struct TestStore {
    inner: MemoryKeyStore,
    key_calls: AtomicUsize,
    sign_count_calls: AtomicUsize,
    increments: AtomicUsize,
    hang: AtomicBool,
    fail_increment: AtomicBool,
}

impl TestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Key resolution never completes
    pub fn hanging() -> Arc<Self> {
        let store = Self::default();
        store.hang.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    /// Sign count increments fail
    pub fn failing_increment() -> Arc<Self> {
        let store = Self::default();
        store.fail_increment.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn memory(&self) -> &MemoryKeyStore {
        &self.inner
    }

    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }

    pub fn sign_count_calls(&self) -> usize {
        self.sign_count_calls.load(Ordering::SeqCst)
    }

    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    /// Total collaborator calls of any kind
    pub fn total_calls(&self) -> usize {
        self.key_calls() + self.sign_count_calls() + self.increments()
    }

    async fn resolving(&self) {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl KeyStore for TestStore {
    async fn get_resident_key_pair(&self, rp_id: &str) -> Result<ResolvedKey> {
        self.resolving().await;
        self.inner.get_resident_key_pair(rp_id).await
    }

    async fn get_key_pair_by_key_wrap(
        &self,
        rp_id: &str,
        candidates: &[CredentialId],
    ) -> Result<Option<ResolvedKey>> {
        self.resolving().await;
        self.inner.get_key_pair_by_key_wrap(rp_id, candidates).await
    }

    async fn create_key_pair_by_key_wrap(
        &self,
        rp_id: &str,
        exclude: &[CredentialId],
    ) -> Result<ResolvedKey> {
        self.resolving().await;
        self.inner.create_key_pair_by_key_wrap(rp_id, exclude).await
    }

    async fn get_sign_count(
        &self,
        key_pair: &KeyPair,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<u32> {
        self.sign_count_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_sign_count(key_pair, rp_id, credential_id).await
    }

    async fn increment_sign_count(
        &self,
        key_pair: &KeyPair,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<()> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.fail_increment.load(Ordering::SeqCst) {
            return Err(Error::KeyResolution("counter storage offline".into()));
        }
        self.inner
            .increment_sign_count(key_pair, rp_id, credential_id)
            .await
    }
}

/// Authenticator over `store` for calls from [`ORIGIN`]
pub fn authenticator(store: Arc<TestStore>) -> Authenticator {
    Authenticator::new(store, Arc::new(TrustedOrigin::new(ORIGIN).with_rp_id(RP_ID)))
}

/// Authenticator whose normalizer asks for `timeout`
pub fn authenticator_with_timeout(store: Arc<TestStore>, timeout: Duration) -> Authenticator {
    Authenticator::new(
        store,
        Arc::new(
            TrustedOrigin::new(ORIGIN)
                .with_rp_id(RP_ID)
                .with_timeout(timeout),
        ),
    )
}

pub fn creation_options() -> PublicKeyCredentialCreationOptions {
    PublicKeyCredentialCreationOptions::new(
        RelyingParty::new(RP_NAME),
        User::new(vec![0xa1, 0xb2, 0xc3], "alice@example.com", "Alice"),
        CHALLENGE.to_vec(),
    )
}

pub fn request_options() -> PublicKeyCredentialRequestOptions {
    PublicKeyCredentialRequestOptions::new(CHALLENGE.to_vec())
}

/// Yield until the detached sign count task has run `expected` increments
pub async fn wait_for_increments(store: &TestStore, expected: usize) {
    for _ in 0..100 {
        if store.increments() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}
