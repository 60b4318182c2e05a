//! In-memory credentials provider for testing.
//!
//! Provides a credentials provider that stores the pair in memory and counts
//! writes, so tests can verify how often the coordinator touched the store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::CredentialPair;
use crate::traits::{CredentialsError, CredentialsProvider};

/// In-memory credentials provider for testing.
///
/// Clones share the stored pair, the failure switches and the counters.
///
/// # Example
///
/// ```ignore
/// use speclink::adapters::mock::InMemoryCredentials;
/// use speclink::auth::CredentialPair;
/// use speclink::traits::CredentialsProvider;
///
/// let provider = InMemoryCredentials::new();
/// assert!(provider.load().await?.is_none());
///
/// provider.save(&CredentialPair::new("T1", "R1")).await?;
/// assert_eq!(provider.load().await?.unwrap().access_token, "T1");
///
/// provider.clear().await?;
/// assert_eq!(provider.clear_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentials {
    /// Stored pair
    credentials: Arc<Mutex<Option<CredentialPair>>>,
    /// Whether save should fail
    save_should_fail: Arc<AtomicBool>,
    /// Whether load should fail
    load_should_fail: Arc<AtomicBool>,
    /// Whether clear should fail
    clear_should_fail: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
    clears: Arc<AtomicUsize>,
}

impl InMemoryCredentials {
    /// Create an empty (logged-out) provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider holding `pair`.
    pub fn with_credentials(pair: CredentialPair) -> Self {
        let provider = Self::new();
        provider.set_credentials(Some(pair));
        provider
    }

    /// Configure whether save should fail.
    pub fn set_save_should_fail(&self, should_fail: bool) {
        self.save_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Configure whether load should fail.
    pub fn set_load_should_fail(&self, should_fail: bool) {
        self.load_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Configure whether clear should fail.
    pub fn set_clear_should_fail(&self, should_fail: bool) {
        self.clear_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Get the current pair synchronously (for testing).
    pub fn get_credentials(&self) -> Option<CredentialPair> {
        self.credentials.lock().clone()
    }

    /// Set the pair synchronously without counting a save.
    pub fn set_credentials(&self, pair: Option<CredentialPair>) {
        *self.credentials.lock() = pair;
    }

    /// Number of `save` calls, including failed ones.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of `clear` calls, including failed ones.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialsProvider for InMemoryCredentials {
    async fn load(&self) -> Result<Option<CredentialPair>, CredentialsError> {
        if self.load_should_fail.load(Ordering::SeqCst) {
            return Err(CredentialsError::LoadFailed("Mock load failure".to_string()));
        }
        Ok(self.get_credentials())
    }

    async fn save(&self, pair: &CredentialPair) -> Result<(), CredentialsError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.save_should_fail.load(Ordering::SeqCst) {
            return Err(CredentialsError::SaveFailed("Mock save failure".to_string()));
        }
        self.set_credentials(Some(pair.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialsError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if self.clear_should_fail.load(Ordering::SeqCst) {
            return Err(CredentialsError::ClearFailed("Mock clear failure".to_string()));
        }
        self.set_credentials(None);
        Ok(())
    }
}
