//! Credentials provider trait abstraction.
//!
//! The store only guarantees atomic replacement of the whole pair; every
//! decision about when to read or replace it lives in the coordinator.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::CredentialPair;

/// Credentials operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    /// Failed to load credentials
    #[error("Failed to load credentials: {0}")]
    LoadFailed(String),
    /// Failed to save credentials
    #[error("Failed to save credentials: {0}")]
    SaveFailed(String),
    /// Failed to clear credentials
    #[error("Failed to clear credentials: {0}")]
    ClearFailed(String),
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for credentials storage and retrieval.
///
/// Implementations include the production file-based storage and the
/// in-memory provider used in tests.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Load the stored pair.
    ///
    /// # Returns
    /// - `Ok(Some(pair))` when logged in
    /// - `Ok(None)` when no pair is stored
    /// - `Err(error)` if the storage could not be read
    async fn load(&self) -> Result<Option<CredentialPair>, CredentialsError>;

    /// Replace the stored pair.
    async fn save(&self, pair: &CredentialPair) -> Result<(), CredentialsError>;

    /// Remove the stored pair. Clearing an empty store succeeds.
    async fn clear(&self) -> Result<(), CredentialsError>;
}
