//! File-based credentials provider adapter.
//!
//! This module provides a credentials provider implementation that uses
//! [`CredentialsManager`] for file-based storage.

use async_trait::async_trait;
use std::path::Path;

use crate::auth::{CredentialPair, CredentialsManager};
use crate::traits::{CredentialsError, CredentialsProvider};

/// File-based credentials provider.
///
/// Credentials are stored in `~/.speclink/credentials.json` unless a path is
/// configured. A missing or unreadable file reads as logged out.
///
/// # Example
///
/// ```ignore
/// use speclink::adapters::FileCredentialsProvider;
/// use speclink::traits::CredentialsProvider;
///
/// let provider = FileCredentialsProvider::new()?;
/// if let Some(pair) = provider.load().await? {
///     println!("Signed in");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialsProvider {
    manager: CredentialsManager,
}

impl FileCredentialsProvider {
    /// Create a provider at the default location.
    ///
    /// # Returns
    /// The provider, or an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, CredentialsError> {
        CredentialsManager::new()
            .map(Self::with_manager)
            .ok_or_else(|| {
                CredentialsError::LoadFailed("Failed to determine home directory".to_string())
            })
    }

    /// Create a provider over an existing manager.
    pub fn with_manager(manager: CredentialsManager) -> Self {
        Self { manager }
    }

    /// Get a reference to the underlying credentials manager.
    pub fn manager(&self) -> &CredentialsManager {
        &self.manager
    }

    /// Get the path to the credentials file.
    pub fn credentials_path(&self) -> &Path {
        self.manager.credentials_path()
    }
}

#[async_trait]
impl CredentialsProvider for FileCredentialsProvider {
    async fn load(&self) -> Result<Option<CredentialPair>, CredentialsError> {
        self.manager.load()
    }

    async fn save(&self, pair: &CredentialPair) -> Result<(), CredentialsError> {
        self.manager.save(pair)
    }

    async fn clear(&self) -> Result<(), CredentialsError> {
        self.manager.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider(dir: &TempDir) -> FileCredentialsProvider {
        FileCredentialsProvider::with_manager(CredentialsManager::with_path(
            dir.path().join("credentials.json"),
        ))
    }

    #[tokio::test]
    async fn test_round_trip_through_trait() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        assert!(provider.load().await.unwrap().is_none());
        provider.save(&CredentialPair::new("T1", "R1")).await.unwrap();
        assert_eq!(
            provider.load().await.unwrap(),
            Some(CredentialPair::new("T1", "R1"))
        );

        provider.clear().await.unwrap();
        assert!(provider.load().await.unwrap().is_none());
    }

    #[test]
    fn test_credentials_path() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);
        assert!(provider.credentials_path().ends_with("credentials.json"));
        assert_eq!(provider.manager().credentials_path(), provider.credentials_path());
    }
}
