//! Credential pair and its durable storage.
//!
//! The pair is persisted as one JSON document at
//! `~/.speclink/credentials.json` (overridable). Absence of the document
//! means logged out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::traits::CredentialsError;

/// The credentials directory name.
const CREDENTIALS_DIR: &str = ".speclink";

/// The credentials file name; the single durable key of the store.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Access/refresh credential pair.
///
/// Both tokens are always present together; the logged-out state is the
/// absence of a pair, never a half-filled one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never end up in logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// On-disk document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredentials {
    #[serde(flatten)]
    pair: CredentialPair,
    saved_at: DateTime<Utc>,
}

/// Manages credential storage and retrieval on disk.
#[derive(Debug, Clone)]
pub struct CredentialsManager {
    /// Path to the credentials file.
    credentials_path: PathBuf,
}

impl CredentialsManager {
    /// Create a manager for the default location under the home directory.
    ///
    /// Returns `None` if the home directory cannot be determined.
    pub fn new() -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self::with_path(
            home.join(CREDENTIALS_DIR).join(CREDENTIALS_FILE),
        ))
    }

    /// Create a manager for an explicit file path.
    pub fn with_path(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
        }
    }

    /// Get the path to the credentials file.
    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    /// Load the stored pair.
    ///
    /// A missing file is the logged-out state. A file that cannot be parsed
    /// is treated the same way, since a half-written or foreign document
    /// cannot be used to authenticate.
    pub fn load(&self) -> Result<Option<CredentialPair>, CredentialsError> {
        let file = match File::open(&self.credentials_path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CredentialsError::LoadFailed(e.to_string())),
        };

        match serde_json::from_reader::<_, StoredCredentials>(BufReader::new(file)) {
            Ok(stored) => Ok(Some(stored.pair)),
            Err(e) => {
                tracing::warn!(
                    path = %self.credentials_path.display(),
                    error = %e,
                    "Ignoring unreadable credentials file"
                );
                Ok(None)
            }
        }
    }

    /// Replace the stored pair.
    ///
    /// Writes a sibling temp file and renames it over the target so readers
    /// never observe a partially written pair.
    pub fn save(&self, pair: &CredentialPair) -> Result<(), CredentialsError> {
        if let Some(parent) = self.credentials_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CredentialsError::SaveFailed(e.to_string()))?;
            }
        }

        let stored = StoredCredentials {
            pair: pair.clone(),
            saved_at: Utc::now(),
        };

        let tmp_path = self.credentials_path.with_extension("json.tmp");
        let file =
            File::create(&tmp_path).map_err(|e| CredentialsError::SaveFailed(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &stored)
            .map_err(|e| CredentialsError::Serialization(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| CredentialsError::SaveFailed(e.to_string()))?;
        drop(writer);

        fs::rename(&tmp_path, &self.credentials_path)
            .map_err(|e| CredentialsError::SaveFailed(e.to_string()))
    }

    /// Remove the stored pair. Succeeds if there was nothing to remove.
    pub fn clear(&self) -> Result<(), CredentialsError> {
        match fs::remove_file(&self.credentials_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialsError::ClearFailed(e.to_string())),
        }
    }
}
