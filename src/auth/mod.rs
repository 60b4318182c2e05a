//! Authentication module.
//!
//! This module provides:
//! - Credential pair storage ([`CredentialsManager`])
//! - The refresh exchange ([`RefreshExecutor`], [`HttpRefreshExecutor`])
//! - The single-flight refresh episode ([`RefreshEpisode`])
//! - The request coordinator every authenticated call goes through ([`AuthTransport`])

pub mod coordinator;
pub mod credentials;
pub mod episode;
pub mod refresh;

pub use coordinator::AuthTransport;
pub use credentials::{CredentialPair, CredentialsManager};
pub use episode::{LeaderGuard, RefreshEpisode, RefreshOutcome, Ticket};
pub use refresh::{HttpRefreshExecutor, RefreshExecutor};
