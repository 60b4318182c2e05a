//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP operations, buffered and streaming
//! - [`CredentialsProvider`] - Credential pair storage and retrieval
//! - [`SessionExpiredHandler`] - Hand-off when a session cannot be renewed
//! - [`CacheInvalidator`] - Hand-off when a conversation completes

pub mod credentials;
pub mod hooks;
pub mod http;

pub use credentials::{CredentialsError, CredentialsProvider};
pub use hooks::{
    CacheInvalidator, LogSessionExpired, NoopInvalidator, SessionExpiredHandler,
};
pub use http::{
    ByteStream, Headers, HttpClient, HttpError, Method, RequestSpec, Response, AUTHORIZATION,
};
