//! Concrete implementations of trait abstractions.
//!
//! This module provides the production adapters behind the traits defined in
//! `crate::traits`, so the coordinator and stream sessions can be tested
//! against in-memory doubles.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`FileCredentialsProvider`] - File-based credentials storage
//! - [`BrowserLoginRedirect`] - Opens the login page when the session expires
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable, request-aware HTTP responses
//! - [`mock::InMemoryCredentials`] - In-memory credential storage with call counters

pub mod browser;
pub mod file_credentials;
pub mod mock;
pub mod reqwest_http;

pub use browser::BrowserLoginRedirect;
pub use file_credentials::FileCredentialsProvider;
pub use mock::{InMemoryCredentials, MockHttpClient};
pub use reqwest_http::ReqwestHttpClient;
