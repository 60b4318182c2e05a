//! Mock implementations for testing.
//!
//! These doubles let the coordinator and stream sessions run without network
//! access or file system access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable or computed responses
//! - [`InMemoryCredentials`] - In-memory credential storage

pub mod credentials;
pub mod http;

pub use credentials::InMemoryCredentials;
pub use http::{MockHttpClient, MockResponse, RecordedRequest};
