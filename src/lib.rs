//! Speclink - authenticated transport and conversation streaming for the
//! feature-specification API.
//!
//! - [`auth::AuthTransport`] attaches credentials to every request and runs a
//!   single-flight refresh when the server answers 401.
//! - [`conversation::ConversationClient`] streams an assistant reply through
//!   [`stream::StreamSession`], folding `event:`/`data:` frames into an
//!   observable [`stream::ConversationStreamState`].
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod sse;
pub mod stream;
pub mod traits;
