//! Error handling for the transport layer.
//!
//! - **Error Categories**: classification for retry and display decisions
//! - **Domain-specific Errors**: `AuthError`, `StreamError`
//! - **Unified Error Type**: `TransportError` consolidates them with the
//!   trait-level `HttpError` and `CredentialsError`
//!
//! | Situation | Surface |
//! |-----------|---------|
//! | Expired access token | recovered by one refresh and replay, never surfaced |
//! | Refresh failure | `TransportError::Auth` for every queued request, session cleared |
//! | 401 after replay | the second response is returned unmodified |
//! | Malformed stream frame | dropped and logged, stream continues |
//! | Server `error` frame | stream ends `Failed` with `StreamError::Server` |
//! | User cancellation | stream ends `Cancelled`, not an error |

mod auth;
mod category;
mod stream;
mod transport;

pub use auth::AuthError;
pub use category::ErrorCategory;
pub use stream::StreamError;
pub use transport::{TransportError, TransportResult};
