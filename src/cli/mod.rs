//! CLI module for speclink.
//!
//! The binary parses its arguments here and then drives the library:
//!
//! ```ignore
//! use speclink::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args()) {
//!     CliCommand::Stream { feature_id, message } => { /* ... */ }
//!     _ => {}
//! }
//! ```

pub mod args;

pub use args::{parse_args, CliCommand, USAGE};
