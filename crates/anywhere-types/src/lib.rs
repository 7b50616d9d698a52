//! # Anywhere Types
//!
//! Core types and error definitions shared across the Anywhere credential
//! crates.
//!
//! This crate provides:
//!
//! - The [`CredentialError`] taxonomy and its [`Result`] alias
//! - A validated [`EnvName`] used as the certificate common name
//! - [`HttpSettings`] carrying the transport timeouts
//!
//! ## Example
//!
//! ```
//! use anywhere_types::EnvName;
//!
//! let env = EnvName::new("env-1").unwrap();
//! assert_eq!(env.as_str(), "env-1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod identifiers;
pub mod config;

// Re-export common types for convenience
pub use errors::{body_prefix, CredentialError, Result};
pub use identifiers::EnvName;
pub use config::HttpSettings;
