//! # Anywhere Core
//!
//! Configuration resolution and logging for the Anywhere credential tools.
//!
//! This crate provides:
//!
//! - **Configuration**: layered resolution of the control plane URL, API token
//!   and CA bundle from explicit values, environment variables and a YAML file
//! - **Logging**: `tracing` subscriber setup
//!
//! ## Example
//!
//! ```no_run
//! use anywhere_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_default_file()?
//!     .with_env()
//!     .resolve()?;
//! println!("control plane: {}", config.api_url);
//! # Ok::<(), anywhere_core::CredentialError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;

// Re-export commonly used items
pub use config::{ApiConfig, ConfigLayer, ConfigLoader, ConfigValues};
pub use anywhere_types::{CredentialError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "anywhere";
