//! Logging setup.
//!
//! Library code only emits `tracing` events; binaries call one of these
//! initializers once at startup.

use anywhere_types::{CredentialError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "anywhere=info";

/// Initialize logging from `RUST_LOG`, falling back to [`DEFAULT_DIRECTIVES`].
pub fn init_default() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    install(filter)
}

/// Initialize logging with explicit filter directives, ignoring `RUST_LOG`.
pub fn init_with_directives(directives: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directives)
        .map_err(|e| CredentialError::Config(format!("Invalid log filter '{}': {}", directives, e)))?;
    install(filter)
}

fn install(filter: EnvFilter) -> Result<()> {
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CredentialError::Config(format!("Failed to initialize logging: {}", e)))
}
