//! Type-safe identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{CredentialError, Result};

/// Upper bound for an X.509 common name (RFC 5280 `ub-common-name`).
pub const MAX_ENV_NAME_LEN: usize = 64;

/// A validated environment name.
///
/// The name becomes the subject common name of the environment's client
/// certificate, so it must:
/// - Be non-empty and not only whitespace
/// - Contain no control characters
/// - Be at most 64 bytes long
///
/// # Example
///
/// ```
/// use anywhere_types::EnvName;
///
/// let env = EnvName::new("env-1").unwrap();
/// assert_eq!(env.as_str(), "env-1");
///
/// // Invalid names are rejected
/// assert!(EnvName::new("").is_err());
/// assert!(EnvName::new("bad\nname").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvName(String);

impl EnvName {
    /// Create a new validated environment name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be used as a certificate common name.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if !Self::is_valid(name) {
            return Err(CredentialError::Validation(format!(
                "Invalid environment name '{}': must be 1 to {} bytes with no control characters",
                name.escape_debug(),
                MAX_ENV_NAME_LEN
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Check if a name is valid without allocating.
    pub fn is_valid(name: &str) -> bool {
        !name.trim().is_empty()
            && name.len() <= MAX_ENV_NAME_LEN
            && !name.chars().any(char::is_control)
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EnvName {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EnvName {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EnvName> for String {
    fn from(value: EnvName) -> Self {
        value.0
    }
}
