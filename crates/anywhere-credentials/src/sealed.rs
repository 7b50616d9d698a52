//! The sealed value wire format: `<fingerprint>.<hex ciphertext>`.

use crate::fingerprint::KeyFingerprint;
use anywhere_types::{CredentialError, Result};
use std::fmt;
use std::str::FromStr;

/// Separator between the fingerprint and the ciphertext.
pub const SEPARATOR: char = '.';

/// An RSA-OAEP ciphertext tagged with the fingerprint of the sealing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedValue {
    fingerprint: KeyFingerprint,
    ciphertext: Vec<u8>,
}

impl SealedValue {
    /// Create a sealed value from its parts.
    pub fn new(fingerprint: KeyFingerprint, ciphertext: Vec<u8>) -> Self {
        Self {
            fingerprint,
            ciphertext,
        }
    }

    /// Fingerprint of the key the value was sealed for.
    pub fn fingerprint(&self) -> &KeyFingerprint {
        &self.fingerprint
    }

    /// Raw RSA-OAEP ciphertext.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

impl fmt::Display for SealedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.fingerprint, SEPARATOR, hex::encode(&self.ciphertext))
    }
}

/// Strict parse: exactly one separator, a well-formed fingerprint and a
/// non-empty lowercase hex ciphertext.
impl FromStr for SealedValue {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, cipher_hex) = s.split_once(SEPARATOR).ok_or(CredentialError::SealedShape)?;
        if cipher_hex.is_empty() || cipher_hex.contains(SEPARATOR) {
            return Err(CredentialError::SealedShape);
        }

        let fingerprint = prefix.parse::<KeyFingerprint>()?;

        if cipher_hex.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(CredentialError::HexInvalid("ciphertext must be lowercase hex".to_string()));
        }
        let ciphertext = hex::decode(cipher_hex)
            .map_err(|e| CredentialError::HexInvalid(e.to_string()))?;

        Ok(Self::new(fingerprint, ciphertext))
    }
}
