//! Public key fingerprints.
//!
//! A fingerprint is the lowercase hex MD5 digest of the PKCS#1 DER encoding of
//! an RSA public key. It only identifies which key sealed a value; MD5
//! collisions have no bearing on the confidentiality of sealed data, which
//! rests on RSA-OAEP.

use anywhere_types::{CredentialError, Result};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::RsaPublicKey;
use std::fmt;
use std::str::FromStr;

/// Length of a rendered fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 32;

/// Identifier of an RSA public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    /// Fingerprint a public key.
    pub fn of(key: &RsaPublicKey) -> Result<Self> {
        let der = key
            .to_pkcs1_der()
            .map_err(|e| CredentialError::Validation(format!("Failed to encode public key: {}", e)))?;
        Ok(Self::of_pkcs1_der(der.as_bytes()))
    }

    /// Fingerprint an already PKCS#1-encoded public key.
    pub fn of_pkcs1_der(der: &[u8]) -> Self {
        Self(format!("{:x}", md5::compute(der)))
    }

    /// Check that `s` has the shape of a rendered fingerprint.
    pub fn is_valid(s: &str) -> bool {
        s.len() == FINGERPRINT_HEX_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Get the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeyFingerprint {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        if !Self::is_valid(s) {
            return Err(CredentialError::SealedShape);
        }
        Ok(Self(s.to_string()))
    }
}
