//! Reverse of sealing, for holders of the control plane private key.

use crate::fingerprint::KeyFingerprint;
use crate::pem_codec;
use crate::sealed::SEPARATOR;
use anywhere_types::{CredentialError, Result};
use rsa::Oaep;
use sha2::Sha256;

/// Decrypt a sealed value with `private_key_pem`.
///
/// The fingerprint prefix is checked against the key before the ciphertext is
/// decoded, so a value sealed for another key reports
/// [`CredentialError::KeyMismatch`] even if its ciphertext is malformed.
pub fn unseal_secret(private_key_pem: &str, sealed: &str) -> Result<Vec<u8>> {
    let key = pem_codec::decode_rsa_private_key(private_key_pem.as_bytes())?;

    let (prefix, hex_cipher) = sealed
        .split_once(SEPARATOR)
        .ok_or(CredentialError::SealedShape)?;

    let actual = KeyFingerprint::of(&key.to_public_key())?;
    if prefix != actual.as_str() {
        return Err(CredentialError::KeyMismatch {
            prefix: prefix.to_string(),
            actual: actual.to_string(),
        });
    }

    let ciphertext = hex::decode(hex_cipher).map_err(|e| CredentialError::HexInvalid(e.to_string()))?;

    key.decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|e| CredentialError::OaepDecryptFailed(e.to_string()))
}
