//! Typed PEM encoding and decoding.
//!
//! Every decode names the block label it expects so that a certificate is
//! never mistaken for a key and vice versa.

use anywhere_types::{CredentialError, Result};
use pem::{EncodeConfig, LineEnding, Pem};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_parser::parse_x509_certificate;

/// X.509 certificate label.
pub const CERTIFICATE: &str = "CERTIFICATE";
/// PKCS#10 certificate signing request label.
pub const CERTIFICATE_REQUEST: &str = "CERTIFICATE REQUEST";
/// PKCS#1 RSA private key label.
pub const RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";
/// PKCS#1 RSA public key label.
pub const RSA_PUBLIC_KEY: &str = "RSA PUBLIC KEY";
/// PKCS#8 private key label.
pub const PRIVATE_KEY: &str = "PRIVATE KEY";

fn config() -> EncodeConfig {
    EncodeConfig::new().set_line_ending(LineEnding::LF)
}

/// Encode DER bytes as a single PEM block with the given label.
pub fn encode(der: &[u8], label: &str) -> String {
    pem::encode_config(&Pem::new(label, der.to_vec()), config())
}

/// Re-encode an already parsed block.
pub fn encode_block(block: &Pem) -> String {
    pem::encode_config(block, config())
}

/// Decode the first PEM block in `data`, requiring its label to be `expected`.
///
/// Text before the first block is skipped.
pub fn decode(data: &[u8], expected: &str) -> Result<Vec<u8>> {
    let block = pem::parse(data).map_err(|e| {
        CredentialError::PemInvalid(format!("expected a \"{}\" block: {}", expected, e))
    })?;

    if block.tag() != expected {
        return Err(CredentialError::PemTypeMismatch {
            expected: expected.to_string(),
            actual: block.tag().to_string(),
        });
    }

    Ok(block.into_contents())
}

/// Return every PEM block in `data`, in input order.
pub fn split_all_blocks(data: &[u8]) -> Result<Vec<Pem>> {
    let blocks = pem::parse_many(data)
        .map_err(|e| CredentialError::PemInvalid(e.to_string()))?;

    if blocks.is_empty() {
        return Err(CredentialError::NoPemBlocks);
    }

    Ok(blocks)
}

/// Encode a private key as a PKCS#1 `RSA PRIVATE KEY` block.
pub fn encode_rsa_private_key(key: &RsaPrivateKey) -> Result<String> {
    let der = key
        .to_pkcs1_der()
        .map_err(|e| CredentialError::KeyGenFailed(format!("Failed to encode private key: {}", e)))?;
    Ok(encode(der.as_bytes(), RSA_PRIVATE_KEY))
}

/// Encode a public key as a PKCS#1 `RSA PUBLIC KEY` block.
pub fn encode_rsa_public_key(key: &RsaPublicKey) -> Result<String> {
    let der = key
        .to_pkcs1_der()
        .map_err(|e| CredentialError::PemInvalid(format!("Failed to encode public key: {}", e)))?;
    Ok(encode(der.as_bytes(), RSA_PUBLIC_KEY))
}

/// Decode an `RSA PUBLIC KEY` block holding a PKCS#1 public key.
pub fn decode_rsa_public_key(data: &[u8]) -> Result<RsaPublicKey> {
    let der = decode(data, RSA_PUBLIC_KEY)?;
    RsaPublicKey::from_pkcs1_der(&der)
        .map_err(|e| CredentialError::PemInvalid(format!("Invalid PKCS#1 public key: {}", e)))
}

/// Decode the first block of `data` as an RSA private key.
///
/// Accepts PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) encodings.
pub fn decode_rsa_private_key(data: &[u8]) -> Result<RsaPrivateKey> {
    let block = pem::parse(data)
        .map_err(|e| CredentialError::PemInvalid(format!("expected a private key block: {}", e)))?;
    rsa_private_key_from_block(&block)
}

/// Parse an already split block as an RSA private key.
pub fn rsa_private_key_from_block(block: &Pem) -> Result<RsaPrivateKey> {
    match block.tag() {
        RSA_PRIVATE_KEY => RsaPrivateKey::from_pkcs1_der(block.contents())
            .map_err(|e| CredentialError::PemInvalid(format!("Invalid PKCS#1 private key: {}", e))),
        PRIVATE_KEY => RsaPrivateKey::from_pkcs8_der(block.contents())
            .map_err(|e| CredentialError::PemInvalid(format!("Invalid PKCS#8 RSA private key: {}", e))),
        other => Err(CredentialError::PemTypeMismatch {
            expected: RSA_PRIVATE_KEY.to_string(),
            actual: other.to_string(),
        }),
    }
}

/// Decode a `CERTIFICATE` block and check that it holds a parseable X.509 certificate.
///
/// Returns the DER bytes.
pub fn decode_certificate(data: &[u8]) -> Result<Vec<u8>> {
    let der = decode(data, CERTIFICATE)?;
    check_certificate_der(&der)?;
    Ok(der)
}

/// Check that `der` parses as an X.509 certificate.
pub fn check_certificate_der(der: &[u8]) -> Result<()> {
    parse_x509_certificate(der)
        .map(|_| ())
        .map_err(|e| CredentialError::PemInvalid(format!("Invalid X.509 certificate: {}", e)))
}
