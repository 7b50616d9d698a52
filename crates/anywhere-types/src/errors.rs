//! Error types for credential operations.

use thiserror::Error;

/// Maximum number of response body bytes quoted in an error message.
pub const BODY_PREFIX_LIMIT: usize = 256;

/// The main error type for credential operations.
///
/// Variants are grouped by kind: input shape, crypto, transport, protocol and
/// configuration. Network-related variants always carry the request method and
/// URL, and any quoted response body is bounded by [`BODY_PREFIX_LIMIT`].
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Input contains no decodable PEM block
    #[error("Invalid PEM: {0}")]
    PemInvalid(String),

    /// First PEM block does not carry the expected label
    #[error("Unexpected PEM block type: expected \"{expected}\", got \"{actual}\"")]
    PemTypeMismatch {
        /// Label the caller asked for
        expected: String,
        /// Label found in the input
        actual: String,
    },

    /// Input contains no PEM blocks at all
    #[error("No PEM blocks found")]
    NoPemBlocks,

    /// Credential bundle does not hold exactly a certificate and a key
    #[error("Invalid credential bundle: expected 2, got {0} PEM blocks")]
    BundleShape(usize),

    /// Sealed value is not `<fingerprint>.<ciphertext>`
    #[error("Invalid sealed value: expected <fingerprint>.<hex ciphertext>")]
    SealedShape,

    /// Ciphertext is not valid hex
    #[error("Invalid hex in sealed value: {0}")]
    HexInvalid(String),

    /// RSA key generation failed
    #[error("Failed to generate RSA key: {0}")]
    KeyGenFailed(String),

    /// Certificate signing request could not be built
    #[error("Failed to build certificate request: {0}")]
    CsrFailed(String),

    /// Certificate and private key in a bundle cannot be used together
    #[error("Invalid credential bundle key pair: {0}")]
    BundleKeyPairInvalid(String),

    /// Plaintext exceeds the RSA-OAEP message limit for the key
    #[error("Plaintext too long: {len} bytes exceeds the {max} byte limit for this key")]
    PlaintextTooLong {
        /// Plaintext length in bytes
        len: usize,
        /// Largest accepted plaintext in bytes
        max: usize,
    },

    /// RSA-OAEP encryption failed for a reason other than length
    #[error("RSA-OAEP encryption failed: {0}")]
    OaepEncryptFailed(String),

    /// RSA-OAEP decryption failed
    #[error("RSA-OAEP decryption failed: {0}")]
    OaepDecryptFailed(String),

    /// Sealed value was encrypted for a different key
    #[error("Sealed value was encrypted for key {prefix}, but the private key fingerprint is {actual}")]
    KeyMismatch {
        /// Fingerprint prefix found in the sealed value
        prefix: String,
        /// Fingerprint of the supplied private key
        actual: String,
    },

    /// Request could not be sent or its response could not be read
    #[error("{method} {url} failed: {cause}")]
    HttpTransport {
        /// HTTP method
        method: String,
        /// Request URL
        url: String,
        /// Underlying transport error
        cause: String,
    },

    /// Server answered with a status other than 200
    #[error("{method} {url} returned {status}: {body}")]
    HttpStatus {
        /// HTTP method
        method: String,
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Bounded prefix of the response body
        body: String,
    },

    /// Signing endpoint answered 200 without a certificate
    #[error("Certificate signing via {url} returned no CERTIFICATE PEM block: {body}")]
    SigningResponseInvalid {
        /// Signing endpoint URL
        url: String,
        /// Bounded prefix of the response body
        body: String,
    },

    /// Key endpoint answered 200 without a usable RSA public key
    #[error("Public key from {url} is invalid ({reason}): {body}")]
    PublicKeyResponseInvalid {
        /// Key endpoint URL
        url: String,
        /// Why the key was rejected
        reason: String,
        /// Bounded prefix of the response body
        body: String,
    },

    /// CA bundle contains no parseable certificate
    #[error("No CA certificates found in the supplied bundle")]
    NoCaCertificatesFound,

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A specialized Result type for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Render at most [`BODY_PREFIX_LIMIT`] bytes of a response body for diagnostics.
///
/// Invalid UTF-8 is replaced and an ellipsis marks truncation.
pub fn body_prefix(body: &[u8]) -> String {
    if body.len() <= BODY_PREFIX_LIMIT {
        return String::from_utf8_lossy(body).trim().to_string();
    }

    let text = String::from_utf8_lossy(&body[..BODY_PREFIX_LIMIT]);
    format!("{}...", text.trim_end_matches('\u{FFFD}').trim())
}
