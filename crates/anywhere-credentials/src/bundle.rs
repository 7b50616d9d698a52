//! Client credential bundles: an issued certificate followed by its private key.

use crate::pem_codec;
use anywhere_types::{CredentialError, Result};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_parser::parse_x509_certificate;

/// Number of PEM blocks in a well-formed bundle.
pub const BUNDLE_BLOCKS: usize = 2;

/// Certificate and private key PEM as returned by the issuer.
///
/// The composed form (certificate first, then key) is what the sealer expects
/// back as its client identity.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    certificate_pem: String,
    private_key_pem: String,
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("certificate_pem", &self.certificate_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

impl CredentialBundle {
    /// Pair a certificate PEM with its private key PEM.
    pub fn new(certificate_pem: impl Into<String>, private_key_pem: impl Into<String>) -> Self {
        Self {
            certificate_pem: certificate_pem.into(),
            private_key_pem: private_key_pem.into(),
        }
    }

    /// Certificate PEM as returned by the signing endpoint.
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// PKCS#1 private key PEM.
    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// Certificate and key joined by a newline, certificate first.
    pub fn compose(&self) -> String {
        format!("{}\n{}", self.certificate_pem, self.private_key_pem)
    }

    /// Split into `(certificate_pem, private_key_pem)`.
    pub fn into_parts(self) -> (String, String) {
        (self.certificate_pem, self.private_key_pem)
    }
}

/// A bundle that has been parsed and whose key pair has been checked.
pub struct ClientIdentity {
    certificate_der: Vec<u8>,
    private_key: RsaPrivateKey,
    pem: String,
}

impl ClientIdentity {
    /// Parse a composed bundle and check that its key matches its certificate.
    ///
    /// Fails with [`CredentialError::BundleShape`] unless the input holds
    /// exactly two PEM blocks, and with
    /// [`CredentialError::BundleKeyPairInvalid`] if the blocks are not a
    /// certificate and its RSA private key.
    pub fn from_pem(bundle_pem: &str) -> Result<Self> {
        let blocks = match pem_codec::split_all_blocks(bundle_pem.as_bytes()) {
            Ok(blocks) => blocks,
            Err(CredentialError::NoPemBlocks) => return Err(CredentialError::BundleShape(0)),
            Err(e) => return Err(e),
        };

        if blocks.len() != BUNDLE_BLOCKS {
            return Err(CredentialError::BundleShape(blocks.len()));
        }

        let (cert_block, key_block) = (&blocks[0], &blocks[1]);

        if cert_block.tag() != pem_codec::CERTIFICATE {
            return Err(CredentialError::BundleKeyPairInvalid(format!(
                "first block must be a {}, got {}",
                pem_codec::CERTIFICATE,
                cert_block.tag()
            )));
        }

        let private_key = pem_codec::rsa_private_key_from_block(key_block)
            .map_err(|e| CredentialError::BundleKeyPairInvalid(format!("second block: {}", e)))?;

        let certificate_public_key = certificate_rsa_public_key(cert_block.contents())?;
        if certificate_public_key != private_key.to_public_key() {
            return Err(CredentialError::BundleKeyPairInvalid(
                "private key does not match certificate public key".to_string(),
            ));
        }

        let pem = format!(
            "{}{}",
            pem_codec::encode_block(cert_block),
            pem_codec::encode_block(key_block)
        );

        Ok(Self {
            certificate_der: cert_block.contents().to_vec(),
            private_key,
            pem,
        })
    }

    /// Leaf certificate DER.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// Private key of the identity.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Subject common name of the leaf certificate, if present.
    pub fn common_name(&self) -> Option<String> {
        let (_, cert) = parse_x509_certificate(&self.certificate_der).ok()?;
        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .map(str::to_string);
        common_name
    }

    /// TLS client identity carrying the leaf certificate and key.
    pub fn to_reqwest_identity(&self) -> Result<reqwest::Identity> {
        reqwest::Identity::from_pem(self.pem.as_bytes())
            .map_err(|e| CredentialError::BundleKeyPairInvalid(format!("Unusable TLS identity: {}", e)))
    }
}

/// Extract the RSA subject public key of a DER certificate.
pub fn certificate_rsa_public_key(der: &[u8]) -> Result<RsaPublicKey> {
    let (_, cert) = parse_x509_certificate(der)
        .map_err(|e| CredentialError::BundleKeyPairInvalid(format!("Invalid certificate: {}", e)))?;

    let spki = cert.public_key();
    RsaPublicKey::from_pkcs1_der(&spki.subject_public_key.data).map_err(|e| {
        CredentialError::BundleKeyPairInvalid(format!("Certificate does not hold an RSA public key: {}", e))
    })
}
