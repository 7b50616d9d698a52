//! Secret sealing under the control plane's public key.
//!
//! Each call presents the caller's credential bundle over mutual TLS, fetches
//! the current public key and encrypts the value with RSA-OAEP (SHA-256, no
//! label). The result is tagged with the key's fingerprint so the control
//! plane knows which private key opens it.

use crate::bundle::ClientIdentity;
use crate::fingerprint::KeyFingerprint;
use crate::http;
use crate::pem_codec;
use crate::roots::RootCaPool;
use crate::sealed::SealedValue;
use anywhere_core::ApiConfig;
use anywhere_types::{body_prefix, CredentialError, HttpSettings, Result};
use rand::rngs::OsRng;
use reqwest::header::HeaderMap;
use reqwest::Method;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use tracing::{debug, info, instrument};
use url::Url;

/// Path of the public key endpoint below the API URL.
pub const KEY_PATH: &str = "key";

/// SHA-256 output size, which fixes the OAEP overhead.
const OAEP_HASH_LEN: usize = 32;

/// Largest plaintext RSA-OAEP/SHA-256 accepts for `key`.
///
/// 190 bytes for a 2048-bit key, 446 bytes for a 4096-bit key.
pub fn max_plaintext_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(2 * OAEP_HASH_LEN + 2)
}

/// Seals secret values for the control plane.
///
/// Holds only read-only configuration. The client identity is a per-call
/// input, so every call builds its own HTTP client and no TLS session is
/// shared between different bundles.
#[derive(Debug, Clone)]
pub struct Sealer {
    key_url: Url,
    roots: Option<RootCaPool>,
    settings: HttpSettings,
}

impl Sealer {
    /// Create a sealer for `api_url`.
    pub fn new(api_url: &Url, roots: Option<RootCaPool>, settings: HttpSettings) -> Result<Self> {
        Ok(Self {
            key_url: http::endpoint(api_url, KEY_PATH)?,
            roots,
            settings,
        })
    }

    /// Create a sealer from a resolved configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let roots = RootCaPool::from_config(config)?;
        Self::new(&config.api_url, roots, config.http)
    }

    /// URL the public key is fetched from.
    pub fn key_url(&self) -> &Url {
        &self.key_url
    }

    /// Fetch the control plane public key using `bundle_pem` as the TLS client identity.
    #[instrument(skip_all, fields(key_url = %self.key_url))]
    pub async fn fetch_public_key(&self, bundle_pem: &str) -> Result<RsaPublicKey> {
        let identity = ClientIdentity::from_pem(bundle_pem)?;
        debug!(common_name = ?identity.common_name(), "loaded client identity");

        let client = http::client_builder(&self.settings, self.roots.as_ref())
            .identity(identity.to_reqwest_identity()?)
            .build()
            .map_err(|e| CredentialError::BundleKeyPairInvalid(format!("Failed to create mTLS client: {}", e)))?;

        let body = http::execute(&client, Method::GET, &self.key_url, HeaderMap::new(), None).await?;

        pem_codec::decode_rsa_public_key(&body).map_err(|e| CredentialError::PublicKeyResponseInvalid {
            url: self.key_url.to_string(),
            reason: e.to_string(),
            body: body_prefix(&body),
        })
    }

    /// Seal `plaintext` for the control plane, authenticating with `bundle_pem`.
    ///
    /// A failed key fetch is returned as an error; nothing is sealed.
    pub async fn seal_secret(&self, bundle_pem: &str, plaintext: &[u8]) -> Result<SealedValue> {
        let key = self.fetch_public_key(bundle_pem).await?;
        let sealed = seal_with_key(&key, plaintext)?;
        info!(fingerprint = %sealed.fingerprint(), "sealed secret value");
        Ok(sealed)
    }
}

/// Encrypt `plaintext` under `key` with RSA-OAEP/SHA-256 and tag it with the key fingerprint.
pub fn seal_with_key(key: &RsaPublicKey, plaintext: &[u8]) -> Result<SealedValue> {
    let max = max_plaintext_len(key);
    if plaintext.len() > max {
        return Err(CredentialError::PlaintextTooLong {
            len: plaintext.len(),
            max,
        });
    }

    let fingerprint = KeyFingerprint::of(key)?;
    let ciphertext = key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| match e {
            rsa::Error::MessageTooLong => CredentialError::PlaintextTooLong {
                len: plaintext.len(),
                max,
            },
            other => CredentialError::OaepEncryptFailed(other.to_string()),
        })?;

    Ok(SealedValue::new(fingerprint, ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::CredentialBundle;
    use crate::testutil;
    use regex::Regex;
    use rsa::RsaPrivateKey;
    use std::sync::OnceLock;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEALED_PATTERN: &str = r"^[0-9a-f]{32}\.[0-9a-f]+$";

    /// The control plane's key pair; distinct from the client bundle key.
    fn control_plane_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(testutil::generate_key)
    }

    fn client_bundle() -> String {
        let (cert, key) = testutil::self_signed_bundle("env-1");
        CredentialBundle::new(cert, key).compose()
    }

    fn sealer_for(server: &MockServer) -> Sealer {
        let url = Url::parse(&server.uri()).unwrap();
        Sealer::new(&url, None, HttpSettings::default()).unwrap()
    }

    async fn mount_key(server: &MockServer, body: String, status: u16) {
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    fn decrypt(sealed: &SealedValue) -> Vec<u8> {
        control_plane_key()
            .decrypt(Oaep::new::<Sha256>(), sealed.ciphertext())
            .unwrap()
    }

    #[test]
    fn test_max_plaintext_len() {
        let public = control_plane_key().to_public_key();
        assert_eq!(public.size(), 256);
        assert_eq!(max_plaintext_len(&public), 190);
    }

    #[test]
    fn test_seal_with_key_format() {
        let public = control_plane_key().to_public_key();
        let sealed = seal_with_key(&public, b"value").unwrap();

        let rendered = sealed.to_string();
        assert!(Regex::new(SEALED_PATTERN).unwrap().is_match(&rendered));
        assert_eq!(sealed.fingerprint(), &KeyFingerprint::of(&public).unwrap());
        assert_eq!(sealed.ciphertext().len(), public.size());
        assert_eq!(decrypt(&sealed), b"value");
    }

    #[test]
    fn test_seal_is_randomized() {
        let public = control_plane_key().to_public_key();
        let a = seal_with_key(&public, b"value").unwrap();
        let b = seal_with_key(&public, b"value").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn test_seal_limits() {
        let public = control_plane_key().to_public_key();
        assert!(seal_with_key(&public, &[7u8; 190]).is_ok());
        assert!(seal_with_key(&public, b"").is_ok());
        match seal_with_key(&public, &[7u8; 191]) {
            Err(CredentialError::PlaintextTooLong { len, max }) => {
                assert_eq!(len, 191);
                assert_eq!(max, 190);
            }
            other => panic!("expected plaintext too long, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_seal_happy_path() {
        let server = MockServer::start().await;
        let public = control_plane_key().to_public_key();
        mount_key(&server, pem_codec::encode_rsa_public_key(&public).unwrap(), 200).await;

        let sealed = sealer_for(&server)
            .seal_secret(&client_bundle(), b"value")
            .await
            .unwrap();

        let expected_fp = KeyFingerprint::of(&public).unwrap();
        let rendered = sealed.to_string();
        assert!(rendered.starts_with(&format!("{}.", expected_fp)));
        assert!(Regex::new(SEALED_PATTERN).unwrap().is_match(&rendered));
        assert_eq!(decrypt(&sealed), b"value");
    }

    #[tokio::test]
    async fn test_seal_malformed_bundle() {
        let server = MockServer::start().await;
        let (cert, _) = testutil::self_signed_bundle("env-1");

        let err = sealer_for(&server).seal_secret(&cert, b"value").await.unwrap_err();
        assert!(matches!(err, CredentialError::BundleShape(1)));
        assert!(err.to_string().contains("expected 2, got 1"));

        // No request is made for an unusable bundle.
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seal_key_endpoint_error_is_surfaced() {
        let server = MockServer::start().await;
        mount_key(&server, "certificate revoked".to_string(), 401).await;

        let bundle = client_bundle();
        match sealer_for(&server).seal_secret(&bundle, b"value").await {
            Err(CredentialError::HttpStatus { method, url, status, body }) => {
                assert_eq!(method, "GET");
                assert!(url.ends_with("/key"));
                assert_eq!(status, 401);
                assert_eq!(body, "certificate revoked");
            }
            other => panic!("expected status error, got {:?}", other.map(|s| s.to_string())),
        }
    }

    #[tokio::test]
    async fn test_seal_invalid_public_key_response() {
        let server = MockServer::start().await;
        let (cert, _) = testutil::self_signed_bundle("not-a-key");
        mount_key(&server, cert, 200).await;

        let result = sealer_for(&server).seal_secret(&client_bundle(), b"value").await;
        assert!(matches!(result, Err(CredentialError::PublicKeyResponseInvalid { .. })));

        let server = MockServer::start().await;
        mount_key(&server, "garbage".to_string(), 200).await;
        let result = sealer_for(&server).seal_secret(&client_bundle(), b"value").await;
        assert!(matches!(result, Err(CredentialError::PublicKeyResponseInvalid { .. })));
    }

    #[tokio::test]
    async fn test_seal_over_mutual_tls() {
        let ca = testutil::TestCa::new();
        let public = control_plane_key().to_public_key();
        let server = testutil::MtlsServer::start(&ca, pem_codec::encode_rsa_public_key(&public).unwrap()).await;
        let bundle = ca.client_bundle("env-1");

        let roots = RootCaPool::load(&ca.cert_pem()).unwrap();
        let sealer = Sealer::new(&server.url(), Some(roots), HttpSettings::default()).unwrap();
        let sealed = sealer.seal_secret(&bundle, b"value").await.unwrap();

        assert_eq!(sealed.fingerprint(), &KeyFingerprint::of(&public).unwrap());
        assert_eq!(decrypt(&sealed), b"value");
        assert_eq!(server.authenticated_handshakes(), 1);
    }

    #[tokio::test]
    async fn test_seal_without_pool_rejects_private_ca() {
        let ca = testutil::TestCa::new();
        let public = control_plane_key().to_public_key();
        let server = testutil::MtlsServer::start(&ca, pem_codec::encode_rsa_public_key(&public).unwrap()).await;

        let sealer = Sealer::new(&server.url(), None, HttpSettings::default()).unwrap();
        match sealer.seal_secret(&ca.client_bundle("env-1"), b"value").await {
            Err(CredentialError::HttpTransport { method, cause, .. }) => {
                assert_eq!(method, "GET");
                assert!(cause.contains("UnknownIssuer"), "unexpected cause: {}", cause);
            }
            other => panic!("expected transport error, got {:?}", other.map(|s| s.to_string())),
        }
        assert_eq!(server.authenticated_handshakes(), 0);
    }

    #[tokio::test]
    async fn test_seal_with_unrecognised_client_certificate() {
        let ca = testutil::TestCa::new();
        let public = control_plane_key().to_public_key();
        let server = testutil::MtlsServer::start(&ca, pem_codec::encode_rsa_public_key(&public).unwrap()).await;

        // Trusted server, but the client certificate was not issued by its CA.
        let roots = RootCaPool::load(&ca.cert_pem()).unwrap();
        let sealer = Sealer::new(&server.url(), Some(roots), HttpSettings::default()).unwrap();
        let result = sealer.seal_secret(&client_bundle(), b"value").await;

        assert!(matches!(result, Err(CredentialError::HttpTransport { .. })));
        assert_eq!(server.authenticated_handshakes(), 0);
    }

    #[tokio::test]
    async fn test_seal_too_long_after_fetch() {
        let server = MockServer::start().await;
        let public = control_plane_key().to_public_key();
        mount_key(&server, pem_codec::encode_rsa_public_key(&public).unwrap(), 200).await;

        let result = sealer_for(&server).seal_secret(&client_bundle(), &[1u8; 300]).await;
        assert!(matches!(result, Err(CredentialError::PlaintextTooLong { len: 300, max: 190 })));
    }
}
