//! Shared fixtures for unit tests.
//!
//! Keys are 2048-bit so the suite stays fast; the two cached keys are
//! generated once per test binary.

use crate::bundle::CredentialBundle;
use crate::issuer::build_csr_pem;
use crate::pem_codec;
use anywhere_types::EnvName;
use rand::rngs::OsRng;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateSigningRequest,
    DistinguishedName, DnType, IsCa, KeyPair, SanType, PKCS_RSA_SHA256,
};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

pub const TEST_KEY_BITS: usize = 2048;

static PRIMARY: OnceLock<RsaPrivateKey> = OnceLock::new();
static SECONDARY: OnceLock<RsaPrivateKey> = OnceLock::new();

pub fn generate_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS).unwrap()
}

/// Process-wide test key.
pub fn rsa_key() -> &'static RsaPrivateKey {
    PRIMARY.get_or_init(generate_key)
}

/// A second key, distinct from [`rsa_key`].
pub fn other_rsa_key() -> &'static RsaPrivateKey {
    SECONDARY.get_or_init(generate_key)
}

/// Self-signed certificate for `key`, returned as `(cert_pem, pkcs1_key_pem)`.
pub fn bundle_for(key: &RsaPrivateKey, common_name: &str) -> (String, String) {
    let pkcs8 = key.to_pkcs8_der().unwrap();
    let key_pair = KeyPair::from_der(pkcs8.as_bytes()).unwrap();

    let mut params = CertificateParams::default();
    params.alg = &PKCS_RSA_SHA256;
    params.key_pair = Some(key_pair);
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, common_name);

    let cert = Certificate::from_params(params).unwrap();
    let cert_pem = pem_codec::encode(&cert.serialize_der().unwrap(), pem_codec::CERTIFICATE);
    let key_pem = pem_codec::encode_rsa_private_key(key).unwrap();
    (cert_pem, key_pem)
}

/// Self-signed bundle over the shared test key.
pub fn self_signed_bundle(common_name: &str) -> (String, String) {
    bundle_for(rsa_key(), common_name)
}

/// Certificate authority that signs CSRs the way the control plane does.
pub struct TestCa {
    cert: Certificate,
}

impl TestCa {
    pub fn new() -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new());
        params.distinguished_name = DistinguishedName::new();
        params.distinguished_name.push(DnType::CommonName, "test control plane CA");
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        Self {
            cert: Certificate::from_params(params).unwrap(),
        }
    }

    pub fn sign_csr_pem(&self, csr_pem: &str) -> String {
        let csr = CertificateSigningRequest::from_pem(csr_pem).unwrap();
        csr.serialize_pem_with_signer(&self.cert).unwrap()
    }

    pub fn cert_pem(&self) -> String {
        self.cert.serialize_pem().unwrap()
    }

    pub fn cert_der(&self) -> Vec<u8> {
        self.cert.serialize_der().unwrap()
    }

    /// Server certificate for 127.0.0.1 as `(cert_der, pkcs8_key_der)`.
    pub fn server_cert(&self) -> (Vec<u8>, Vec<u8>) {
        let mut params = CertificateParams::new(Vec::<String>::new());
        params.subject_alt_names = vec![SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST))];
        params.distinguished_name = DistinguishedName::new();
        params.distinguished_name.push(DnType::CommonName, "control plane");

        let cert = Certificate::from_params(params).unwrap();
        (
            cert.serialize_der_with_signer(&self.cert).unwrap(),
            cert.serialize_private_key_der(),
        )
    }

    /// Composed bundle whose certificate this CA issued to the shared test key.
    pub fn client_bundle(&self, common_name: &str) -> String {
        let env = EnvName::new(common_name).unwrap();
        let csr = build_csr_pem(rsa_key(), &env).unwrap();
        let cert = self.sign_csr_pem(&csr);
        let key = pem_codec::encode_rsa_private_key(rsa_key()).unwrap();
        CredentialBundle::new(cert, key).compose()
    }
}

/// HTTPS server that requires a client certificate issued by its CA and
/// answers every request with a fixed 200 body.
pub struct MtlsServer {
    pub addr: SocketAddr,
    authenticated: Arc<AtomicUsize>,
}

impl MtlsServer {
    pub async fn start(ca: &TestCa, body: String) -> Self {
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let mut client_roots = rustls::RootCertStore::empty();
        client_roots.add(CertificateDer::from(ca.cert_der())).unwrap();
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(client_roots), provider.clone())
            .build()
            .unwrap();

        let (cert_der, key_der) = ca.server_cert();
        let config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_client_cert_verifier(verifier)
            .with_single_cert(
                vec![CertificateDer::from(cert_der)],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_der)),
            )
            .unwrap();

        let acceptor = TlsAcceptor::from(Arc::new(config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let authenticated = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&authenticated);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let acceptor = acceptor.clone();
                let counter = Arc::clone(&counter);
                let body = body.clone();
                tokio::spawn(async move {
                    // Handshake failures are the client's problem to report.
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    if tls.get_ref().1.peer_certificates().is_some_and(|certs| !certs.is_empty()) {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }

                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match tls.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }

                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = tls.write_all(response.as_bytes()).await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        Self { addr, authenticated }
    }

    pub fn url(&self) -> url::Url {
        url::Url::parse(&format!("https://{}", self.addr)).unwrap()
    }

    /// Number of handshakes in which the client presented a certificate.
    pub fn authenticated_handshakes(&self) -> usize {
        self.authenticated.load(Ordering::SeqCst)
    }
}
