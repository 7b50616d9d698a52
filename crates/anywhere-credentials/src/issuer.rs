//! Environment client certificate issuing.
//!
//! The issuer generates a fresh RSA key, wraps a CSR for the environment name
//! and has the control plane sign it. Every call yields a new key and a new
//! certificate; nothing is cached.

use crate::bundle::CredentialBundle;
use crate::http;
use crate::pem_codec;
use crate::roots::RootCaPool;
use anywhere_core::ApiConfig;
use anywhere_types::{body_prefix, CredentialError, EnvName, HttpSettings, Result};
use rand::rngs::OsRng;
use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_RSA_SHA256};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use tracing::{debug, info, instrument};
use url::Url;

/// Key size of issued client certificates.
pub const DEFAULT_KEY_BITS: usize = 4096;

/// Smallest key size accepted by [`Issuer::with_key_bits`].
pub const MIN_KEY_BITS: usize = 2048;

/// Largest key size accepted by [`Issuer::with_key_bits`]; the CSR signer
/// cannot load RSA keys above 4096 bits.
pub const MAX_KEY_BITS: usize = 4096;

/// Path of the signing endpoint below the API URL.
pub const SIGN_PATH: &str = "sign";

/// Issues client certificates through the control plane's signing endpoint.
#[derive(Clone)]
pub struct Issuer {
    sign_url: Url,
    authorization: HeaderValue,
    client: Client,
    key_bits: usize,
}

impl std::fmt::Debug for Issuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("sign_url", &self.sign_url.as_str())
            .field("key_bits", &self.key_bits)
            .finish_non_exhaustive()
    }
}

impl Issuer {
    /// Create an issuer for `api_url`, authenticating with `api_token`.
    pub fn new(
        api_url: &Url,
        api_token: &str,
        roots: Option<&RootCaPool>,
        settings: &HttpSettings,
    ) -> Result<Self> {
        if api_token.trim().is_empty() {
            return Err(CredentialError::Config("API token must not be empty".to_string()));
        }

        let sign_url = http::endpoint(api_url, SIGN_PATH)?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_token))
            .map_err(|_| CredentialError::Config("API token contains invalid characters".to_string()))?;
        authorization.set_sensitive(true);

        let client = http::client_builder(settings, roots)
            .build()
            .map_err(|e| CredentialError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            sign_url,
            authorization,
            client,
            key_bits: DEFAULT_KEY_BITS,
        })
    }

    /// Create an issuer from a resolved configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let roots = RootCaPool::from_config(config)?;
        Self::new(&config.api_url, config.require_token()?, roots.as_ref(), &config.http)
    }

    /// Override the generated key size, within [`MIN_KEY_BITS`]..=[`MAX_KEY_BITS`].
    pub fn with_key_bits(mut self, key_bits: usize) -> Result<Self> {
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&key_bits) {
            return Err(CredentialError::Validation(format!(
                "Key size must be between {} and {} bits, got {}",
                MIN_KEY_BITS, MAX_KEY_BITS, key_bits
            )));
        }
        self.key_bits = key_bits;
        Ok(self)
    }

    /// URL the CSR is posted to.
    pub fn sign_url(&self) -> &Url {
        &self.sign_url
    }

    /// Issue a fresh client certificate for `env`.
    ///
    /// Returns the signed certificate exactly as the control plane sent it,
    /// paired with the new key as a PKCS#1 PEM.
    #[instrument(skip_all, fields(env = %env))]
    pub async fn issue_certificate(&self, env: &EnvName) -> Result<CredentialBundle> {
        let key = generate_key(self.key_bits).await?;
        let csr_pem = build_csr_pem(&key, env)?;
        debug!(sign_url = %self.sign_url, "submitting certificate request");

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-pem-file"));

        let body = http::execute(
            &self.client,
            Method::POST,
            &self.sign_url,
            headers,
            Some(csr_pem.into_bytes()),
        )
        .await?;

        if pem_codec::decode_certificate(&body).is_err() {
            return Err(CredentialError::SigningResponseInvalid {
                url: self.sign_url.to_string(),
                body: body_prefix(&body),
            });
        }

        let certificate_pem = String::from_utf8(body).map_err(|e| CredentialError::SigningResponseInvalid {
            url: self.sign_url.to_string(),
            body: body_prefix(e.as_bytes()),
        })?;

        let private_key_pem = pem_codec::encode_rsa_private_key(&key)?;

        info!("issued client certificate");
        Ok(CredentialBundle::new(certificate_pem, private_key_pem))
    }
}

/// Generate an RSA key off the async executor; 4096-bit generation takes seconds.
async fn generate_key(bits: usize) -> Result<RsaPrivateKey> {
    tokio::task::spawn_blocking(move || RsaPrivateKey::new(&mut OsRng, bits))
        .await
        .map_err(|e| CredentialError::KeyGenFailed(e.to_string()))?
        .map_err(|e| CredentialError::KeyGenFailed(e.to_string()))
}

/// Build a SHA-256/RSA signed PKCS#10 request whose subject is only `CN=<env>`.
pub fn build_csr_pem(key: &RsaPrivateKey, env: &EnvName) -> Result<String> {
    let pkcs8 = key
        .to_pkcs8_der()
        .map_err(|e| CredentialError::CsrFailed(format!("Failed to encode key: {}", e)))?;
    let key_pair = KeyPair::from_der(pkcs8.as_bytes())
        .map_err(|e| CredentialError::CsrFailed(format!("Failed to load key pair: {}", e)))?;

    let mut params = CertificateParams::default();
    params.alg = &PKCS_RSA_SHA256;
    params.key_pair = Some(key_pair);
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, env.as_str());

    let request = Certificate::from_params(params)
        .map_err(|e| CredentialError::CsrFailed(e.to_string()))?;
    let der = request
        .serialize_request_der()
        .map_err(|e| CredentialError::CsrFailed(e.to_string()))?;

    Ok(pem_codec::encode(&der, pem_codec::CERTIFICATE_REQUEST))
}
