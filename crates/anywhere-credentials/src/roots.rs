//! Trust store override for control plane connections.

use crate::pem_codec;
use anywhere_core::ApiConfig;
use anywhere_types::{CredentialError, Result};
use reqwest::{Certificate, ClientBuilder};
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only pool of CA certificates that replaces the built-in roots.
///
/// Cloning is cheap; clones share the same certificates.
#[derive(Clone)]
pub struct RootCaPool {
    certs: Arc<Vec<Certificate>>,
}

impl std::fmt::Debug for RootCaPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootCaPool")
            .field("certificates", &self.certs.len())
            .finish()
    }
}

impl RootCaPool {
    /// Build a pool from every certificate in a PEM bundle.
    ///
    /// Blocks that are not certificates, or that fail to parse, are skipped.
    /// Fails with [`CredentialError::NoCaCertificatesFound`] if nothing usable
    /// remains.
    pub fn load(pem_bundle: &str) -> Result<Self> {
        let blocks = match pem_codec::split_all_blocks(pem_bundle.as_bytes()) {
            Ok(blocks) => blocks,
            Err(CredentialError::NoPemBlocks) => return Err(CredentialError::NoCaCertificatesFound),
            Err(e) => return Err(e),
        };

        let mut certs = Vec::new();
        for block in blocks {
            if block.tag() != pem_codec::CERTIFICATE {
                debug!(label = block.tag(), "skipping non-certificate block in CA bundle");
                continue;
            }
            if let Err(e) = pem_codec::check_certificate_der(block.contents()) {
                warn!(error = %e, "skipping unparseable certificate in CA bundle");
                continue;
            }
            let cert = Certificate::from_der(block.contents())
                .map_err(|e| CredentialError::Config(format!("Failed to load CA certificate: {}", e)))?;
            certs.push(cert);
        }

        if certs.is_empty() {
            return Err(CredentialError::NoCaCertificatesFound);
        }

        debug!(count = certs.len(), "loaded CA certificates");
        Ok(Self {
            certs: Arc::new(certs),
        })
    }

    /// Build the pool named by a resolved configuration, if it names one.
    pub fn from_config(config: &ApiConfig) -> Result<Option<Self>> {
        config.ca_crt.as_deref().map(Self::load).transpose()
    }

    /// Number of certificates in the pool.
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Whether the pool is empty. A loaded pool never is.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Make `builder` trust exactly this pool.
    pub fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
        self.certs
            .iter()
            .cloned()
            .fold(builder.tls_built_in_root_certs(false), |builder, cert| {
                builder.add_root_certificate(cert)
            })
    }
}
