//! Public key fingerprint command.

use super::read_file;
use anyhow::{bail, Context, Result};
use anywhere_credentials::bundle::certificate_rsa_public_key;
use anywhere_credentials::pem_codec;
use anywhere_credentials::KeyFingerprint;
use std::path::Path;

pub async fn execute(public_key: &Path) -> Result<()> {
    let pem = read_file(public_key)?;
    println!("{}", fingerprint_pem(&pem)?);
    Ok(())
}

/// Fingerprint the first `RSA PUBLIC KEY` or `CERTIFICATE` block of `pem`.
fn fingerprint_pem(pem: &str) -> Result<KeyFingerprint> {
    let blocks = pem_codec::split_all_blocks(pem.as_bytes())?;
    let block = blocks.first().context("No PEM blocks found")?;

    let key = match block.tag() {
        pem_codec::RSA_PUBLIC_KEY => pem_codec::decode_rsa_public_key(pem.as_bytes())?,
        pem_codec::CERTIFICATE => certificate_rsa_public_key(block.contents())?,
        other => bail!(
            "Expected {} or {} block, got {}",
            pem_codec::RSA_PUBLIC_KEY,
            pem_codec::CERTIFICATE,
            other
        ),
    };

    Ok(KeyFingerprint::of(&key)?)
}
