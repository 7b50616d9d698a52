//! Sealed value decryption command.

use super::read_file;
use anyhow::{Context, Result};
use anywhere_credentials::unseal_secret;
use std::io::Write;
use std::path::Path;

pub async fn execute(key: &Path, sealed: &str) -> Result<()> {
    let key_pem = read_file(key)?;
    let plaintext = unseal_secret(&key_pem, sealed.trim())?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&plaintext)
        .and_then(|_| stdout.flush())
        .context("Failed to write plaintext")
}
