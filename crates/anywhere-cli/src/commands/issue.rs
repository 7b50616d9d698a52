//! Certificate issuing command.

use super::write_secret_file;
use anyhow::{Context, Result};
use anywhere_core::ApiConfig;
use anywhere_credentials::{CredentialBundle, Issuer};
use anywhere_types::EnvName;
use colored::Colorize;
use std::io::Write;
use std::path::Path;

pub async fn execute(
    config: &ApiConfig,
    env_name: &str,
    cert_out: Option<&Path>,
    key_out: Option<&Path>,
    key_bits: Option<usize>,
) -> Result<()> {
    let env_name = EnvName::new(env_name).context("Invalid environment name")?;

    let mut issuer = Issuer::from_config(config).context("Failed to create issuer")?;
    if let Some(bits) = key_bits {
        issuer = issuer.with_key_bits(bits)?;
    }

    eprintln!("{} certificate for: {}", "Issuing".green().bold(), env_name.to_string().cyan());

    let bundle = issuer.issue_certificate(&env_name).await?;

    let mut stdout = std::io::stdout().lock();
    write_bundle(bundle, cert_out, key_out, &mut stdout)
}

/// Write each half to its file, or to `out` when no file is given.
fn write_bundle(
    bundle: CredentialBundle,
    cert_out: Option<&Path>,
    key_out: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    if cert_out.is_none() && key_out.is_none() {
        writeln!(out, "{}", bundle.compose())?;
        return Ok(());
    }

    let (certificate_pem, private_key_pem) = bundle.into_parts();

    match cert_out {
        Some(path) => {
            std::fs::write(path, &certificate_pem)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Certificate written to {}", "✓".green().bold(), path.display());
        }
        None => write!(out, "{}", certificate_pem)?,
    }

    match key_out {
        Some(path) => {
            write_secret_file(path, &private_key_pem)?;
            eprintln!("{} Private key written to {}", "✓".green().bold(), path.display());
        }
        None => write!(out, "{}", private_key_pem)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::read_file;

    fn bundle() -> CredentialBundle {
        CredentialBundle::new("CERT PEM\n", "KEY PEM\n")
    }

    #[test]
    fn test_write_bundle_to_stdout() {
        let mut out = Vec::new();
        write_bundle(bundle(), None, None, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "CERT PEM\n\nKEY PEM\n\n");
    }

    #[test]
    fn test_write_bundle_split() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("env-1.key");

        let mut out = Vec::new();
        write_bundle(bundle(), None, Some(&key_path), &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "CERT PEM\n");
        assert_eq!(read_file(&key_path).unwrap(), "KEY PEM\n");
    }

    #[test]
    fn test_write_bundle_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("env-1.crt");
        let key_path = dir.path().join("env-1.key");

        let mut out = Vec::new();
        write_bundle(bundle(), Some(&cert_path), Some(&key_path), &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(read_file(&cert_path).unwrap(), "CERT PEM\n");
        assert_eq!(read_file(&key_path).unwrap(), "KEY PEM\n");
    }
}
