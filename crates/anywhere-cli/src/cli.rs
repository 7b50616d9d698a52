//! CLI structure and command definitions.

use anyhow::{Context, Result};
use anywhere_core::{ApiConfig, ConfigLoader, ConfigValues};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anywhere-creds")]
#[command(version = anywhere_core::VERSION)]
#[command(about = "Issue client certificates and seal secrets for Altinity.Cloud Anywhere", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Control plane base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token for certificate signing
    #[arg(long, global = true)]
    pub api_token: Option<String>,

    /// CA bundle to trust instead of the system roots (PEM or path)
    #[arg(long, global = true)]
    pub ca_crt: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Issue a client certificate for an environment
    Issue {
        /// Environment name, used as the certificate common name
        env: String,

        /// Write the certificate here instead of stdout
        #[arg(long)]
        cert_out: Option<PathBuf>,

        /// Write the private key here instead of stdout
        #[arg(long)]
        key_out: Option<PathBuf>,

        /// RSA key size in bits (2048 to 4096)
        #[arg(long)]
        key_bits: Option<usize>,
    },

    /// Seal a secret value for the control plane
    Seal {
        /// Credential bundle (certificate followed by key) to authenticate with
        #[arg(short, long)]
        bundle: PathBuf,

        /// Value to seal
        #[arg(long, conflicts_with = "stdin", required_unless_present = "stdin")]
        value: Option<String>,

        /// Read the value to seal from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// Decrypt a sealed value with the matching private key
    Unseal {
        /// Private key PEM file
        #[arg(short, long)]
        key: PathBuf,

        /// Sealed value (<fingerprint>.<hex ciphertext>)
        #[arg(short, long)]
        sealed: String,
    },

    /// Print the fingerprint of a public key or certificate
    Fingerprint {
        /// RSA public key or certificate PEM file
        #[arg(long)]
        public_key: PathBuf,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        use crate::commands::*;

        match &self.command {
            Commands::Issue { env, cert_out, key_out, key_bits } => {
                let config = self.load_config()?;
                issue::execute(&config, env, cert_out.as_deref(), key_out.as_deref(), *key_bits).await
            }
            Commands::Seal { bundle, value, stdin } => {
                let config = self.load_config()?;
                seal::execute(&config, bundle, value.as_deref(), *stdin).await
            }
            Commands::Unseal { key, sealed } => {
                unseal::execute(key, sealed).await
            }
            Commands::Fingerprint { public_key } => {
                fingerprint::execute(public_key).await
            }
        }
    }

    /// Resolve configuration: flags over environment over file over defaults.
    pub fn load_config(&self) -> Result<ApiConfig> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::new()
                .with_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => ConfigLoader::new()
                .with_default_file()
                .context("Failed to load default config file")?,
        };

        loader
            .with_env()
            .with_explicit(self.explicit_values())
            .resolve()
            .context("Invalid configuration")
    }

    fn explicit_values(&self) -> ConfigValues {
        ConfigValues {
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            ca_crt: self.ca_crt.clone(),
            http: None,
        }
    }
}
