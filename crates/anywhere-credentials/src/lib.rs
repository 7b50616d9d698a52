//! # Anywhere Credentials
//!
//! Client certificate issuing and secret sealing against the Altinity.Cloud
//! Anywhere control plane.
//!
//! - [`Issuer`] generates an RSA key, has the control plane sign a CSR for an
//!   environment and returns the certificate with its key
//! - [`Sealer`] fetches the control plane public key over mutual TLS and
//!   encrypts a value for it with RSA-OAEP
//! - [`unseal_secret`] reverses sealing given the private key
//! - [`RootCaPool`] replaces the system trust store for both round-trips
//!
//! ## Example
//!
//! ```no_run
//! use anywhere_core::ConfigLoader;
//! use anywhere_credentials::{Issuer, Sealer};
//! use anywhere_types::EnvName;
//!
//! # async fn run() -> anywhere_types::Result<()> {
//! let config = ConfigLoader::new().with_env().resolve()?;
//! let bundle = Issuer::from_config(&config)?
//!     .issue_certificate(&EnvName::new("env-1")?)
//!     .await?;
//!
//! let sealed = Sealer::from_config(&config)?
//!     .seal_secret(&bundle.compose(), b"s3cr3t")
//!     .await?;
//! println!("{}", sealed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod fingerprint;
pub mod http;
pub mod issuer;
pub mod pem_codec;
pub mod roots;
pub mod sealed;
pub mod sealer;
pub mod unsealer;

#[cfg(test)]
mod testutil;

pub use bundle::{ClientIdentity, CredentialBundle};
pub use fingerprint::KeyFingerprint;
pub use issuer::{Issuer, DEFAULT_KEY_BITS, MAX_KEY_BITS, MIN_KEY_BITS};
pub use roots::RootCaPool;
pub use sealed::SealedValue;
pub use sealer::{seal_with_key, Sealer};
pub use unsealer::unseal_secret;
