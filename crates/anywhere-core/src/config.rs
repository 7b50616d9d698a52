//! Configuration management for the control plane clients.
//!
//! The recognised options are the API URL, the API token and an optional CA
//! bundle. Each may come from several layers.
//!
//! ## Configuration Layers
//!
//! Configuration values are resolved in this priority order:
//! 1. Explicitly supplied values (command-line flags, host attributes)
//! 2. Environment variables
//! 3. Values loaded from a YAML file
//! 4. Default values
//!
//! ## Example
//!
//! ```rust
//! use anywhere_core::config::{ConfigLoader, ConfigValues};
//!
//! let config = ConfigLoader::new()
//!     .with_explicit(ConfigValues {
//!         api_token: Some("token".to_string()),
//!         ..Default::default()
//!     })
//!     .resolve()
//!     .unwrap();
//!
//! assert_eq!(config.api_url.as_str(), "https://anywhere.altinity.cloud/");
//! ```

use anywhere_types::{CredentialError, HttpSettings, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Default control plane URL.
pub const DEFAULT_API_URL: &str = "https://anywhere.altinity.cloud";

/// Environment variable holding the control plane URL.
pub const ENV_API_URL: &str = "ALTINITYCLOUD_API_URL";

/// Environment variable holding the API token.
pub const ENV_API_TOKEN: &str = "ALTINITYCLOUD_API_TOKEN";

/// Environment variable holding the CA bundle (inline PEM or a file path).
pub const ENV_CA_CRT: &str = "ALTINITYCLOUD_CA_CRT";

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    File = 1,
    /// Values from environment variables
    Environment = 2,
    /// Values supplied explicitly by the caller
    Explicit = 3,
}

/// One layer's worth of configuration. Unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigValues {
    /// Control plane base URL
    pub api_url: Option<String>,
    /// Bearer token for the signing endpoint
    pub api_token: Option<String>,
    /// CA bundle, inline PEM or path to a PEM file
    pub ca_crt: Option<String>,
    /// HTTP client timeouts
    pub http: Option<HttpSettings>,
}

impl ConfigValues {
    fn normalized(self) -> Self {
        Self {
            api_url: non_empty(self.api_url),
            api_token: non_empty(self.api_token),
            ca_crt: non_empty(self.ca_crt),
            http: self.http,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fully resolved client configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// Control plane base URL
    pub api_url: Url,
    /// Bearer token for the signing endpoint
    pub api_token: Option<String>,
    /// CA bundle PEM contents
    pub ca_crt: Option<String>,
    /// HTTP client timeouts
    pub http: HttpSettings,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("ca_crt", &self.ca_crt.as_ref().map(|pem| pem.len()))
            .field("http", &self.http)
            .finish()
    }
}

impl ApiConfig {
    /// Get the API token, failing if no layer supplied one.
    pub fn require_token(&self) -> Result<&str> {
        self.api_token.as_deref().ok_or_else(|| {
            CredentialError::Config(format!(
                "API token is required: set api_token or {}",
                ENV_API_TOKEN
            ))
        })
    }
}

/// Layered configuration builder.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    layers: BTreeMap<ConfigLayer, ConfigValues>,
    file_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader holding only the default layer.
    pub fn new() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(
            ConfigLayer::Default,
            ConfigValues {
                api_url: Some(DEFAULT_API_URL.to_string()),
                http: Some(HttpSettings::default()),
                ..Default::default()
            },
        );

        Self {
            layers,
            file_path: None,
        }
    }

    /// Default configuration file location (`<config dir>/anywhere/config.yml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(crate::APP_NAME).join("config.yml"))
    }

    /// Load the file layer from `path`.
    ///
    /// Unlike [`with_default_file`](Self::with_default_file), a missing file is
    /// an error because the caller asked for it by name.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CredentialError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let values: ConfigValues = if content.trim().is_empty() {
            ConfigValues::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                CredentialError::Config(format!("Failed to parse config {}: {}", path.display(), e))
            })?
        };

        debug!(path = %path.display(), "loaded configuration file");
        self.layers.insert(ConfigLayer::File, values.normalized());
        self.file_path = Some(path.to_path_buf());
        Ok(self)
    }

    /// Load the file layer from [`default_path`](Self::default_path) if it exists.
    pub fn with_default_file(self) -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => self.with_file(path),
            _ => Ok(self),
        }
    }

    /// Populate the environment layer from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Populate the environment layer through a lookup function.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = ConfigValues {
            api_url: lookup(ENV_API_URL),
            api_token: lookup(ENV_API_TOKEN),
            ca_crt: lookup(ENV_CA_CRT),
            http: None,
        };
        self.layers.insert(ConfigLayer::Environment, values.normalized());
        self
    }

    /// Set the explicit layer, which wins over every other layer.
    pub fn with_explicit(mut self, values: ConfigValues) -> Self {
        self.layers.insert(ConfigLayer::Explicit, values.normalized());
        self
    }

    /// Path of the loaded configuration file, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    fn pick<T, F>(&self, field: F) -> Option<(ConfigLayer, T)>
    where
        F: Fn(&ConfigValues) -> Option<T>,
    {
        self.layers
            .iter()
            .rev()
            .find_map(|(layer, values)| field(values).map(|v| (*layer, v)))
    }

    /// Resolve every option to its highest-priority value.
    pub fn resolve(&self) -> Result<ApiConfig> {
        let (url_layer, raw_url) = self
            .pick(|v| v.api_url.clone())
            .unwrap_or((ConfigLayer::Default, DEFAULT_API_URL.to_string()));

        let api_url = Url::parse(raw_url.trim()).map_err(|e| {
            CredentialError::Config(format!("Invalid API URL '{}': {}", raw_url, e))
        })?;

        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(CredentialError::Config(format!(
                "Invalid API URL '{}': scheme must be http or https",
                raw_url
            )));
        }

        let api_token = self.pick(|v| v.api_token.clone()).map(|(_, token)| token);

        let ca_crt = match self.pick(|v| v.ca_crt.clone()) {
            Some((layer, value)) => Some(self.read_ca_value(layer, &value)?),
            None => None,
        };

        let http = self
            .pick(|v| v.http)
            .map(|(_, http)| http)
            .unwrap_or_default();

        debug!(
            api_url = %api_url,
            source = ?url_layer,
            has_token = api_token.is_some(),
            has_ca = ca_crt.is_some(),
            "resolved configuration"
        );

        Ok(ApiConfig {
            api_url,
            api_token,
            ca_crt,
            http,
        })
    }

    /// Inline PEM is used as-is; anything else is a path. Relative paths from
    /// the file layer are relative to the configuration file.
    fn read_ca_value(&self, layer: ConfigLayer, value: &str) -> Result<String> {
        if value.contains("-----BEGIN") {
            return Ok(value.to_string());
        }

        let mut path = PathBuf::from(value.trim());
        if layer == ConfigLayer::File && path.is_relative() {
            if let Some(parent) = self.file_path.as_deref().and_then(Path::parent) {
                path = parent.join(path);
            }
        }

        fs::read_to_string(&path).map_err(|e| {
            CredentialError::Config(format!("Failed to read CA bundle {}: {}", path.display(), e))
        })
    }
}
