//! Configuration types shared by the HTTP clients.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts applied to every control plane client.
///
/// Durations are stored in whole seconds so they read naturally from YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Total request deadline, including reading the body
    pub timeout_secs: u64,
    /// TCP connect and TLS handshake deadline
    pub connect_timeout_secs: u64,
    /// TCP keep-alive interval
    pub tcp_keepalive_secs: u64,
    /// How long idle pooled connections are kept
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 30,
            tcp_keepalive_secs: 30,
            pool_idle_timeout_secs: 90,
        }
    }
}

impl HttpSettings {
    /// Total request deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Keep-alive interval.
    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_secs)
    }

    /// Idle pool timeout.
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}
