//! Listener and supervisor configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address
fn default_listen_addr() -> String {
    "127.0.0.1:1080".to_string()
}

/// Default drain timeout in seconds
fn default_drain_timeout() -> u64 {
    30
}

/// Which SOCKS versions the server accepts
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Accept SOCKS4/4a and SOCKS5
    #[default]
    Any,
    /// Accept SOCKS4/4a only
    Socks4,
    /// Accept SOCKS5 only
    Socks5,
}

impl VersionPolicy {
    /// Whether `version` may be spoken under this policy
    pub fn allows(self, version: crate::socks::Version) -> bool {
        use crate::socks::Version;
        matches!(
            (self, version),
            (VersionPolicy::Any, _)
                | (VersionPolicy::Socks4, Version::V4)
                | (VersionPolicy::Socks5, Version::V5)
        )
    }
}

/// What happens to in-flight sessions when the server stops
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Stop accepting and leave running sessions alone
    #[default]
    Detach,
    /// Abort every running session
    Abort,
    /// Wait for running sessions, up to the drain timeout, then abort the rest
    Drain,
}

/// Server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to accept SOCKS clients on (e.g., "127.0.0.1:1080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Accepted protocol versions
    #[serde(default)]
    pub version: VersionPolicy,

    /// Shutdown behaviour for in-flight sessions
    #[serde(default)]
    pub shutdown: ShutdownPolicy,

    /// Drain timeout in seconds, used with [`ShutdownPolicy::Drain`]
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: default_listen_addr(),
            version: VersionPolicy::default(),
            shutdown: ShutdownPolicy::default(),
            drain_timeout: default_drain_timeout(),
        }
    }
}

impl ServerConfig {
    /// Drain timeout as a Duration
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout)
    }

    /// Validate the server configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<SocketAddr>().is_err() && !self.listen_addr.contains(':') {
            return Err(format!("invalid listen_addr: {}", self.listen_addr));
        }
        Ok(())
    }
}
